//! `bx-model` — the entities of the border crossing.
//!
//! # Ownership
//!
//! Everything here is designed to live in orchestrator-owned arenas:
//! `Vec<Car>`, `Vec<Queue>`, `Vec<Booth>`, indexed by the typed ids from
//! `bx-core`.  Entities reference each other only through those ids, so
//! there are no object-graph cycles and no interior mutability.
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`car`]     | `Car`, `CarStatus`, the car-following physics step    |
//! | [`booth`]   | `Booth` — one exponential server                      |
//! | [`queue`]   | `Queue` — ordered car list + booth pool               |
//! | [`arrival`] | `ArrivalSource` — Poisson arrivals                    |
//! | [`assign`]  | `Assigner` — queue selection policies                 |

pub mod arrival;
pub mod assign;
pub mod booth;
pub mod car;
pub mod error;
pub mod queue;


pub use arrival::ArrivalSource;
pub use assign::Assigner;
pub use booth::Booth;
pub use car::{Car, CarStatus, PhysicsParams};
pub use error::{ModelError, ModelResult};
pub use queue::Queue;
