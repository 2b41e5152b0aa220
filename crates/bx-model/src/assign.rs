//! Queue assignment policies.
//!
//! All three are either stateless or hold a single integer, and all draw
//! any randomness from the shared simulation RNG so runs stay deterministic
//! under a fixed seed.

use bx_core::{QueueAssignment, QueueId, SimRng};

use crate::queue::Queue;

/// Chooses a queue for each arriving car.
#[derive(Debug)]
pub struct Assigner {
    policy: QueueAssignment,
    /// Next index to try under round-robin.
    cursor: usize,
}

impl Assigner {
    pub fn new(policy: QueueAssignment) -> Self {
        Self { policy, cursor: 0 }
    }

    #[inline]
    pub fn policy(&self) -> QueueAssignment {
        self.policy
    }

    /// Pick a queue with capacity, or `None` when every candidate is full
    /// (the arrival is then dropped).
    pub fn choose(&mut self, queues: &[Queue], rng: &mut SimRng) -> Option<QueueId> {
        match self.policy {
            QueueAssignment::Random => {
                let candidates: Vec<QueueId> = queues
                    .iter()
                    .filter(|q| !q.is_full())
                    .map(|q| q.id)
                    .collect();
                rng.choose(&candidates).copied()
            }

            QueueAssignment::Shortest => {
                // Ties go to the lowest id: min_by_key on (len, id).
                let best = queues.iter().min_by_key(|q| (q.len(), q.id))?;
                (!best.is_full()).then_some(best.id)
            }

            QueueAssignment::RoundRobin => {
                let n = queues.len();
                for offset in 0..n {
                    let i = (self.cursor + offset) % n;
                    if !queues[i].is_full() {
                        self.cursor = (i + 1) % n;
                        return Some(queues[i].id);
                    }
                }
                None
            }
        }
    }
}
