//! One queue: an ordered line of cars plus its pool of booths.
//!
//! The order list holds only cars that are in line (Arriving or Queued),
//! front first.  A car admitted to a booth leaves the list and is referenced
//! by the booth instead.  Positions in the list are strictly increasing from
//! front to back.

use bx_core::{BoothId, CarId, QueueId};

use crate::car::{Car, PhysicsParams};

/// Backstop separation enforced when a discrete step would overtake.
const MIN_SEPARATION: f64 = 0.5;

/// How close to the stop line (metres) the front car must be before it can
/// be handed to a booth.
pub const ADMISSION_WINDOW: f64 = 0.5;

#[derive(Clone, Debug)]
pub struct Queue {
    pub id: QueueId,
    /// Cars in line, front (smallest position) first.
    order: Vec<CarId>,
    /// Booths fed by this queue, in slot order.
    pub booths: Vec<BoothId>,
    pub max_length: usize,
}

impl Queue {
    pub fn new(id: QueueId, max_length: usize) -> Self {
        Self {
            id,
            order: Vec::new(),
            booths: Vec::new(),
            max_length,
        }
    }

    // ── Membership ────────────────────────────────────────────────────────

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.order.len() >= self.max_length
    }

    #[inline]
    pub fn front(&self) -> Option<CarId> {
        self.order.first().copied()
    }

    #[inline]
    pub fn cars(&self) -> &[CarId] {
        &self.order
    }

    /// Arc-length position where a new arrival enters: one safe distance
    /// behind the current tail, or one safe distance from the stop line if
    /// the line is empty.
    pub fn entry_position(&self, cars: &[Car], safe_distance: f64) -> f64 {
        let tail = self
            .order
            .last()
            .map(|id| cars[id.index()].position)
            .unwrap_or(0.0);
        tail + safe_distance
    }

    /// Append a car at the back of the line.
    pub fn push_back(&mut self, car: CarId) {
        self.order.push(car);
    }

    /// Remove the front car (admitted to a booth).
    pub fn pop_front(&mut self) -> Option<CarId> {
        if self.order.is_empty() {
            None
        } else {
            Some(self.order.remove(0))
        }
    }

    /// The front car if it has reached the stop line.
    pub fn admission_candidate(&self, cars: &[Car]) -> Option<CarId> {
        let front = self.front()?;
        (cars[front.index()].position <= ADMISSION_WINDOW).then_some(front)
    }

    // ── Physics pass ──────────────────────────────────────────────────────

    /// Advance every car in line by `dt`, front to back, under the
    /// car-following constraint.
    ///
    /// The front car's constraint is the stop line, modelled as a virtual
    /// predecessor one safe distance past it so the car comes to rest at
    /// `position == 0`.  Followers are constrained by the car ahead and may
    /// never overtake it.
    pub fn advance_cars(&self, cars: &mut [Car], dt: f64, params: &PhysicsParams) {
        let mut pred: Option<(f64, f64)> = None; // (position, velocity) of the car ahead

        for &cid in &self.order {
            let (target, gap) = {
                let car = &cars[cid.index()];
                let gap = match pred {
                    Some((p, _)) => car.position - p,
                    None => car.position + params.safe_distance,
                };
                (car.target_velocity(params), gap)
            };

            let car = &mut cars[cid.index()];
            car.step(target, gap, dt, params);

            // Overtake backstop for discrete-step overshoot.
            if let Some((p, v)) = pred {
                if car.position < p + MIN_SEPARATION {
                    car.position = p + MIN_SEPARATION;
                    car.velocity = car.velocity.min(v);
                }
            }

            if car.is_at_rest() {
                car.settle();
            }

            pred = Some((car.position, car.velocity));
        }
    }

    /// Positions are strictly increasing front to back.  Debug aid for
    /// tests; O(n).
    pub fn is_strictly_ordered(&self, cars: &[Car]) -> bool {
        self.order
            .windows(2)
            .all(|w| cars[w[0].index()].position < cars[w[1].index()].position)
    }
}
