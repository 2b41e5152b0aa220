//! Incrementally maintained run statistics.

use serde::Serialize;

/// Aggregate counters for one run.  Updated by the engine as events happen;
/// the rate fields are refreshed when a snapshot is taken.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SimStats {
    /// Every arrival event, including ones that were dropped.
    pub total_arrivals: u64,
    pub total_completions: u64,
    /// Arrivals refused because the selected queue was full.
    pub dropped: u64,
    /// Completions per minute over the run so far.
    pub throughput_per_min: f64,
    /// Mean seconds from arrival to service start, over cars that reached a
    /// booth.
    pub mean_wait_secs: f64,
    /// Mean seconds of service, over completed cars.
    pub mean_service_secs: f64,

    #[serde(skip)]
    wait_sum: f64,
    #[serde(skip)]
    wait_count: u64,
    #[serde(skip)]
    service_sum: f64,
}

impl SimStats {
    pub fn record_arrival(&mut self) {
        self.total_arrivals += 1;
    }

    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }

    pub fn record_service_start(&mut self, wait_secs: f64) {
        self.wait_sum += wait_secs;
        self.wait_count += 1;
        self.mean_wait_secs = self.wait_sum / self.wait_count as f64;
    }

    pub fn record_completion(&mut self, service_secs: f64) {
        self.total_completions += 1;
        self.service_sum += service_secs;
        self.mean_service_secs = self.service_sum / self.total_completions as f64;
    }

    /// Refresh the time-derived rates.  Called before each snapshot.
    pub fn refresh(&mut self, sim_time: f64) {
        self.throughput_per_min = if sim_time > 0.0 {
            self.total_completions as f64 / (sim_time / 60.0)
        } else {
            0.0
        };
    }

    /// Cars admitted and still in the system.
    pub fn in_system(&self) -> u64 {
        self.total_arrivals - self.dropped - self.total_completions
    }
}
