//! Published state: snapshot views and the subscriber bus.
//!
//! A snapshot is an internally consistent copy of simulation state, built in
//! one pass by the orchestrator and shared as an `Arc` — subscribers see a
//! whole snapshot or none, never a torn read.
//!
//! Fan-out uses one bounded `mpsc::sync_channel` per subscriber.  Under the
//! default [`PublishPolicy::DropSlow`], a subscriber whose backlog is full
//! is disconnected rather than stalling the orchestrator; `Block` gives
//! back-pressure instead.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use bx_core::{BoothId, CarId, QueueId};
use bx_model::CarStatus;

use crate::stats::SimStats;

/// Snapshots a subscriber may lag behind before it is cut loose.
pub const DEFAULT_SUBSCRIBER_BACKLOG: usize = 8;

// ── Status ────────────────────────────────────────────────────────────────────

/// Lifecycle of a simulation run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SimStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != SimStatus::Running
    }
}

impl std::fmt::Display for SimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SimStatus::Running => "running",
            SimStatus::Completed => "completed",
            SimStatus::Failed => "failed",
            SimStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ── Views ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize)]
pub struct CarView {
    pub id: CarId,
    pub queue: QueueId,
    /// Metres to the stop line.
    pub position: f64,
    pub velocity: f64,
    pub status: CarStatus,
}

#[derive(Clone, Debug, Serialize)]
pub struct BoothView {
    pub id: BoothId,
    /// `q<queue>_n<slot>` label for operator-facing surfaces.
    pub label: String,
    pub queue: QueueId,
    pub is_busy: bool,
    pub current_car: Option<CarId>,
    pub service_rate: f64,
    pub total_served: u64,
    pub total_service_time: f64,
    /// Busy-time fraction of the run so far.
    pub utilization: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct QueueView {
    pub id: QueueId,
    /// Cars waiting in line (excludes the ones at booths).
    pub length: usize,
    pub num_booths: usize,
    pub busy_booths: usize,
}

/// A point-in-time copy of everything a subscriber may want.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub sim_time: f64,
    pub status: SimStatus,
    /// Failure description when `status` is Failed.
    pub message: Option<String>,
    /// Fraction of `max_simulation_time` consumed, in `[0, 1]`.
    pub progress: f64,
    pub cars: Vec<CarView>,
    pub booths: Vec<BoothView>,
    pub queues: Vec<QueueView>,
    pub stats: SimStats,
}

// ── Bus ───────────────────────────────────────────────────────────────────────

/// What `publish` does when a subscriber's bounded queue is full.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PublishPolicy {
    /// Disconnect the slow subscriber; the orchestrator never stalls.
    #[default]
    DropSlow,
    /// Block until the subscriber drains (back-pressure).
    Block,
}

struct BusInner {
    subscribers: Vec<SyncSender<Arc<Snapshot>>>,
    closed: bool,
}

/// Fan-out of published snapshots to any number of subscribers, plus a cell
/// holding the most recent snapshot for cheap status queries.
///
/// The bus is internally synchronized: the orchestrator publishes while
/// other threads subscribe or read `latest`.
pub struct SnapshotBus {
    policy: PublishPolicy,
    backlog: usize,
    inner: Mutex<BusInner>,
    latest: Mutex<Option<Arc<Snapshot>>>,
}

impl SnapshotBus {
    pub fn new(policy: PublishPolicy, backlog: usize) -> Self {
        Self {
            policy,
            backlog,
            inner: Mutex::new(BusInner {
                subscribers: Vec::new(),
                closed: false,
            }),
            latest: Mutex::new(None),
        }
    }

    /// Register a new subscriber.  Returns `None` once the bus is closed
    /// (the simulation reached a terminal state).
    pub fn subscribe(&self) -> Option<SnapshotReceiver> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return None;
        }
        let (tx, rx) = mpsc::sync_channel(self.backlog);
        inner.subscribers.push(tx);
        Some(SnapshotReceiver { rx })
    }

    /// Most recently published snapshot, if any.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.lock().unwrap().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }

    /// Deliver `snapshot` to every live subscriber and update `latest`.
    ///
    /// Snapshots are published in non-decreasing `sim_time` order by
    /// construction (single publisher); this is debug-asserted.
    pub fn publish(&self, snapshot: Arc<Snapshot>) {
        {
            let mut latest = self.latest.lock().unwrap();
            if let Some(prev) = latest.as_ref() {
                debug_assert!(
                    prev.sim_time <= snapshot.sim_time,
                    "snapshot time went backwards"
                );
            }
            *latest = Some(Arc::clone(&snapshot));
        }

        let mut inner = self.inner.lock().unwrap();
        let policy = self.policy;
        let backlog = self.backlog;
        inner.subscribers.retain(|tx| match policy {
            PublishPolicy::DropSlow => match tx.try_send(Arc::clone(&snapshot)) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    log::warn!("dropping subscriber {backlog} snapshots behind");
                    false
                }
                Err(TrySendError::Disconnected(_)) => false,
            },
            PublishPolicy::Block => tx.send(Arc::clone(&snapshot)).is_ok(),
        });
    }

    /// Drop all subscriber channels.  Receivers see the stream end after
    /// draining what was already queued.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        inner.subscribers.clear();
    }
}

/// The consuming end of a subscription.
pub struct SnapshotReceiver {
    rx: Receiver<Arc<Snapshot>>,
}

impl SnapshotReceiver {
    /// Block until the next snapshot, or `None` when the bus has closed.
    pub fn recv(&self) -> Option<Arc<Snapshot>> {
        self.rx.recv().ok()
    }

    /// Non-blocking poll.
    pub fn try_recv(&self) -> Option<Arc<Snapshot>> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<Arc<Snapshot>> {
        self.rx.try_iter().collect()
    }
}
