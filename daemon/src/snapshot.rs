//! Immutable snapshots of all rolling windows, and their publication

use crate::monitor::MonitorState;
use crate::registry::{EntityKey, EntityRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Copied series for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeries {
    pub key: EntityKey,
    pub cpu: Vec<f64>,
    pub mem: Vec<f64>,
    pub net_sent: Vec<u64>,
    pub net_recv: Vec<u64>,
}

impl EntitySeries {
    fn copy_of(key: &EntityKey, record: &EntityRecord) -> Self {
        Self {
            key: key.clone(),
            cpu: record.cpu.to_vec(),
            mem: record.mem.to_vec(),
            net_sent: record.net_sent.to_vec(),
            net_recv: record.net_recv.to_vec(),
        }
    }
}

/// Point-in-time view of the time axis and every entity's series.
///
/// Entity series can be shorter than `time_axis` when an entity appeared
/// mid-session or went unobserved; their newest sample lines up with the
/// newest timestamp it was recorded at, not necessarily the last one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tick sequence number this snapshot was taken after
    pub seq: u64,
    pub capacity: usize,
    pub time_axis: Vec<f64>,
    /// In first-seen order
    pub entities: Vec<EntitySeries>,
}

impl Snapshot {
    pub fn capture(state: &MonitorState) -> Self {
        Self {
            seq: state.seq(),
            capacity: state.capacity(),
            time_axis: state.time_axis().to_vec(),
            entities: state
                .registry()
                .iter()
                .map(|(key, record)| EntitySeries::copy_of(key, record))
                .collect(),
        }
    }

    pub fn entity(&self, key: &EntityKey) -> Option<&EntitySeries> {
        self.entities.iter().find(|series| &series.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> + '_ {
        self.entities.iter().map(|series| &series.key)
    }
}

/// Hands completed snapshots to any number of readers
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotPublisher {
    pub fn new(state: &MonitorState) -> Self {
        let (tx, _) = watch::channel(Arc::new(Snapshot::capture(state)));
        Self { tx }
    }

    /// Capture `state` and make it the latest snapshot
    pub fn publish(&self, state: &MonitorState) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::capture(state));
        self.tx.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    pub fn latest(&self) -> Arc<Snapshot> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }
}
