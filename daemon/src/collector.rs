//! Process sample collector (reads /proc on Linux)

mod linux;

pub use linux::LinuxProcessCollector;

use crate::error::SampleError;
use crate::filter::NameFilter;
use crate::registry::EntityKey;

/// One matching process as seen at a single instant
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedEntity {
    pub key: EntityKey,
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

impl ObservedEntity {
    /// Entity keyed by its process name
    pub fn new(pid: u32, name: &str) -> Self {
        Self {
            key: EntityKey::new(name),
            pid,
            name: name.to_string(),
            cpu_percent: 0.0,
            mem_percent: 0.0,
            bytes_sent: 0,
            bytes_recv: 0,
        }
    }
}

/// Source of per-process samples.
///
/// A failure for one process is returned as an `Err` element and must not
/// prevent the others from being reported.
pub trait ProcessCollector: Send + Sync {
    fn sample(&self, filter: &NameFilter) -> Vec<Result<ObservedEntity, SampleError>>;
}
