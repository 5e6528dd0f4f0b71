//! Sampling state and the per-tick update

use crate::collector::{ObservedEntity, ProcessCollector};
use crate::error::{ClockError, SampleError};
use crate::filter::NameFilter;
use crate::registry::EntityRegistry;
use crate::snapshot::{Snapshot, SnapshotPublisher};
use crate::window::RollingWindow;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Source of tick timestamps (seconds since the UNIX epoch)
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<f64, ClockError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<f64, ClockError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .map_err(|e| ClockError(e.to_string()))
    }
}

/// Everything the sampling loop mutates: the shared time axis and the
/// registry of per-entity windows, all with one capacity.
#[derive(Debug, Clone)]
pub struct MonitorState {
    capacity: usize,
    seq: u64,
    time_axis: RollingWindow<f64>,
    registry: EntityRegistry,
}

impl MonitorState {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            seq: 0,
            time_axis: RollingWindow::new(capacity),
            registry: EntityRegistry::new(capacity),
        }
    }

    /// Apply one tick: advance the time axis once, then append a sample for
    /// each observed entity. Unobserved entities are left as they are.
    pub fn record_tick<I>(&mut self, now: f64, observations: I)
    where
        I: IntoIterator<Item = ObservedEntity>,
    {
        self.seq += 1;
        self.time_axis.push(now);
        for entity in observations {
            self.registry.get_or_create(&entity.key).record(
                entity.cpu_percent,
                entity.mem_percent,
                entity.bytes_sent,
                entity.bytes_recv,
            );
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of completed ticks
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn time_axis(&self) -> &RollingWindow<f64> {
        &self.time_axis
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }
}

/// Drop per-entity failures, logging each one
pub fn absorb_failures(
    results: Vec<Result<ObservedEntity, SampleError>>,
) -> Vec<ObservedEntity> {
    results
        .into_iter()
        .filter_map(|result| match result {
            Ok(entity) => Some(entity),
            Err(e) => {
                debug!("Skipping entity this tick: {}", e);
                None
            }
        })
        .collect()
}

/// Synchronous sampling driver: collector + clock + state + publisher.
pub struct Monitor {
    collector: Arc<dyn ProcessCollector>,
    clock: Arc<dyn Clock>,
    filter: NameFilter,
    state: MonitorState,
    publisher: SnapshotPublisher,
    // one collector pass at a time, including passes abandoned on timeout
    pass_gate: Arc<Semaphore>,
}

impl Monitor {
    pub fn new(
        collector: Arc<dyn ProcessCollector>,
        filter: NameFilter,
        capacity: usize,
    ) -> Self {
        Self::with_clock(collector, Arc::new(SystemClock), filter, capacity)
    }

    pub fn with_clock(
        collector: Arc<dyn ProcessCollector>,
        clock: Arc<dyn Clock>,
        filter: NameFilter,
        capacity: usize,
    ) -> Self {
        let state = MonitorState::new(capacity);
        let publisher = SnapshotPublisher::new(&state);
        Self {
            collector,
            clock,
            filter,
            state,
            publisher,
            pass_gate: Arc::new(Semaphore::new(1)),
        }
    }

    /// Run one tick and publish the result.
    ///
    /// A clock failure skips the tick: nothing is recorded or published.
    pub fn tick(&mut self) -> Result<Arc<Snapshot>, ClockError> {
        let now = self.now()?;
        let results = match self.begin_pass() {
            Some(_permit) => self.collector.sample(&self.filter),
            None => Vec::new(),
        };
        Ok(self.record(now, results))
    }

    /// Permit for one collector pass, or `None` while an earlier pass is
    /// still running. Hold the permit until `sample` returns.
    pub fn begin_pass(&self) -> Option<OwnedSemaphorePermit> {
        match Arc::clone(&self.pass_gate).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                warn!("Previous collector pass still running, recording empty tick");
                None
            }
        }
    }

    /// Read the clock, logging a failure
    pub fn now(&self) -> Result<f64, ClockError> {
        self.clock.now().map_err(|e| {
            warn!("Skipping tick: {}", e);
            e
        })
    }

    /// Fold one round of collector output into the state and publish
    pub fn record(
        &mut self,
        now: f64,
        results: Vec<Result<ObservedEntity, SampleError>>,
    ) -> Arc<Snapshot> {
        self.state.record_tick(now, absorb_failures(results));
        self.publisher.publish(&self.state)
    }

    pub fn collector(&self) -> Arc<dyn ProcessCollector> {
        Arc::clone(&self.collector)
    }

    pub fn filter(&self) -> &NameFilter {
        &self.filter
    }

    pub fn publisher(&self) -> &SnapshotPublisher {
        &self.publisher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm(name: &str, cpu: f64) -> ObservedEntity {
        let mut entity = ObservedEntity::new(1, name);
        entity.cpu_percent = cpu;
        entity
    }

    #[test]
    fn test_time_axis_grows_to_capacity_then_holds() {
        let mut state = MonitorState::new(3);
        for i in 0..5 {
            let before = state.time_axis().len();
            state.record_tick(i as f64, Vec::new());
            assert_eq!(state.time_axis().len(), (before + 1).min(3));
        }
        assert_eq!(state.time_axis().to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(state.seq(), 5);
    }

    #[test]
    fn test_same_named_processes_share_a_record() {
        let mut state = MonitorState::new(10);
        state.record_tick(1.0, vec![vm("vmx", 1.0), vm("vmx", 2.0)]);
        let record = state.registry().get(&"vmx".into()).unwrap();
        assert_eq!(record.cpu.to_vec(), vec![1.0, 2.0]);
        assert_eq!(state.time_axis().len(), 1);
    }

    #[test]
    fn test_record_survives_unobserved_ticks() {
        let mut state = MonitorState::new(10);
        state.record_tick(1.0, vec![vm("vmA", 3.0)]);
        for t in 2..6 {
            state.record_tick(t as f64, Vec::new());
        }
        let record = state.registry_mut().get_or_create(&"vmA".into());
        assert_eq!(record.cpu.to_vec(), vec![3.0]);
        assert_eq!(state.registry().len(), 1);
        assert_eq!(state.time_axis().len(), 5);
    }

    #[test]
    fn test_absorb_failures_keeps_successes() {
        let results = vec![
            Ok(vm("vmA", 1.0)),
            Err(SampleError::unavailable(7, "vmC", "permission denied")),
            Ok(vm("vmB", 2.0)),
        ];
        let kept = absorb_failures(results);
        let names: Vec<_> = kept.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["vmA", "vmB"]);
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock.now().unwrap() > 0.0);
    }
}
