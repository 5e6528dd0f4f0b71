//! Periodic sampling loop (IDLE / RUNNING)

use crate::error::ClockError;
use crate::monitor::Monitor;
use crate::snapshot::Snapshot;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

struct Run {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Drives a [`Monitor`] on a timer.
///
/// The monitor outlives individual runs, so entities recorded before a
/// `stop()` are still there after the next `start()`.
pub struct SamplingLoop {
    monitor: Arc<Mutex<Monitor>>,
    sample_timeout: Duration,
    snapshots: watch::Receiver<Arc<Snapshot>>,
    run: StdMutex<Option<Run>>,
}

impl SamplingLoop {
    pub fn new(monitor: Monitor, sample_timeout: Duration) -> Self {
        let snapshots = monitor.publisher().subscribe();
        Self {
            monitor: Arc::new(Mutex::new(monitor)),
            sample_timeout,
            snapshots,
            run: StdMutex::new(None),
        }
    }

    fn run_slot(&self) -> MutexGuard<'_, Option<Run>> {
        self.run.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// IDLE -> RUNNING. Returns `false` if already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, interval: Duration) -> bool {
        let mut slot = self.run_slot();
        if slot.as_ref().is_some_and(|run| !run.task.is_finished()) {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let monitor = Arc::clone(&self.monitor);
        let sample_timeout = self.sample_timeout;
        let task = tokio::spawn(async move {
            run_loop(monitor, interval, sample_timeout, stop_rx).await;
        });
        *slot = Some(Run { stop_tx, task });
        info!("Sampling started every {:?}", interval);
        true
    }

    /// RUNNING -> IDLE. Returns `false` if not running. A tick already in
    /// progress is allowed to finish.
    pub fn stop(&self) -> bool {
        match self.run_slot().take() {
            Some(run) => {
                let _ = run.stop_tx.send(true);
                info!("Sampling stopped");
                true
            }
            None => false,
        }
    }

    /// Stop and wait for the in-flight tick, if any, to complete
    pub async fn shutdown(&self) {
        let run = self.run_slot().take();
        if let Some(run) = run {
            let _ = run.stop_tx.send(true);
            if let Err(e) = run.task.await {
                error!("Sampling task ended abnormally: {}", e);
            }
            info!("Sampling shut down");
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_slot()
            .as_ref()
            .is_some_and(|run| !run.task.is_finished())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshots.borrow())
    }
}

async fn run_loop(
    monitor: Arc<Mutex<Monitor>>,
    period: Duration,
    sample_timeout: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = interval.tick() => {
                let mut monitor = monitor.lock().await;
                if let Err(e) = tick(&mut monitor, sample_timeout).await {
                    debug!("Tick skipped: {}", e);
                }
            }
        }
        if *stop_rx.borrow() {
            break;
        }
    }
}

/// One tick with the collector on the blocking pool, bounded by
/// `sample_timeout`. A stalled or panicked collector yields an empty tick,
/// and so does every tick while a stalled pass is still running.
pub async fn tick(
    monitor: &mut Monitor,
    sample_timeout: Duration,
) -> Result<Arc<Snapshot>, ClockError> {
    let now = monitor.now()?;

    let Some(permit) = monitor.begin_pass() else {
        return Ok(monitor.record(now, Vec::new()));
    };
    let collector = monitor.collector();
    let filter = monitor.filter().clone();
    // The permit moves into the blocking task, so a pass abandoned on
    // timeout keeps the gate closed until it really finishes.
    let sampling = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        collector.sample(&filter)
    });
    let results = match tokio::time::timeout(sample_timeout, sampling).await {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => {
            error!("Collector task failed: {}", e);
            Vec::new()
        }
        Err(_) => {
            warn!("Collector exceeded {:?}, recording empty tick", sample_timeout);
            Vec::new()
        }
    };

    Ok(monitor.record(now, results))
}
