use super::{ObservedEntity, ProcessCollector};
use crate::error::SampleError;
use crate::filter::NameFilter;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::debug;

#[derive(Clone)]
struct CpuSample {
    total_ticks: u64, // utime + stime
    timestamp: Instant,
}

/// Fields of /proc/<pid>/stat we care about
struct StatFields {
    name: String,
    total_ticks: u64,
    rss_pages: u64,
}

pub struct LinuxProcessCollector {
    root: PathBuf,
    page_size: u64,
    clock_ticks: u64,
    mem_total_bytes: u64,
    cpu_samples: Mutex<HashMap<u32, CpuSample>>,
}

impl LinuxProcessCollector {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Collector reading a procfs tree mounted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) }.max(1) as u64;
        let clock_ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) }.max(1) as u64;
        let mem_total_bytes = Self::read_mem_total(&root);
        Self {
            root,
            page_size,
            clock_ticks,
            mem_total_bytes,
            cpu_samples: Mutex::new(HashMap::new()),
        }
    }

    fn read_mem_total(root: &Path) -> u64 {
        let meminfo = fs::read_to_string(root.join("meminfo")).unwrap_or_default();
        meminfo
            .lines()
            .find_map(|line| line.strip_prefix("MemTotal:"))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kb| kb.parse::<u64>().ok())
            .map(|kb| kb * 1024)
            .unwrap_or(0)
    }

    fn samples(&self) -> MutexGuard<'_, HashMap<u32, CpuSample>> {
        self.cpu_samples.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_stat(&self, pid: u32) -> io::Result<StatFields> {
        let content = fs::read_to_string(self.root.join(pid.to_string()).join("stat"))?;
        parse_stat(&content).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("malformed stat for pid {pid}"))
        })
    }

    /// (wchar, rchar) from /proc/<pid>/io
    fn read_io(&self, pid: u32) -> io::Result<(u64, u64)> {
        let content = fs::read_to_string(self.root.join(pid.to_string()).join("io"))?;
        let sent = parse_io_field(&content, "wchar:");
        let recv = parse_io_field(&content, "rchar:");
        match (sent, recv) {
            (Some(sent), Some(recv)) => Ok((sent, recv)),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed io for pid {pid}"),
            )),
        }
    }

    fn cpu_percent(&self, pid: u32, total_ticks: u64, now: Instant) -> f64 {
        let mut samples = self.samples();
        let percent = match samples.get(&pid) {
            Some(prev) => {
                let tick_delta = total_ticks.saturating_sub(prev.total_ticks);
                let time_delta = now.duration_since(prev.timestamp).as_secs_f64();
                if time_delta > 0.0 {
                    let cpu_seconds = tick_delta as f64 / self.clock_ticks as f64;
                    (cpu_seconds / time_delta) * 100.0
                } else {
                    0.0
                }
            }
            None => 0.0, // first sighting
        };
        samples.insert(pid, CpuSample { total_ticks, timestamp: now });
        percent
    }

    fn mem_percent(&self, rss_pages: u64) -> f64 {
        if self.mem_total_bytes == 0 {
            return 0.0;
        }
        (rss_pages * self.page_size) as f64 / self.mem_total_bytes as f64 * 100.0
    }

    fn observe(
        &self,
        pid: u32,
        filter: &NameFilter,
    ) -> Option<Result<ObservedEntity, SampleError>> {
        // A process that exits before its stat is read was never observed.
        let stat = self.read_stat(pid).ok()?;
        if !filter.matches(&stat.name) {
            return None;
        }

        let now = Instant::now();
        let cpu_percent = self.cpu_percent(pid, stat.total_ticks, now);
        let (bytes_sent, bytes_recv) = match self.read_io(pid) {
            Ok(counters) => counters,
            Err(e) => return Some(Err(SampleError::unavailable(pid, &stat.name, e))),
        };

        let mut entity = ObservedEntity::new(pid, &stat.name);
        entity.cpu_percent = cpu_percent;
        entity.mem_percent = self.mem_percent(stat.rss_pages);
        entity.bytes_sent = bytes_sent;
        entity.bytes_recv = bytes_recv;
        Some(Ok(entity))
    }

    /// Remove stale CPU samples for processes that no longer exist
    pub fn cleanup_stale(&self, active_pids: &[u32]) {
        let mut samples = self.samples();
        samples.retain(|pid, _| active_pids.contains(pid));
    }

    fn list_pids(&self) -> Vec<u32> {
        match fs::read_dir(&self.root) {
            Ok(entries) => entries
                .flatten()
                .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
                .collect(),
            Err(e) => {
                debug!("Failed to enumerate {:?}: {}", self.root, e);
                Vec::new()
            }
        }
    }
}

impl Default for LinuxProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector for LinuxProcessCollector {
    fn sample(&self, filter: &NameFilter) -> Vec<Result<ObservedEntity, SampleError>> {
        let pids = self.list_pids();
        let results: Vec<_> = pids.iter().filter_map(|&pid| self.observe(pid, filter)).collect();
        self.cleanup_stale(&pids);
        results
    }
}

/// The command name sits in parentheses and may itself contain spaces or
/// parentheses, so split on the last ')'.
fn parse_stat(content: &str) -> Option<StatFields> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close < open {
        return None;
    }
    let name = content[open + 1..close].to_string();
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    // rest[0] is field 3 (state); utime=14, stime=15, rss=24
    if rest.len() < 22 {
        return None;
    }
    let utime: u64 = rest[11].parse().ok()?;
    let stime: u64 = rest[12].parse().ok()?;
    let rss_pages: u64 = rest[21].parse::<i64>().ok()?.max(0) as u64;
    Some(StatFields {
        name,
        total_ticks: utime + stime,
        rss_pages,
    })
}

fn parse_io_field(content: &str, field: &str) -> Option<u64> {
    content
        .lines()
        .find_map(|line| line.strip_prefix(field))
        .and_then(|value| value.trim().parse().ok())
}
