use std::fs;
use std::path::Path;
use tempfile::tempdir;
use vmwatch_daemon::collector::{LinuxProcessCollector, ProcessCollector};
use vmwatch_daemon::error::SampleError;
use vmwatch_daemon::filter::NameFilter;

fn write_stat(root: &Path, pid: u32, name: &str, utime: u64, rss_pages: u64) {
    let dir = root.join(pid.to_string());
    fs::create_dir_all(&dir).unwrap();
    let stat = format!(
        "{pid} ({name}) S 1 {pid} {pid} 0 -1 4194560 500 0 0 0 {utime} 0 0 0 20 0 1 0 100 1048576 {rss_pages} 18446744073709551615"
    );
    fs::write(dir.join("stat"), stat).unwrap();
}

fn write_io(root: &Path, pid: u32, rchar: u64, wchar: u64) {
    let io = format!(
        "rchar: {rchar}\nwchar: {wchar}\nsyscr: 1\nsyscw: 1\nread_bytes: 0\nwrite_bytes: 0\ncancelled_write_bytes: 0\n"
    );
    fs::write(root.join(pid.to_string()).join("io"), io).unwrap();
}

#[test]
fn test_sample_finds_current_process() {
    let collector = LinuxProcessCollector::new();
    let current_pid = std::process::id();
    let results = collector.sample(&NameFilter::new(""));
    let found = results.iter().any(|r| match r {
        Ok(entity) => entity.pid == current_pid,
        Err(SampleError::SourceUnavailable { pid, .. }) => *pid == current_pid,
    });
    assert!(found, "Current process should be sampled");
}

#[test]
fn test_sample_skips_non_matching_names() {
    let collector = LinuxProcessCollector::new();
    let current_pid = std::process::id();
    let results = collector.sample(&NameFilter::new("no-such-process-name-zz9"));
    let found = results.iter().any(|r| match r {
        Ok(entity) => entity.pid == current_pid,
        Err(SampleError::SourceUnavailable { pid, .. }) => *pid == current_pid,
    });
    assert!(!found);
}

#[test]
fn test_fake_procfs_tree() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("meminfo"), "MemTotal:       1024 kB\nMemFree:  10 kB\n").unwrap();
    fs::create_dir_all(root.join("self")).unwrap();

    write_stat(root, 100, "myvm", 0, 2);
    write_io(root, 100, 5000, 7000);
    write_stat(root, 200, "sshd", 0, 2);
    write_io(root, 200, 1, 1);
    write_stat(root, 300, "VMnoio", 0, 1);

    let collector = LinuxProcessCollector::with_root(root);
    let results = collector.sample(&NameFilter::default());
    assert_eq!(results.len(), 2);

    let entity = results
        .iter()
        .find_map(|r| r.as_ref().ok())
        .expect("myvm should be observed");
    assert_eq!(entity.pid, 100);
    assert_eq!(entity.key.as_str(), "myvm");
    assert_eq!(entity.cpu_percent, 0.0);
    assert_eq!(entity.bytes_sent, 7000);
    assert_eq!(entity.bytes_recv, 5000);

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as f64;
    let expected_mem = 2.0 * page_size / (1024.0 * 1024.0) * 100.0;
    assert!((entity.mem_percent - expected_mem).abs() < 1e-9);

    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(failure, SampleError::SourceUnavailable { pid: 300, .. }));
}

#[test]
fn test_cpu_percent_uses_previous_sample() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("meminfo"), "MemTotal: 4096 kB\n").unwrap();
    write_stat(root, 42, "kvm-guest", 0, 0);
    write_io(root, 42, 0, 0);

    let collector = LinuxProcessCollector::with_root(root);
    let filter = NameFilter::default();
    let first = collector.sample(&filter);
    assert_eq!(first[0].as_ref().unwrap().cpu_percent, 0.0);

    std::thread::sleep(std::time::Duration::from_millis(20));
    write_stat(root, 42, "kvm-guest", 50, 0);
    let second = collector.sample(&filter);
    assert!(second[0].as_ref().unwrap().cpu_percent > 0.0);
}

#[test]
fn test_vanished_process_is_omitted() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("meminfo"), "MemTotal: 4096 kB\n").unwrap();
    // directory present but stat already gone
    fs::create_dir_all(root.join("77")).unwrap();

    let collector = LinuxProcessCollector::with_root(root);
    assert!(collector.sample(&NameFilter::new("")).is_empty());
}
