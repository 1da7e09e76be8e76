use playtest::filter::NoiseFilter;
use playtest::pump::{self, LogFilePair};
use playtest::runtime::{self, LaunchSpec, ProcessSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

fn spec(name: &str, dir: &Path, cmd: &str, args: &[&str]) -> LaunchSpec {
    LaunchSpec {
        name: name.to_string(),
        cmd: cmd.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        env: Vec::new(),
        stdout_path: dir.join(format!("{}_raw.log", name)),
        stderr_path: dir.join(format!("{}_error_raw.log", name)),
        window_title: None,
    }
}

fn sleep_spec(name: &str, dir: &Path) -> LaunchSpec {
    spec(name, dir, "/bin/sleep", &["30"])
}

fn empty_set() -> ProcessSet {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn start_all_then_stop_all() {
    let dir = tempfile::tempdir().unwrap();
    let specs = vec![sleep_spec("game1", dir.path()), sleep_spec("game2", dir.path())];
    let procs = empty_set();

    let failures = runtime::start_all(&specs, &procs).await;
    assert!(failures.is_empty());

    {
        let set = procs.lock().await;
        assert_eq!(set.len(), 2);
        for p in set.iter() {
            assert!(runtime::is_alive(p).await);
        }
        // raw logs are created (truncated) at spawn time
        assert!(specs[0].stdout_path.exists());
        assert!(specs[1].stderr_path.exists());
    }

    runtime::stop_all(&procs, Duration::from_secs(5)).await.unwrap();
    assert!(procs.lock().await.is_empty());
}

#[tokio::test]
async fn stop_all_twice_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let procs = empty_set();
    runtime::start_all(&[sleep_spec("game1", dir.path())], &procs).await;

    runtime::stop_all(&procs, Duration::from_secs(5)).await.unwrap();
    assert!(procs.lock().await.is_empty());

    // second call sees an empty set and must not fail
    runtime::stop_all(&procs, Duration::from_secs(5)).await.unwrap();
    assert!(procs.lock().await.is_empty());
}

#[tokio::test]
async fn spawn_failure_does_not_abort_other_slots() {
    let dir = tempfile::tempdir().unwrap();
    let specs = vec![
        spec("game1", dir.path(), "/nonexistent/definitely-not-a-binary", &[]),
        sleep_spec("game2", dir.path()),
    ];
    let procs = empty_set();

    let failures = runtime::start_all(&specs, &procs).await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "game1");

    {
        let set = procs.lock().await;
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].spec.name, "game2");
        assert!(runtime::is_alive(&set[0]).await);
    }

    runtime::stop_all(&procs, Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn restart_produces_new_processes() {
    let dir = tempfile::tempdir().unwrap();
    let specs = vec![sleep_spec("game1", dir.path()), sleep_spec("game2", dir.path())];
    let procs = empty_set();

    runtime::start_all(&specs, &procs).await;
    let first_pids: Vec<_> = procs.lock().await.iter().filter_map(|p| p.pid).collect();
    assert_eq!(first_pids.len(), 2);

    runtime::stop_all(&procs, Duration::from_secs(5)).await.unwrap();
    runtime::start_all(&specs, &procs).await;

    let second_pids: Vec<_> = procs.lock().await.iter().filter_map(|p| p.pid).collect();
    assert_eq!(second_pids.len(), 2);
    for pid in &second_pids {
        assert!(!first_pids.contains(pid));
    }

    runtime::stop_all(&procs, Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn stopping_an_already_exited_child_is_clean() {
    let dir = tempfile::tempdir().unwrap();
    let procs = empty_set();
    runtime::start_all(&[spec("game1", dir.path(), "/bin/true", &[])], &procs).await;

    // let the child exit on its own
    sleep(Duration::from_millis(300)).await;
    {
        let set = procs.lock().await;
        assert!(!runtime::is_alive(&set[0]).await);
    }

    runtime::stop_all(&procs, Duration::from_secs(5)).await.unwrap();
    assert!(procs.lock().await.is_empty());
}

#[tokio::test]
async fn child_output_flows_through_the_filter() {
    let dir = tempfile::tempdir().unwrap();
    let s = spec(
        "game1",
        dir.path(),
        "/bin/sh",
        &[
            "-c",
            "echo ok; echo 'wgpu_hal::auxil::dxgi::exception: boom'; echo done",
        ],
    );
    let procs = empty_set();
    runtime::start_all(&[s.clone()], &procs).await;

    // wait for the child to finish writing
    sleep(Duration::from_millis(500)).await;

    let pairs = LogFilePair::for_specs(&[s]);
    let filter = NoiseFilter::default();
    pump::pump_once(&pairs, &filter);

    let filtered = std::fs::read_to_string(dir.path().join("game1.log")).unwrap();
    assert_eq!(filtered, "ok\ndone\n");

    runtime::stop_all(&procs, Duration::from_secs(5)).await.unwrap();
}
