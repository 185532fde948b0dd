// Integration tests for the supervision loop

use babysit::config::SupervisorConfig;
use babysit::logs::OutputSinks;
use babysit::process::{control_channel, ControlHandle, Supervisor};
use babysit::status::StatusHandle;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::task::JoinHandle;

fn create_test_config(command: &[&str], restart_delay_ms: u64) -> SupervisorConfig {
    let mut config = SupervisorConfig::for_command(command.iter().copied());
    config.restart_delay_ms = restart_delay_ms;
    config.grace_period_ms = 300;
    config
}

fn start(
    config: &SupervisorConfig,
    sinks: OutputSinks,
) -> (
    JoinHandle<babysit::error::Result<()>>,
    StatusHandle,
    ControlHandle,
) {
    let (control, rx) = control_channel();
    let status = StatusHandle::new();
    let mut supervisor = Supervisor::new(config, sinks, status.clone(), rx).unwrap();
    let task = tokio::spawn(async move { supervisor.run().await });
    (task, status, control)
}

async fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn test_shutdown_stops_long_running_child() {
    let config = create_test_config(&["/bin/sleep", "100"], 2000);
    let (task, status, control) = start(&config, OutputSinks::inherit());

    assert!(wait_for(|| status.snapshot().running, Duration::from_secs(2)).await);
    let pid = status.snapshot().pid;

    let start = Instant::now();
    control.request_shutdown().unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_ok());
    assert!(start.elapsed() < Duration::from_secs(2));

    let snapshot = status.snapshot();
    assert!(!snapshot.running);
    assert_eq!(snapshot.pid, pid);
    assert_eq!(snapshot.restart_count, 1);
    assert!(snapshot.last_error.is_none());

    // The child is gone
    assert_eq!(
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None),
        Err(nix::errno::Errno::ESRCH)
    );
}

#[tokio::test]
async fn test_shutdown_kills_child_ignoring_sigint() {
    let config = create_test_config(&["/bin/sh", "-c", "trap '' INT; exec sleep 100"], 2000);
    let (task, status, control) = start(&config, OutputSinks::inherit());

    assert!(wait_for(|| status.snapshot().running, Duration::from_secs(2)).await);
    // Let the shell install its trap
    tokio::time::sleep(Duration::from_millis(200)).await;

    let start = Instant::now();
    control.request_shutdown().unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    let elapsed = start.elapsed();

    assert!(result.is_ok());
    assert!(elapsed >= Duration::from_millis(300), "killed too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3));
    assert!(!status.snapshot().running);
}

#[tokio::test]
async fn test_crash_loop_restarts_after_delay() {
    let config = create_test_config(&["/bin/sh", "-c", "exit 1"], 100);
    let (task, status, control) = start(&config, OutputSinks::inherit());

    assert!(wait_for(|| status.snapshot().restart_count >= 2, Duration::from_secs(2)).await);

    let snapshot = status.snapshot();
    assert!(snapshot.last_error.unwrap().contains("exit status: 1"));

    control.request_shutdown().unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_restart_request_keeps_supervising() {
    let config = create_test_config(&["/bin/sleep", "100"], 50);
    let (task, status, control) = start(&config, OutputSinks::inherit());

    assert!(wait_for(|| status.snapshot().running, Duration::from_secs(2)).await);
    let first_pid = status.snapshot().pid;

    control.request_restart().unwrap();

    assert!(
        wait_for(
            || {
                let s = status.snapshot();
                s.running && s.pid != first_pid
            },
            Duration::from_secs(3)
        )
        .await
    );
    assert_eq!(status.snapshot().restart_count, 1);
    assert!(!task.is_finished());

    control.request_shutdown().unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(status.snapshot().restart_count, 2);
}

#[tokio::test]
async fn test_spawn_failure_is_retried() {
    let config = create_test_config(&["/nonexistent/binary"], 50);
    let (task, status, control) = start(&config, OutputSinks::inherit());

    assert!(wait_for(|| status.snapshot().restart_count >= 2, Duration::from_secs(2)).await);

    let snapshot = status.snapshot();
    assert!(!snapshot.running);
    assert_eq!(snapshot.pid, 0);
    assert!(snapshot.last_error.unwrap().contains("Failed to spawn"));

    control.request_shutdown().unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_shutdown_during_restart_delay() {
    let config = create_test_config(&["/bin/sh", "-c", "exit 0"], 60_000);
    let (task, status, control) = start(&config, OutputSinks::inherit());

    assert!(wait_for(|| status.snapshot().restart_count == 1, Duration::from_secs(2)).await);

    let start = Instant::now();
    control.request_shutdown().unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_ok());
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(status.snapshot().restart_count, 1);
}

#[tokio::test]
async fn test_output_appends_across_cycles() {
    let temp_dir = TempDir::new().unwrap();
    let out_path = temp_dir.path().join("child.log");

    let mut config = create_test_config(&["/bin/echo", "hello"], 50);
    config.stdout = out_path.to_str().unwrap().to_string();
    let sinks = OutputSinks::open(&config).unwrap();

    let (task, status, control) = start(&config, sinks);

    assert!(wait_for(|| status.snapshot().restart_count >= 3, Duration::from_secs(3)).await);
    control.request_shutdown().unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let content = std::fs::read_to_string(&out_path).unwrap();
    assert!(content.lines().count() >= 3);
    assert!(content.lines().all(|line| line == "hello"));
}
