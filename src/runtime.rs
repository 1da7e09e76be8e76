use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::window;

// Shared, ordered set of live child processes.
// Guarded so a restart/quit cannot race a concurrent liveness probe.
pub type ProcessSet = Arc<Mutex<Vec<ManagedProcess>>>;

pub type ChildHandle = Arc<Mutex<Child>>;

/// Everything needed to launch one client slot. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub name: String,
    pub cmd: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
    pub window_title: Option<String>,
}

/// Runtime handle for one started slot.
pub struct ManagedProcess {
    pub spec: LaunchSpec,
    pub handle: ChildHandle,
    pub pid: Option<u32>,
}

/// One slot that failed to start; the remaining slots proceed regardless.
#[derive(Debug)]
pub struct SpawnFailure {
    pub name: String,
    pub error: std::io::Error,
}

/// Displayed status; gates re-entrant restart/quit, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStatus {
    Running,
    Restarting,
    Closing,
}

impl std::fmt::Display for SupervisorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorStatus::Running => write!(f, "Running"),
            SupervisorStatus::Restarting => write!(f, "Restarting"),
            SupervisorStatus::Closing => write!(f, "Closing"),
        }
    }
}

/*
    @@@
    @start_all();
    . Creates the log directory if missing (idempotent), then spawns one child
      per LaunchSpec with stdout/stderr redirected to the slot's raw log files
      (truncated on every start, so a restart discards stale raw output).
    . Never blocks on child completion; handles land in the shared set in
      spec order.
    . A slot that fails to spawn is collected and reported; the remaining
      slots still start.
*/
pub async fn start_all(specs: &[LaunchSpec], procs: &ProcessSet) -> Vec<SpawnFailure> {
    let mut failures = Vec::new();
    let mut set = procs.lock().await;

    for spec in specs {
        match spawn_slot(spec) {
            Ok(child) => {
                let pid = child.id();
                info!(slot = %spec.name, pid, "spawned client");
                if let (Some(pid), Some(title)) = (pid, spec.window_title.clone()) {
                    // best-effort; a failed rename never blocks startup
                    tokio::spawn(window::rename(pid, title));
                }
                set.push(ManagedProcess {
                    spec: spec.clone(),
                    handle: Arc::new(Mutex::new(child)),
                    pid,
                });
            }
            Err(error) => {
                error!(slot = %spec.name, %error, "failed to spawn client");
                failures.push(SpawnFailure {
                    name: spec.name.clone(),
                    error,
                });
            }
        }
    }

    failures
}

fn spawn_slot(spec: &LaunchSpec) -> std::io::Result<Child> {
    if let Some(dir) = spec.stdout_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let stdout = File::create(&spec.stdout_path)?;
    let stderr = File::create(&spec.stderr_path)?;

    let mut cmd = Command::new(&spec.cmd);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    for (k, v) in &spec.env {
        cmd.env(k, v);
    }
    cmd.spawn()
}

/// Non-blocking liveness probe.
pub async fn is_alive(proc: &ManagedProcess) -> bool {
    let mut guard = proc.handle.lock().await;
    matches!(guard.try_wait(), Ok(None))
}

/*
    @@@
    @stop_all();
    . Drains the shared set, so calling it again on an empty set is a no-op.
    . For each live child: send SIGTERM, wait up to the grace period polling
      try_wait(), then escalate to SIGKILL.
    . A failed SIGKILL is fatal and is the only error this returns; everything
      else is logged and survived.
*/
pub async fn stop_all(procs: &ProcessSet, grace: Duration) -> anyhow::Result<()> {
    let drained: Vec<ManagedProcess> = {
        let mut set = procs.lock().await;
        std::mem::take(&mut *set)
    };
    if drained.is_empty() {
        return Ok(());
    }

    let mut fatal: Option<anyhow::Error> = None;
    for proc in &drained {
        if let Err(e) = stop_one(proc, grace).await {
            error!(slot = %proc.spec.name, error = %e, "force kill failed");
            fatal.get_or_insert(e);
        }
    }

    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn stop_one(proc: &ManagedProcess, grace: Duration) -> anyhow::Result<()> {
    {
        let mut guard = proc.handle.lock().await;
        if let Ok(Some(status)) = guard.try_wait() {
            info!(slot = %proc.spec.name, exit_code = ?status.code(), "already exited");
            return Ok(());
        }
    }

    if let Some(pid) = proc.pid {
        info!(slot = %proc.spec.name, pid, "sending SIGTERM");
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(slot = %proc.spec.name, error = %e, "failed to send SIGTERM");
        }
    }

    // Bounded grace wait, 100ms probes.
    let mut elapsed = Duration::ZERO;
    while elapsed < grace {
        {
            let mut guard = proc.handle.lock().await;
            if let Ok(Some(status)) = guard.try_wait() {
                info!(slot = %proc.spec.name, exit_code = ?status.code(), "exited cleanly");
                return Ok(());
            }
        }
        sleep(Duration::from_millis(100)).await;
        elapsed += Duration::from_millis(100);
    }

    let mut guard = proc.handle.lock().await;
    warn!(slot = %proc.spec.name, "grace period expired, sending SIGKILL");
    guard.kill().await?;
    Ok(())
}
