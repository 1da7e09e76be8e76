use futures::stream::StreamExt;
use signal_hook_tokio::Signals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::filter::NoiseFilter;
use crate::pump::{self, LogFilePair};
use crate::runtime::{self, LaunchSpec, ProcessSet, SupervisorStatus};

/// Single-key operator commands, case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Restart,
    Update,
    Invalid(char),
}

pub fn parse_command(c: char) -> Command {
    match c.to_ascii_lowercase() {
        'q' => Command::Quit,
        'r' => Command::Restart,
        'u' => Command::Update,
        other => Command::Invalid(other),
    }
}

/// Everything the command loop touches; owned once by main, shared pieces
/// behind Arc. No ambient globals.
pub struct ControlCtx {
    pub specs: Vec<LaunchSpec>,
    pub pairs: Vec<LogFilePair>,
    pub filter: Arc<NoiseFilter>,
    pub procs: ProcessSet,
    pub shutdown: Arc<AtomicBool>,
    pub grace: Duration,
}

/// Reads operator input on a dedicated blocking thread. Only the first
/// non-whitespace character of each line counts as a command; the channel
/// closing (stdin EOF) is treated like a quit upstream.
pub fn spawn_stdin_reader() -> mpsc::Receiver<char> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if let Some(c) = line.trim().chars().next() {
                        if tx.send(c).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });
    rx
}

/// Raises the shared shutdown flag on SIGINT/SIGTERM; the command loop
/// observes it at the next poll tick and runs the same path as `q`.
pub async fn watch_signals(mut signals: Signals, shutdown: Arc<AtomicBool>) {
    while let Some(signal) = signals.next().await {
        info!(signal, "termination signal received");
        shutdown.store(true, Ordering::SeqCst);
    }
}

fn banner(status: SupervisorStatus) {
    println!();
    println!("=== playtest supervisor [{}] ===", status);
    println!("  [r] restart clients   [u] update filtered logs   [q] quit");
}

/*
    @@@
    @run();
    . Poll loop: check the shutdown flag, check for a pending command, then a
      bounded 100ms sleep. No blocking waits anywhere else.
    . Signal-triggered shutdown and the `q` command share one exit path:
      stop all children, final log pump, return.
    . Restart and quit run to completion before the next command is read, so
      re-entrant commands cannot overlap them.
*/
pub async fn run(ctx: &ControlCtx, commands: mpsc::Receiver<char>) -> anyhow::Result<()> {
    let mut status = SupervisorStatus::Running;
    banner(status);

    loop {
        if ctx.shutdown.load(Ordering::SeqCst) {
            return close(ctx, &mut status).await;
        }

        match commands.try_recv() {
            Ok(c) => match parse_command(c) {
                Command::Quit => {
                    ctx.shutdown.store(true, Ordering::SeqCst);
                    return close(ctx, &mut status).await;
                }
                Command::Restart => restart(ctx, &mut status).await?,
                Command::Update => {
                    pump::pump_once(&ctx.pairs, &ctx.filter);
                    println!("filtered logs updated");
                    banner(status);
                }
                Command::Invalid(other) => {
                    warn!(command = %other, "invalid command");
                    println!("unknown command: {:?}", other);
                    banner(status);
                }
            },
            Err(mpsc::TryRecvError::Empty) => {}
            // stdin closed; same path as quit so children are not orphaned
            Err(mpsc::TryRecvError::Disconnected) => {
                ctx.shutdown.store(true, Ordering::SeqCst);
                return close(ctx, &mut status).await;
            }
        }

        sleep(Duration::from_millis(100)).await;
    }
}

/// Stops every child and immediately pumps the filtered logs, so they cover
/// everything written up to termination. The pump runs even when stopping
/// failed; a fatal stop error is returned only after the flush.
pub async fn stop_and_flush(ctx: &ControlCtx) -> anyhow::Result<()> {
    let stopped = runtime::stop_all(&ctx.procs, ctx.grace).await;
    pump::pump_once(&ctx.pairs, &ctx.filter);
    stopped
}

async fn restart(ctx: &ControlCtx, status: &mut SupervisorStatus) -> anyhow::Result<()> {
    *status = SupervisorStatus::Restarting;
    banner(*status);
    info!("restarting all clients");

    if let Err(e) = stop_and_flush(ctx).await {
        // fatal: the logs are flushed, now wind the whole supervisor down
        ctx.shutdown.store(true, Ordering::SeqCst);
        return Err(e);
    }
    let failures = runtime::start_all(&ctx.specs, &ctx.procs).await;
    for f in &failures {
        println!("failed to start {}: {}", f.name, f.error);
    }

    *status = SupervisorStatus::Running;
    banner(*status);
    Ok(())
}

/// Shared quit path for the `q` command, stdin EOF, and external signals.
/// The final pump runs even when stopping failed, so the filtered logs cover
/// everything the children wrote.
async fn close(ctx: &ControlCtx, status: &mut SupervisorStatus) -> anyhow::Result<()> {
    *status = SupervisorStatus::Closing;
    banner(*status);
    info!("closing");

    let stopped = stop_and_flush(ctx).await;
    info!("shutdown complete");
    stopped
}
