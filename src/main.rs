use playtest::{control, logger, parse, pump, runtime};

use playtest::control::ControlCtx;
use playtest::filter::NoiseFilter;
use playtest::pump::LogFilePair;
use playtest::runtime::ProcessSet;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/playtest.yml".to_string());
    let cfg = parse::parser(&config_path)?;
    let _guard = logger::logs_tracing(&cfg.log_dir);

    let specs = cfg.launch_specs();
    let pairs = LogFilePair::for_specs(&specs);
    let filter = Arc::new(NoiseFilter::with_extra(&cfg.filter.extra_patterns)?);
    let procs: ProcessSet = Arc::new(Mutex::new(Vec::new()));
    let shutdown = Arc::new(AtomicBool::new(false));

    // Route SIGINT/SIGTERM through the same cleanup path as the quit command
    // so the clients are never orphaned.
    let signals = Signals::new([SIGINT, SIGTERM])?;
    let signals_handle = signals.handle();
    let signal_task = tokio::spawn(control::watch_signals(signals, shutdown.clone()));

    let failures = runtime::start_all(&specs, &procs).await;
    for f in &failures {
        eprintln!("failed to start {}: {}", f.name, f.error);
    }

    let pump_task = pump::spawn_pump(pairs.clone(), filter.clone(), shutdown.clone());

    let ctx = ControlCtx {
        specs,
        pairs,
        filter,
        procs,
        shutdown,
        grace: Duration::from_secs(cfg.stop_grace_secs),
    };
    let commands = control::spawn_stdin_reader();
    let outcome = control::run(&ctx, commands).await;

    // raise the flag even on the fatal path so the pump task winds down
    ctx.shutdown.store(true, Ordering::SeqCst);
    signals_handle.close();
    let _ = signal_task.await;
    let _ = pump_task.await;

    outcome
}
