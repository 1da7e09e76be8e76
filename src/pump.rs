use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, warn};

use crate::filter::NoiseFilter;
use crate::runtime::LaunchSpec;

/// Raw log path and the filtered companion it is rewritten into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilePair {
    pub raw: PathBuf,
    pub filtered: PathBuf,
}

impl LogFilePair {
    /// `game1_raw.log` -> `game1.log`; falls back to appending `.filtered`
    /// for paths outside the convention.
    pub fn for_raw(raw: &Path) -> LogFilePair {
        let file = raw.file_name().and_then(|f| f.to_str()).unwrap_or_default();
        let filtered_name = match file.strip_suffix("_raw.log") {
            Some(stem) => format!("{}.log", stem),
            None => format!("{}.filtered", file),
        };
        LogFilePair {
            raw: raw.to_path_buf(),
            filtered: raw.with_file_name(filtered_name),
        }
    }

    /// Stdout and stderr pairs for every slot, in slot order.
    pub fn for_specs(specs: &[LaunchSpec]) -> Vec<LogFilePair> {
        specs
            .iter()
            .flat_map(|s| {
                [
                    LogFilePair::for_raw(&s.stdout_path),
                    LogFilePair::for_raw(&s.stderr_path),
                ]
            })
            .collect()
    }
}

/*
    @@@
    @pump_once();
    . One full pass: for each pair, read the raw file, filter, and rewrite the
      filtered file from scratch.
    . A raw file that does not exist yet is skipped silently; that slot simply
      has not written anything (or was already cleaned up).
    . Read/write failures are logged and skip only that pair; the next pass
      retries. Nothing here can take the supervised processes down.
*/
pub fn pump_once(pairs: &[LogFilePair], filter: &NoiseFilter) {
    for pair in pairs {
        if let Err(error) = pump_pair(pair, filter) {
            warn!(raw = %pair.raw.display(), %error, "log pass failed, will retry");
        }
    }
}

fn pump_pair(pair: &LogFilePair, filter: &NoiseFilter) -> std::io::Result<()> {
    let bytes = match fs::read(&pair.raw) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    // Children can be mid-write; lossy decoding keeps a torn tail from
    // failing the whole pass.
    let raw = String::from_utf8_lossy(&bytes);
    fs::write(&pair.filtered, filter.filter_text(&raw))
}

/// Background pump on a fixed 1s cadence, independent of the command loop.
/// Stops once the shutdown flag is raised; the final flush is the command
/// loop's responsibility so it lands after the children are stopped.
pub fn spawn_pump(
    pairs: Vec<LogFilePair>,
    filter: Arc<NoiseFilter>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            if shutdown.load(Ordering::SeqCst) {
                debug!("log pump stopping");
                break;
            }
            pump_once(&pairs, &filter);
        }
    })
}
