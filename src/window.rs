use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Renames a client's window through xdotool so the operator can tell the
/// instances apart. The window appears some time after the process, so the
/// search runs with `--sync` under a bounded timeout. Purely cosmetic: every
/// failure is logged and dropped, never propagated to process startup.
pub async fn rename(pid: u32, title: String) {
    let search = Command::new("xdotool")
        .args([
            "search",
            "--sync",
            "--pid",
            &pid.to_string(),
            "set_window_name",
            &title,
        ])
        .output();

    match timeout(Duration::from_secs(10), search).await {
        Ok(Ok(out)) if out.status.success() => {
            debug!(pid, %title, "window renamed");
        }
        Ok(Ok(out)) => {
            warn!(pid, code = ?out.status.code(), "window rename failed (ignored)");
        }
        Ok(Err(error)) => {
            warn!(pid, %error, "xdotool unavailable (ignored)");
        }
        Err(_) => {
            warn!(pid, "window rename timed out (ignored)");
        }
    }
}
