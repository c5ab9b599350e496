//! Engine subprocess execution with timeout enforcement.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Maximum bytes of stderr kept for error reporting.
const STDERR_TAIL_BYTES: usize = 2048;

/// Run an engine subprocess to completion, enforcing a timeout.
///
/// Stderr is captured for diagnostics. If the process exceeds the
/// timeout it is killed and the invocation is reported as timed out.
///
/// # Errors
///
/// Returns an error if the binary is missing, the process exits with a
/// nonzero status, or the timeout elapses.
pub async fn run_engine(mut cmd: Command, tool: &str, timeout: Duration) -> Result<()> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(tool, "invoking engine");

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::tool_not_found(tool)
        } else {
            Error::Io(e)
        }
    })?;

    let stderr = child.stderr.take();

    let waited = tokio::time::timeout(timeout, async {
        let mut captured = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut captured).await;
        }
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, captured))
    })
    .await;

    match waited {
        Ok(Ok((status, captured))) => {
            if status.success() {
                Ok(())
            } else {
                warn!(tool, code = ?status.code(), "engine exited with failure");
                Err(Error::engine_failed(tool, stderr_tail(&captured)))
            }
        }
        Ok(Err(e)) => Err(Error::Io(e)),
        Err(_) => {
            // The wait future is dropped, so the child handle is free again.
            let _ = child.kill().await;
            warn!(tool, timeout_secs = timeout.as_secs(), "engine timed out, killed");
            Err(Error::timeout(tool, timeout.as_secs()))
        }
    }
}

/// The trailing portion of captured stderr, trimmed for error messages.
fn stderr_tail(captured: &str) -> String {
    let trimmed = captured.trim();
    if trimmed.is_empty() {
        return "no diagnostic output".to_string();
    }
    let mut start = trimmed.len().saturating_sub(STDERR_TAIL_BYTES);
    // Avoid slicing mid-codepoint.
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}
