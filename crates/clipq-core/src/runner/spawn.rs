//! Spawn one download and stream its output.
//!
//! The process is started with piped stdout/stderr; both are read line by
//! line as produced and fed through the progress grammar. Stop requests are
//! honored at the next suspension point: graceful signal first, forced kill
//! after the grace period, and the outcome is reported only once the OS has
//! confirmed the process is gone.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::control::StopHandle;

use super::command::{build_args, DownloadSpec};
use super::progress::{parse_line, ProgressLine};
use super::RunnerError;

/// Terminal outcome of one download run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Exit code zero.
    Succeeded,
    /// Non-zero exit; `detail` is the last non-progress line seen.
    Failed {
        exit_code: Option<i32>,
        detail: String,
    },
    /// Stopped on request; the process is confirmed exited.
    Stopped,
}

/// Runs one download to completion, reporting each parsed output line
/// through `on_line`. `stop` requests are honored with `grace` between the
/// graceful signal and the forced kill.
pub async fn run_download(
    program: &Path,
    spec: &DownloadSpec,
    stop: &StopHandle,
    grace: Duration,
    mut on_line: impl FnMut(ProgressLine),
) -> Result<RunOutcome, RunnerError> {
    std::fs::create_dir_all(&spec.output_dir)?;

    if stop.is_requested() {
        return Ok(RunOutcome::Stopped);
    }

    let mut child = Command::new(program)
        .args(build_args(spec))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                RunnerError::MissingDependency(program.display().to_string())
            } else {
                RunnerError::Spawn {
                    program: program.display().to_string(),
                    source: e,
                }
            }
        })?;
    tracing::debug!(url = %spec.url, out = %spec.output_name, "downloader spawned");

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr not captured"))?;
    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let mut out_done = false;
    let mut err_done = false;
    let mut last_status: Option<String> = None;

    loop {
        if out_done && err_done {
            break;
        }
        tokio::select! {
            _ = stop.requested() => {
                stop_process(child, grace).await?;
                return Ok(RunOutcome::Stopped);
            }
            line = out_lines.next_line(), if !out_done => match line? {
                Some(l) => handle_line(&l, &mut last_status, &mut on_line),
                None => out_done = true,
            },
            line = err_lines.next_line(), if !err_done => match line? {
                Some(l) => handle_line(&l, &mut last_status, &mut on_line),
                None => err_done = true,
            },
        }
    }

    // The process can outlive its pipes; stop requests must still escalate
    // while we wait for the exit status.
    let status = tokio::select! {
        _ = stop.requested() => {
            stop_process(child, grace).await?;
            return Ok(RunOutcome::Stopped);
        }
        status = child.wait() => status?,
    };
    if status.success() {
        Ok(RunOutcome::Succeeded)
    } else {
        let exit_code = status.code();
        let detail = last_status.unwrap_or_else(|| match exit_code {
            Some(code) => format!("downloader exited with code {code}"),
            None => "downloader terminated by signal".to_string(),
        });
        Ok(RunOutcome::Failed { exit_code, detail })
    }
}

fn handle_line(
    line: &str,
    last_status: &mut Option<String>,
    on_line: &mut impl FnMut(ProgressLine),
) {
    let Some(parsed) = parse_line(line) else {
        return;
    };
    if let ProgressLine::Status(ref text) = parsed {
        *last_status = Some(text.clone());
    }
    on_line(parsed);
}

/// Two-phase stop. Returns only after the OS confirms the process exited,
/// so the caller never reports a cancellation while the output file may
/// still be open.
async fn stop_process(mut child: Child, grace: Duration) -> io::Result<()> {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: plain kill(2) on our own child's pid.
        unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => {
                status?;
                return Ok(());
            }
            Err(_) => {
                tracing::warn!(
                    grace_ms = grace.as_millis() as u64,
                    "downloader ignored graceful stop; force-killing"
                );
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    // kill() delivers SIGKILL and waits for the exit to be reaped.
    child.kill().await?;
    Ok(())
}
