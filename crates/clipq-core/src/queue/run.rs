//! The queue loop: one coordinating task owns all queue state.
//!
//! Jobs execute as spawned tasks in a `JoinSet` capped at the concurrency
//! limit; they report back through a progress channel and the join results,
//! never by touching shared state. Commands arrive over an mpsc channel.
//! Observers watch the [`EventBus`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::control::StopHandle;
use crate::events::{EventBus, QueueEvent};
use crate::resolve::ResolvedClip;
use crate::runner::{run_download, DownloadSpec, ProgressLine, RunOutcome, RunnerError};

use super::command::QueueCommand;
use super::job::{JobId, Progress, QueueError, QueueState, Settled};

/// Fixed parameters for one queue run.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Resolved path of the downloader binary (see `runner::require`).
    pub downloader: PathBuf,
    pub output_dir: PathBuf,
    pub output_format: String,
    /// Concurrency cap: at most this many jobs run at once.
    pub max_concurrent: usize,
    /// Grace period between the graceful stop signal and the forced kill.
    pub stop_grace: Duration,
}

/// Adds a job for a resolved clip, deriving its output path from the run
/// options. Refused with `NamingConflict` if the path is already claimed.
pub fn enqueue_clip(
    state: &mut QueueState,
    clip: ResolvedClip,
    opts: &QueueOptions,
) -> Result<JobId, QueueError> {
    let spec = DownloadSpec::for_clip(&clip, opts.output_dir.clone(), &opts.output_format);
    state.enqueue(clip, spec.output_path())
}

/// Runs the queue until the command channel closes (or `Shutdown` arrives)
/// and nothing is running or startable; paused jobs are left paused. The
/// channel staying open keeps the loop alive for retry/resume commands even
/// after every job has settled.
pub async fn run_queue(
    state: &mut QueueState,
    opts: &QueueOptions,
    bus: &EventBus,
    mut commands: mpsc::UnboundedReceiver<QueueCommand>,
) -> Result<(), RunnerError> {
    let cap = opts.max_concurrent.max(1);
    let mut join_set: JoinSet<(JobId, Result<RunOutcome, RunnerError>)> = JoinSet::new();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<(JobId, ProgressLine)>();
    let mut commands_open = true;

    loop {
        start_eligible(state, opts, bus, &mut join_set, &progress_tx, cap);

        if join_set.is_empty() && state.is_settled() && !commands_open {
            break;
        }

        tokio::select! {
            cmd = commands.recv(), if commands_open => match cmd {
                Some(cmd) => {
                    if apply_command(state, bus, cmd) {
                        commands_open = false;
                    }
                }
                None => commands_open = false,
            },
            Some((id, line)) = progress_rx.recv() => {
                handle_progress(state, bus, id, line);
            }
            Some(joined) = join_set.join_next(), if !join_set.is_empty() => match joined {
                Ok((id, result)) => settle(state, bus, id, result),
                Err(e) => tracing::error!("job task join: {e}"),
            },
        }
    }

    Ok(())
}

/// Starts queued jobs until the cap is reached, in queue order.
fn start_eligible(
    state: &mut QueueState,
    opts: &QueueOptions,
    bus: &EventBus,
    join_set: &mut JoinSet<(JobId, Result<RunOutcome, RunnerError>)>,
    progress_tx: &mpsc::UnboundedSender<(JobId, ProgressLine)>,
    cap: usize,
) {
    while state.running_count() < cap {
        let Some(id) = state.next_eligible() else {
            break;
        };
        let Some(job) = state.job(id) else {
            break;
        };
        let spec = DownloadSpec::for_clip(&job.clip, opts.output_dir.clone(), &opts.output_format);

        let stop = StopHandle::new();
        match state.start(id, Arc::clone(&stop)) {
            Ok(status) => publish_status(state, bus, id, status.into()),
            Err(e) => {
                tracing::error!("cannot start job {id}: {e}");
                break;
            }
        }

        let program = opts.downloader.clone();
        let grace = opts.stop_grace;
        let tx = progress_tx.clone();
        join_set.spawn(async move {
            let result = run_download(&program, &spec, &stop, grace, |line| {
                let _ = tx.send((id, line));
            })
            .await;
            (id, result)
        });
    }
}

fn handle_progress(state: &mut QueueState, bus: &EventBus, id: JobId, line: ProgressLine) {
    let update = match line {
        ProgressLine::Update(u) => Progress {
            percent: u.percent,
            speed_bps: u.speed_bps,
            eta_secs: u.eta_secs,
            message: None,
        },
        // Percent unknown: carry the literal line so the job never looks
        // stalled on unparsable output.
        ProgressLine::Status(text) => Progress {
            message: Some(text),
            ..Progress::default()
        },
    };
    if let Some(progress) = state.apply_progress(id, update) {
        bus.publish(QueueEvent::Progress { id, progress });
    }
}

fn settle(state: &mut QueueState, bus: &EventBus, id: JobId, result: Result<RunOutcome, RunnerError>) {
    let settled = match result {
        Ok(RunOutcome::Succeeded) => Settled::Succeeded,
        Ok(RunOutcome::Failed { exit_code, detail }) => {
            tracing::warn!(job = id, code = ?exit_code, "download failed: {detail}");
            Settled::Failed { detail }
        }
        Ok(RunOutcome::Stopped) => Settled::Stopped,
        Err(e) => {
            tracing::error!(job = id, "downloader could not run: {e}");
            Settled::Failed {
                detail: e.to_string(),
            }
        }
    };
    match state.finish(id, settled) {
        Ok(status) => publish_status(state, bus, id, Some(status)),
        Err(e) => tracing::error!("finish job {id}: {e}"),
    }
}

/// Returns true when the loop should stop accepting commands (Shutdown).
fn apply_command(state: &mut QueueState, bus: &EventBus, cmd: QueueCommand) -> bool {
    match cmd {
        QueueCommand::Pause(id) => report(id, state.request_pause(id).map(|s| publish_status(state, bus, id, s))),
        QueueCommand::Resume(id) => report(id, state.resume(id).map(|s| publish_status(state, bus, id, Some(s)))),
        QueueCommand::Cancel(id) => report(id, state.request_cancel(id).map(|s| publish_status(state, bus, id, s))),
        QueueCommand::Retry(id) => report(id, state.retry(id).map(|s| publish_status(state, bus, id, Some(s)))),
        QueueCommand::MoveUp(id) => report(id, state.move_up(id)),
        QueueCommand::MoveDown(id) => report(id, state.move_down(id)),
        QueueCommand::CancelAll => {
            for id in state.active_ids() {
                report(id, state.request_cancel(id).map(|s| publish_status(state, bus, id, s)));
            }
        }
        QueueCommand::RetryFailed => {
            for id in state.failed_ids() {
                report(id, state.retry(id).map(|s| publish_status(state, bus, id, Some(s))));
            }
        }
        QueueCommand::RetryVideo(video_id) => {
            for id in state.failed_ids_for_video(&video_id) {
                report(id, state.retry(id).map(|s| publish_status(state, bus, id, Some(s))));
            }
        }
        QueueCommand::Clear => {
            let removed = state.clear_terminal();
            tracing::debug!("cleared {} finished job(s)", removed.len());
        }
        QueueCommand::Shutdown => {
            for id in state.active_ids() {
                report(id, state.request_cancel(id).map(|s| publish_status(state, bus, id, s)));
            }
            return true;
        }
    }
    false
}

/// Bulk-safe error reporting: a failed transition is logged, never fatal.
fn report<T>(id: JobId, result: Result<T, QueueError>) {
    if let Err(e) = result {
        tracing::warn!("job {id}: {e}");
    }
}

fn publish_status(
    state: &QueueState,
    bus: &EventBus,
    id: JobId,
    status: Option<super::job::JobStatus>,
) {
    let Some(status) = status else {
        return;
    };
    let attempt = state.job(id).map(|j| j.attempt).unwrap_or(0);
    bus.publish(QueueEvent::StatusChanged {
        id,
        attempt,
        status,
    });
}
