//! Job records and queue state transitions.
//!
//! All mutations of queue state go through the transition methods here; the
//! coordinating loop in [`run`](super::run) is the only caller. Per job:
//! `Queued → Running → {Succeeded | Failed | Canceled}`, with
//! `Running → Paused → Queued` (pause stops the process, resume re-queues)
//! and `Failed → Queued` on retry.

use std::path::PathBuf;
use std::sync::Arc;

use crate::control::StopHandle;
use crate::resolve::ResolvedClip;

pub type JobId = u64;

/// Live progress of a running download. Everything is unknown until the
/// first progress line arrives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Progress {
    /// Percent complete, 0–100. Monotonically non-decreasing per attempt.
    pub percent: Option<f64>,
    /// Transfer speed in bytes per second.
    pub speed_bps: Option<f64>,
    /// Estimated seconds remaining.
    pub eta_secs: Option<u64>,
    /// Last non-progress output line, shown when percent is unknown.
    pub message: Option<String>,
}

/// Job status. Progress data lives only on the `Running` variant.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Queued,
    Running(Progress),
    Paused,
    Succeeded,
    Failed { detail: String },
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed { .. } | JobStatus::Canceled
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running(_) => "running",
            JobStatus::Paused => "paused",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed { .. } => "failed",
            JobStatus::Canceled => "canceled",
        }
    }
}

/// Why a running job was asked to stop. Decides the post-stop status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Pause,
    Cancel,
}

/// How a job's process run settled, as seen by the coordinator.
#[derive(Debug, Clone)]
pub enum Settled {
    Succeeded,
    Failed { detail: String },
    /// The process was stopped on request and is confirmed gone.
    Stopped,
}

/// One schedulable download attempt for a resolved clip.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub clip: ResolvedClip,
    pub output_path: PathBuf,
    pub status: JobStatus,
    /// 1-based attempt counter; retry increments it on the same record.
    pub attempt: u32,
    pub last_error: Option<String>,
    pub(super) stop: Option<Arc<StopHandle>>,
    pub(super) stop_reason: Option<StopReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("output path {path} already claimed by job {existing}")]
    NamingConflict { existing: JobId, path: PathBuf },
    #[error("no job with id {0}")]
    UnknownJob(JobId),
    #[error("job {id} is {state}; cannot {action}")]
    InvalidTransition {
        id: JobId,
        state: &'static str,
        action: &'static str,
    },
}

/// Ordered set of jobs. Insertion order is the scheduling and display
/// order; explicit move commands reorder future starts only.
#[derive(Debug, Default)]
pub struct QueueState {
    jobs: Vec<Job>,
    next_id: JobId,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job for a resolved clip. Refuses a clip whose output path is
    /// already claimed by any job that is not canceled.
    pub fn enqueue(
        &mut self,
        clip: ResolvedClip,
        output_path: PathBuf,
    ) -> Result<JobId, QueueError> {
        if let Some(existing) = self
            .jobs
            .iter()
            .find(|j| j.status != JobStatus::Canceled && j.output_path == output_path)
        {
            return Err(QueueError::NamingConflict {
                existing: existing.id,
                path: output_path,
            });
        }

        self.next_id += 1;
        let id = self.next_id;
        self.jobs.push(Job {
            id,
            clip,
            output_path,
            status: JobStatus::Queued,
            attempt: 1,
            last_error: None,
            stop: None,
            stop_reason: None,
        });
        Ok(id)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    fn job_mut(&mut self, id: JobId) -> Result<&mut Job, QueueError> {
        self.jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(QueueError::UnknownJob(id))
    }

    pub fn running_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| matches!(j.status, JobStatus::Running(_)))
            .count()
    }

    /// First queued job in queue order, if any.
    pub fn next_eligible(&self) -> Option<JobId> {
        self.jobs
            .iter()
            .find(|j| j.status == JobStatus::Queued)
            .map(|j| j.id)
    }

    /// No job is running and none could be started.
    pub fn is_settled(&self) -> bool {
        self.running_count() == 0 && self.next_eligible().is_none()
    }

    pub fn all_terminal(&self) -> bool {
        self.jobs.iter().all(|j| j.status.is_terminal())
    }

    /// Marks a queued job running and attaches its stop handle.
    pub(super) fn start(
        &mut self,
        id: JobId,
        stop: Arc<StopHandle>,
    ) -> Result<JobStatus, QueueError> {
        let job = self.job_mut(id)?;
        if job.status != JobStatus::Queued {
            return Err(QueueError::InvalidTransition {
                id,
                state: job.status.label(),
                action: "start",
            });
        }
        job.status = JobStatus::Running(Progress::default());
        job.stop = Some(stop);
        job.stop_reason = None;
        Ok(job.status.clone())
    }

    /// Folds new progress into a running job, keeping percent monotonic.
    /// Returns the merged progress to publish, or None if the job is not
    /// running (late lines from a stopping process are dropped).
    pub(super) fn apply_progress(&mut self, id: JobId, update: Progress) -> Option<Progress> {
        let job = self.jobs.iter_mut().find(|j| j.id == id)?;
        let JobStatus::Running(ref mut progress) = job.status else {
            return None;
        };
        if let Some(p) = update.percent {
            let clamped = p.clamp(0.0, 100.0);
            progress.percent = Some(match progress.percent {
                Some(prev) => prev.max(clamped),
                None => clamped,
            });
        }
        if update.speed_bps.is_some() {
            progress.speed_bps = update.speed_bps;
        }
        if update.eta_secs.is_some() {
            progress.eta_secs = update.eta_secs;
        }
        if update.message.is_some() {
            progress.message = update.message;
        }
        Some(progress.clone())
    }

    /// Settles a finished run into a terminal (or paused) status.
    pub(super) fn finish(&mut self, id: JobId, settled: Settled) -> Result<JobStatus, QueueError> {
        let job = self.job_mut(id)?;
        let reason = job.stop_reason.take();
        job.stop = None;
        job.status = match settled {
            Settled::Succeeded => JobStatus::Succeeded,
            Settled::Failed { detail } => {
                job.last_error = Some(detail.clone());
                JobStatus::Failed { detail }
            }
            Settled::Stopped => match reason {
                Some(StopReason::Pause) => JobStatus::Paused,
                _ => JobStatus::Canceled,
            },
        };
        Ok(job.status.clone())
    }

    /// Pause: queued jobs leave the schedule immediately; running jobs get a
    /// stop request and become `Paused` once the process is confirmed gone.
    /// Returns the new status if it changed synchronously.
    pub fn request_pause(&mut self, id: JobId) -> Result<Option<JobStatus>, QueueError> {
        let job = self.job_mut(id)?;
        match job.status {
            JobStatus::Queued => {
                job.status = JobStatus::Paused;
                Ok(Some(job.status.clone()))
            }
            JobStatus::Running(_) => {
                if job.stop_reason.is_none() {
                    job.stop_reason = Some(StopReason::Pause);
                    if let Some(stop) = &job.stop {
                        stop.request();
                    }
                }
                Ok(None)
            }
            _ => Err(QueueError::InvalidTransition {
                id,
                state: job.status.label(),
                action: "pause",
            }),
        }
    }

    pub fn resume(&mut self, id: JobId) -> Result<JobStatus, QueueError> {
        let job = self.job_mut(id)?;
        if job.status != JobStatus::Paused {
            return Err(QueueError::InvalidTransition {
                id,
                state: job.status.label(),
                action: "resume",
            });
        }
        job.status = JobStatus::Queued;
        Ok(job.status.clone())
    }

    /// Cancel: non-terminal only. Queued/paused jobs cancel immediately;
    /// running jobs are stopped and become `Canceled` once confirmed gone.
    pub fn request_cancel(&mut self, id: JobId) -> Result<Option<JobStatus>, QueueError> {
        let job = self.job_mut(id)?;
        match job.status {
            JobStatus::Queued | JobStatus::Paused => {
                job.status = JobStatus::Canceled;
                Ok(Some(job.status.clone()))
            }
            JobStatus::Running(_) => {
                // Cancel overrides a pending pause.
                job.stop_reason = Some(StopReason::Cancel);
                if let Some(stop) = &job.stop {
                    stop.request();
                }
                Ok(None)
            }
            _ => Err(QueueError::InvalidTransition {
                id,
                state: job.status.label(),
                action: "cancel",
            }),
        }
    }

    /// Retry: `Failed → Queued` on the same record, incrementing `attempt`.
    pub fn retry(&mut self, id: JobId) -> Result<JobStatus, QueueError> {
        let job = self.job_mut(id)?;
        if !matches!(job.status, JobStatus::Failed { .. }) {
            return Err(QueueError::InvalidTransition {
                id,
                state: job.status.label(),
                action: "retry",
            });
        }
        job.attempt += 1;
        job.status = JobStatus::Queued;
        Ok(job.status.clone())
    }

    /// Ids of failed jobs, in queue order.
    pub fn failed_ids(&self) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|j| matches!(j.status, JobStatus::Failed { .. }))
            .map(|j| j.id)
            .collect()
    }

    /// Ids of non-terminal jobs, in queue order.
    pub fn active_ids(&self) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|j| !j.status.is_terminal())
            .map(|j| j.id)
            .collect()
    }

    /// Ids of failed jobs for one video (bulk per-video retry).
    pub fn failed_ids_for_video(&self, video_id: &str) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|j| matches!(j.status, JobStatus::Failed { .. }) && j.clip.video_id == video_id)
            .map(|j| j.id)
            .collect()
    }

    /// Moves a job one slot toward the front. Affects future starts only.
    pub fn move_up(&mut self, id: JobId) -> Result<(), QueueError> {
        let pos = self
            .jobs
            .iter()
            .position(|j| j.id == id)
            .ok_or(QueueError::UnknownJob(id))?;
        if pos > 0 {
            self.jobs.swap(pos - 1, pos);
        }
        Ok(())
    }

    /// Moves a job one slot toward the back.
    pub fn move_down(&mut self, id: JobId) -> Result<(), QueueError> {
        let pos = self
            .jobs
            .iter()
            .position(|j| j.id == id)
            .ok_or(QueueError::UnknownJob(id))?;
        if pos + 1 < self.jobs.len() {
            self.jobs.swap(pos, pos + 1);
        }
        Ok(())
    }

    /// Removes terminal jobs, returning their ids. The only way a job record
    /// is destroyed.
    pub fn clear_terminal(&mut self) -> Vec<JobId> {
        let removed = self
            .jobs
            .iter()
            .filter(|j| j.status.is_terminal())
            .map(|j| j.id)
            .collect();
        self.jobs.retain(|j| !j.status.is_terminal());
        removed
    }
}
