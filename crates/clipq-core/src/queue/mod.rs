//! Download queue: jobs, transitions, and the concurrency-capped loop.
//!
//! State machine per job: `Queued → Running → {Succeeded | Failed |
//! Canceled}`, with pause/resume and manual retry. At most
//! `max_concurrent` jobs run at once; the cap is the only backpressure.

mod command;
mod job;
mod run;

pub use command::QueueCommand;
pub use job::{Job, JobId, JobStatus, Progress, QueueError, QueueState, Settled, StopReason};
pub use run::{enqueue_clip, run_queue, QueueOptions};
