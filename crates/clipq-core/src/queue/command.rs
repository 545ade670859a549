//! Commands accepted by the running queue.

use super::job::JobId;

/// Control commands sent to the queue loop. Bulk commands apply the single
/// transition to each matching job independently; one failure never stops
/// the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueCommand {
    Pause(JobId),
    Resume(JobId),
    Cancel(JobId),
    Retry(JobId),
    /// Move one slot toward the front of the queue (future starts only).
    MoveUp(JobId),
    /// Move one slot toward the back of the queue.
    MoveDown(JobId),
    CancelAll,
    RetryFailed,
    /// Retry every failed job for one video.
    RetryVideo(String),
    /// Remove terminal jobs from the queue.
    Clear,
    /// Cancel everything and end the queue loop once confirmed.
    Shutdown,
}
