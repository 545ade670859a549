//! Two-phase stop signalling for running jobs.
//!
//! The queue hands each running job an [`StopHandle`]; pause/cancel commands
//! set it, and the job's process loop observes it at its next suspension
//! point (line read or process wait). The handle only says "stop"; the
//! queue records whether the stop was a pause or a cancel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared stop flag with async wakeup. Cheap to clone via `Arc`.
#[derive(Debug, Default)]
pub struct StopHandle {
    flag: AtomicBool,
    notify: Notify,
}

impl StopHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request that the job stop. Idempotent.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once a stop has been requested, including before this call.
    pub async fn requested(&self) {
        while !self.is_requested() {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register the waiter before re-checking the flag;
            // notify_waiters() stores no permit, so a request landing
            // before registration would otherwise be lost.
            notified.as_mut().enable();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}
