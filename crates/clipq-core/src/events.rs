//! In-memory event bus for job status and progress.
//!
//! A single ordered broadcast: events for one job are delivered in the
//! order they were produced, and a terminal status is always the last
//! event for an attempt. Process-lifetime only; nothing is persisted.

use tokio::sync::broadcast;

use crate::queue::{JobId, JobStatus, Progress};

/// One observable change in the queue.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// A job's status changed (including entering the queue).
    StatusChanged {
        id: JobId,
        attempt: u32,
        status: JobStatus,
    },
    /// New progress for a running job.
    Progress { id: JobId, progress: Progress },
}

/// Many-listener broadcast of [`QueueEvent`]s. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    /// `capacity` bounds how far a slow subscriber may lag before it starts
    /// missing events (tokio broadcast semantics).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. A bus with no subscribers drops events silently.
    pub fn publish(&self, event: QueueEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        for pct in [10.0, 50.0, 90.0] {
            bus.publish(QueueEvent::Progress {
                id: 1,
                progress: Progress {
                    percent: Some(pct),
                    ..Progress::default()
                },
            });
        }
        bus.publish(QueueEvent::StatusChanged {
            id: 1,
            attempt: 1,
            status: JobStatus::Succeeded,
        });

        let mut percents = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                QueueEvent::Progress { progress, .. } => percents.push(progress.percent.unwrap()),
                QueueEvent::StatusChanged { status, .. } => {
                    assert_eq!(status, JobStatus::Succeeded);
                    break;
                }
            }
        }
        assert_eq!(percents, vec![10.0, 50.0, 90.0]);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_see_events() {
        let bus = EventBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(QueueEvent::StatusChanged {
            id: 7,
            attempt: 1,
            status: JobStatus::Queued,
        });
        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap() {
                QueueEvent::StatusChanged { id, .. } => assert_eq!(id, 7),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_harmless() {
        let bus = EventBus::new(4);
        bus.publish(QueueEvent::StatusChanged {
            id: 1,
            attempt: 1,
            status: JobStatus::Queued,
        });
    }
}
