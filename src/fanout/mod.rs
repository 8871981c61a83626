pub mod events;
pub mod publisher;
pub mod rooms;

use tokio::sync::mpsc;
use tracing::warn;

use crate::fanout::events::ChangeEvent;
use crate::observability::metrics::Metrics;

/// Outbound notification port. Implementations must never let a delivery
/// problem escape `publish`: data changes are durable, telling someone
/// about them is best-effort.
pub trait Fanout: Send + Sync {
    fn publish(&self, event: ChangeEvent);
}

/// Hands events to the background publisher task over a bounded queue.
/// A full or closed queue drops the event with a warning; the caller's
/// transaction has already committed and must not be held up here.
pub struct QueueFanout {
    tx: mpsc::Sender<ChangeEvent>,
    metrics: Metrics,
}

impl QueueFanout {
    pub fn new(tx: mpsc::Sender<ChangeEvent>, metrics: Metrics) -> Self {
        Self { tx, metrics }
    }
}

impl Fanout for QueueFanout {
    fn publish(&self, event: ChangeEvent) {
        if let Err(err) = self.tx.try_send(event) {
            self.metrics.fanout_dropped_total.inc();
            warn!(error = %err, "dropping change event: fanout queue unavailable");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::{Fanout, QueueFanout};
    use crate::fanout::events::{ChangeEvent, EventMeta};
    use crate::models::job::{Address, Job, JobStatus, JobType};
    use crate::observability::metrics::Metrics;

    fn job() -> Job {
        Job {
            id: Uuid::new_v4(),
            order_id: Some(Uuid::new_v4()),
            student_id: Uuid::new_v4(),
            mover_id: None,
            job_type: JobType::Storage,
            status: JobStatus::Available,
            volume: 10.0,
            price: 50.0,
            pickup_address: Address {
                lat: 49.2827,
                lon: -123.1207,
                formatted_address: "123 Test St".to_string(),
            },
            dropoff_address: Address {
                lat: 49.25,
                lon: -123.1,
                formatted_address: "456 Warehouse Ave".to_string(),
            },
            scheduled_time: Utc::now(),
            settled_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_enqueues_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let fanout = QueueFanout::new(tx, Metrics::new());

        fanout.publish(ChangeEvent::job_created(job(), EventMeta::now(None)));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "job.created");
    }

    #[tokio::test]
    async fn publish_swallows_closed_queue() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let metrics = Metrics::new();
        let fanout = QueueFanout::new(tx, metrics.clone());

        fanout.publish(ChangeEvent::job_created(job(), EventMeta::now(None)));

        assert_eq!(metrics.fanout_dropped_total.get(), 1);
    }
}
