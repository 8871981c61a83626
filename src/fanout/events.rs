use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::models::job::Job;
use crate::models::order::Order;

/// Envelope attached to every outbound event. Callers that don't care
/// pass `EventMeta::now(None)` and get a stamped default.
#[derive(Debug, Clone, Serialize)]
pub struct EventMeta {
    pub actor: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    pub fn now(actor: Option<Uuid>) -> Self {
        Self {
            actor,
            timestamp: Utc::now(),
        }
    }
}

/// Delivery target for one event copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Room {
    /// A single connected user, student or mover.
    User(Uuid),
    /// Every connected mover; used for jobs nobody has claimed yet.
    Movers,
}

#[derive(Debug, Clone)]
pub enum ChangeEvent {
    JobCreated { job: Job, meta: EventMeta },
    JobUpdated { job: Job, meta: EventMeta },
    OrderCreated { order: Order, meta: EventMeta },
    OrderUpdated { order: Order, meta: EventMeta },
}

impl ChangeEvent {
    pub fn job_created(job: Job, meta: EventMeta) -> Self {
        ChangeEvent::JobCreated { job, meta }
    }

    pub fn job_updated(job: Job, meta: EventMeta) -> Self {
        ChangeEvent::JobUpdated { job, meta }
    }

    pub fn order_created(order: Order, meta: EventMeta) -> Self {
        ChangeEvent::OrderCreated { order, meta }
    }

    pub fn order_updated(order: Order, meta: EventMeta) -> Self {
        ChangeEvent::OrderUpdated { order, meta }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::JobCreated { .. } => "job.created",
            ChangeEvent::JobUpdated { .. } => "job.updated",
            ChangeEvent::OrderCreated { .. } => "order.created",
            ChangeEvent::OrderUpdated { .. } => "order.updated",
        }
    }

    /// Job events go to the assigned mover when there is one, otherwise to
    /// every connected mover, and always to the owning student. Order
    /// events go to the student and the assigned mover.
    pub fn targets(&self) -> Vec<Room> {
        match self {
            ChangeEvent::JobCreated { job, .. } | ChangeEvent::JobUpdated { job, .. } => {
                let mut rooms = match job.mover_id {
                    Some(mover_id) => vec![Room::User(mover_id)],
                    None => vec![Room::Movers],
                };
                rooms.push(Room::User(job.student_id));
                rooms
            }
            ChangeEvent::OrderCreated { order, .. } | ChangeEvent::OrderUpdated { order, .. } => {
                let mut rooms = vec![Room::User(order.student_id)];
                if let Some(mover_id) = order.mover_id {
                    rooms.push(Room::User(mover_id));
                }
                rooms
            }
        }
    }

    pub fn to_payload(&self) -> serde_json::Value {
        match self {
            ChangeEvent::JobCreated { job, meta } | ChangeEvent::JobUpdated { job, meta } => {
                json!({
                    "event": self.name(),
                    "job": job,
                    "meta": meta,
                })
            }
            ChangeEvent::OrderCreated { order, meta }
            | ChangeEvent::OrderUpdated { order, meta } => json!({
                "event": self.name(),
                "order": order,
                "meta": meta,
            }),
        }
    }
}
