use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Accepted,
    PickedUp,
    InStorage,
    Returned,
    Cancelled,
}

impl OrderStatus {
    /// Terminal orders accept no further transitions, including cancellation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Returned | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::PickedUp => "PICKED_UP",
            OrderStatus::InStorage => "IN_STORAGE",
            OrderStatus::Returned => "RETURNED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// A customer order. Its status is derived from the statuses of its child
/// jobs; clients never set it directly except through cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub student_id: Uuid,
    pub mover_id: Option<Uuid>,
    pub status: OrderStatus,
    pub volume: f64,
    pub price: f64,
    pub student_address: Address,
    pub warehouse_address: Address,
    pub return_address: Option<Address>,
    pub pickup_time: DateTime<Utc>,
    pub return_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub mover_id: Option<Uuid>,
    pub return_address: Option<Address>,
    pub return_time: Option<DateTime<Utc>>,
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}
