pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::{Job, JobPatch};
use crate::models::order::{Order, OrderPatch};

/// Infrastructure-level failure of a backing store. Business outcomes such
/// as "no row matched" are expressed through `Option`, not through this.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: Job) -> Result<Job, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn find_all(&self) -> Result<Vec<Job>, StoreError>;

    async fn find_available(&self) -> Result<Vec<Job>, StoreError>;

    async fn find_by_mover(&self, mover_id: Uuid) -> Result<Vec<Job>, StoreError>;

    async fn find_by_student(&self, student_id: Uuid) -> Result<Vec<Job>, StoreError>;

    async fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Job>, StoreError>;

    /// Returns `None` when no job with `id` exists (deleted, or lost race).
    async fn update(&self, id: Uuid, patch: JobPatch) -> Result<Option<Job>, StoreError>;

    /// Atomic compare-and-set acceptance: moves the job from `Available`
    /// to `Accepted` with `mover_id` in one indivisible step. Returns
    /// `None` when the job is missing or no longer available; that is an
    /// outcome, not an error.
    async fn try_accept(&self, id: Uuid, mover_id: Uuid) -> Result<Option<Job>, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: Order) -> Result<Order, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn find_by_student(&self, student_id: Uuid) -> Result<Vec<Order>, StoreError>;

    async fn update(&self, id: Uuid, patch: OrderPatch) -> Result<Option<Order>, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Adds `amount` to the mover's balance.
    async fn credit_mover(&self, mover_id: Uuid, amount: f64) -> Result<(), StoreError>;
}
