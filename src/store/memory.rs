use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::job::{Job, JobPatch, JobStatus};
use crate::models::order::{Order, OrderPatch};
use crate::store::{AccountStore, JobStore, OrderStore, StoreError};

/// Process-local job store. A `DashMap` entry lock makes every
/// read-modify-write of a single job atomic, which is all `try_accept`
/// needs to guarantee a single winner.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: DashMap<Uuid, Job>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<F>(&self, predicate: F) -> Vec<Job>
    where
        F: Fn(&Job) -> bool,
    {
        self.jobs
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: Job) -> Result<Job, StoreError> {
        self.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_all(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.collect(|_| true))
    }

    async fn find_available(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.collect(|job| job.status == JobStatus::Available))
    }

    async fn find_by_mover(&self, mover_id: Uuid) -> Result<Vec<Job>, StoreError> {
        Ok(self.collect(|job| job.mover_id == Some(mover_id)))
    }

    async fn find_by_student(&self, student_id: Uuid) -> Result<Vec<Job>, StoreError> {
        Ok(self.collect(|job| job.student_id == student_id))
    }

    async fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Job>, StoreError> {
        Ok(self.collect(|job| job.order_id == Some(order_id)))
    }

    async fn update(&self, id: Uuid, patch: JobPatch) -> Result<Option<Job>, StoreError> {
        let Some(mut job) = self.jobs.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(status) = patch.status {
            job.status = status;
        }
        if let Some(mover_id) = patch.mover_id {
            job.mover_id = Some(mover_id);
        }
        if let Some(settled_at) = patch.settled_at {
            job.settled_at = Some(settled_at);
        }
        job.updated_at = Utc::now();

        Ok(Some(job.clone()))
    }

    async fn try_accept(&self, id: Uuid, mover_id: Uuid) -> Result<Option<Job>, StoreError> {
        let Some(mut job) = self.jobs.get_mut(&id) else {
            return Ok(None);
        };

        if job.status != JobStatus::Available {
            return Ok(None);
        }

        job.status = JobStatus::Accepted;
        job.mover_id = Some(mover_id);
        job.updated_at = Utc::now();

        Ok(Some(job.clone()))
    }
}

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: DashMap<Uuid, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, order: Order) -> Result<Order, StoreError> {
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_student(&self, student_id: Uuid) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .iter()
            .filter(|entry| entry.value().student_id == student_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn update(&self, id: Uuid, patch: OrderPatch) -> Result<Option<Order>, StoreError> {
        let Some(mut order) = self.orders.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(status) = patch.status {
            order.status = status;
        }
        if let Some(mover_id) = patch.mover_id {
            order.mover_id = Some(mover_id);
        }
        if let Some(return_address) = patch.return_address {
            order.return_address = Some(return_address);
        }
        if let Some(return_time) = patch.return_time {
            order.return_time = Some(return_time);
        }
        order.updated_at = Utc::now();

        Ok(Some(order.clone()))
    }
}

/// Mover balances, keyed by mover id. Missing accounts start at zero.
#[derive(Default)]
pub struct MemoryAccountStore {
    balances: DashMap<Uuid, f64>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, mover_id: Uuid) -> f64 {
        self.balances
            .get(&mover_id)
            .map(|entry| *entry.value())
            .unwrap_or(0.0)
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn credit_mover(&self, mover_id: Uuid, amount: f64) -> Result<(), StoreError> {
        *self.balances.entry(mover_id).or_insert(0.0) += amount;
        Ok(())
    }
}
