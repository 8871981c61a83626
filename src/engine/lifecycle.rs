use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::engine::transition::plan_transition;
use crate::error::AppError;
use crate::fanout::Fanout;
use crate::fanout::events::{ChangeEvent, EventMeta};
use crate::models::job::{Address, Job, JobPatch, JobStatus, JobType};
use crate::models::order::{Order, OrderPatch, OrderStatus};
use crate::observability::metrics::Metrics;
use crate::store::{AccountStore, JobStore, OrderStore};

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub student_id: Uuid,
    pub volume: f64,
    pub price: f64,
    pub student_address: Address,
    pub warehouse_address: Address,
    pub pickup_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub order_id: Option<Uuid>,
    pub student_id: Uuid,
    pub job_type: JobType,
    pub volume: f64,
    pub price: f64,
    pub pickup_address: Address,
    pub dropoff_address: Address,
    pub scheduled_time: DateTime<Utc>,
}

/// Drives the job/order state machine end to end: transition validation,
/// the atomic acceptance race, derived order updates, mover settlement,
/// and change-event publication. All collaborators come in through ports
/// so tests and deployments can swap them freely.
#[derive(Clone)]
pub struct JobLifecycleService {
    jobs: Arc<dyn JobStore>,
    orders: Arc<dyn OrderStore>,
    accounts: Arc<dyn AccountStore>,
    fanout: Arc<dyn Fanout>,
    metrics: Metrics,
}

impl JobLifecycleService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        orders: Arc<dyn OrderStore>,
        accounts: Arc<dyn AccountStore>,
        fanout: Arc<dyn Fanout>,
        metrics: Metrics,
    ) -> Self {
        Self {
            jobs,
            orders,
            accounts,
            fanout,
            metrics,
        }
    }

    /// Places an order and schedules its STORAGE leg as an open job.
    pub async fn create_order(&self, new_order: NewOrder) -> Result<(Order, Job), AppError> {
        validate_amounts(new_order.volume, new_order.price)?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            student_id: new_order.student_id,
            mover_id: None,
            status: OrderStatus::Pending,
            volume: new_order.volume,
            price: new_order.price,
            student_address: new_order.student_address.clone(),
            warehouse_address: new_order.warehouse_address.clone(),
            return_address: None,
            pickup_time: new_order.pickup_time,
            return_time: None,
            created_at: now,
            updated_at: now,
        };
        let order = self.orders.create(order).await?;

        let job = self
            .create_job(NewJob {
                order_id: Some(order.id),
                student_id: order.student_id,
                job_type: JobType::Storage,
                volume: order.volume,
                price: order.price,
                pickup_address: new_order.student_address,
                dropoff_address: new_order.warehouse_address,
                scheduled_time: order.pickup_time,
            })
            .await?;

        info!(order_id = %order.id, job_id = %job.id, "order placed");
        self.fanout.publish(ChangeEvent::order_created(
            order.clone(),
            EventMeta::now(None),
        ));

        Ok((order, job))
    }

    /// Creates a job in `Available` and announces it to eligible movers.
    pub async fn create_job(&self, new_job: NewJob) -> Result<Job, AppError> {
        validate_amounts(new_job.volume, new_job.price)?;

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            order_id: new_job.order_id,
            student_id: new_job.student_id,
            mover_id: None,
            job_type: new_job.job_type,
            status: JobStatus::Available,
            volume: new_job.volume,
            price: new_job.price,
            pickup_address: new_job.pickup_address,
            dropoff_address: new_job.dropoff_address,
            scheduled_time: new_job.scheduled_time,
            settled_at: None,
            created_at: now,
            updated_at: now,
        };
        let job = self.jobs.create(job).await?;

        self.fanout
            .publish(ChangeEvent::job_created(job.clone(), EventMeta::now(None)));

        Ok(job)
    }

    /// Schedules the RETURN leg for an order whose goods are in storage.
    pub async fn schedule_return(
        &self,
        order_id: Uuid,
        return_address: Address,
        return_time: DateTime<Utc>,
    ) -> Result<Job, AppError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        if order.status != OrderStatus::InStorage {
            return Err(AppError::InvalidOrderTransition(format!(
                "cannot schedule a return while the order is {}",
                order.status
            )));
        }

        let order = self
            .orders
            .update(
                order_id,
                OrderPatch {
                    return_address: Some(return_address.clone()),
                    return_time: Some(return_time),
                    ..OrderPatch::default()
                },
            )
            .await?
            .ok_or(AppError::OrderNotFound)?;

        let job = self
            .create_job(NewJob {
                order_id: Some(order.id),
                student_id: order.student_id,
                job_type: JobType::Return,
                volume: order.volume,
                price: order.price,
                pickup_address: order.warehouse_address.clone(),
                dropoff_address: return_address,
                scheduled_time: return_time,
            })
            .await?;

        info!(order_id = %order.id, job_id = %job.id, "return leg scheduled");
        self.fanout
            .publish(ChangeEvent::order_updated(order, EventMeta::now(None)));

        Ok(job)
    }

    /// Cancels a non-terminal order. The only status a client sets directly.
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<Order, AppError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        if order.status.is_terminal() {
            return Err(AppError::InvalidOrderTransition(format!(
                "order is already {}",
                order.status
            )));
        }

        let order = self
            .orders
            .update(order_id, OrderPatch::status(OrderStatus::Cancelled))
            .await?
            .ok_or(AppError::OrderNotFound)?;

        info!(order_id = %order.id, "order cancelled");
        self.fanout.publish(ChangeEvent::order_updated(
            order.clone(),
            EventMeta::now(None),
        ));

        Ok(order)
    }

    /// Applies one job-status change end to end. Acceptance goes through
    /// the store's compare-and-set so concurrent movers cannot both win;
    /// everything else validates against the transition table first.
    pub async fn request_status_change(
        &self,
        job_id: Uuid,
        requested: JobStatus,
        acting_mover: Option<Uuid>,
    ) -> Result<Job, AppError> {
        let result = self
            .apply_status_change(job_id, requested, acting_mover)
            .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        self.metrics
            .status_changes_total
            .with_label_values(&[outcome])
            .inc();

        result
    }

    async fn apply_status_change(
        &self,
        job_id: Uuid,
        requested: JobStatus,
        acting_mover: Option<Uuid>,
    ) -> Result<Job, AppError> {
        let job = self.load_job(job_id).await?;

        let (updated, plan) = if requested == JobStatus::Accepted {
            let mover_id = acting_mover.ok_or_else(|| {
                AppError::BadRequest("mover_id is required to accept a job".to_string())
            })?;

            // The one genuinely contested step: the store decides the
            // winner in a single conditional write keyed on AVAILABLE.
            let won = self
                .jobs
                .try_accept(job_id, mover_id)
                .await?
                .ok_or(AppError::JobAlreadyAccepted)?;

            let plan = plan_transition(JobStatus::Available, JobStatus::Accepted, won.job_type)?;
            (won, plan)
        } else {
            let plan = plan_transition(job.status, requested, job.job_type)?;

            let mut patch = JobPatch::status(plan.job_status);
            if plan.settles_mover && job.settled_at.is_none() {
                patch.settled_at = Some(Utc::now());
            }

            let updated = self
                .jobs
                .update(job_id, patch)
                .await?
                .ok_or(AppError::JobNotFound)?;
            (updated, plan)
        };

        let newly_settled = plan.settles_mover && job.settled_at.is_none();

        // Order consistency is a correctness invariant: any failure from
        // here through settlement fails the whole request. The job write
        // stays applied; the caller re-drives the workflow.
        let changed_order = match plan.order_status {
            Some(order_status) => Some(self.apply_order_update(&updated, order_status).await?),
            None => None,
        };

        if newly_settled {
            let mover_id = updated.mover_id.ok_or(AppError::DataIntegrity)?;
            self.accounts.credit_mover(mover_id, updated.price).await?;
            info!(
                job_id = %updated.id,
                mover_id = %mover_id,
                amount = updated.price,
                "mover settled"
            );
        }

        info!(
            job_id = %updated.id,
            status = %updated.status,
            "job status changed"
        );

        let meta = EventMeta::now(acting_mover);
        self.fanout
            .publish(ChangeEvent::job_updated(updated.clone(), meta.clone()));
        if let Some(order) = changed_order {
            self.fanout.publish(ChangeEvent::order_updated(order, meta));
        }

        Ok(updated)
    }

    async fn apply_order_update(
        &self,
        job: &Job,
        order_status: OrderStatus,
    ) -> Result<Order, AppError> {
        let order_id = job.order_id.ok_or(AppError::DataIntegrity)?;

        let mut patch = OrderPatch::status(order_status);
        if order_status == OrderStatus::Accepted {
            patch.mover_id = job.mover_id;
        }

        self.orders
            .update(order_id, patch)
            .await?
            .ok_or_else(|| {
                AppError::Dependency(format!(
                    "order {order_id} missing while updating job {}",
                    job.id
                ))
            })
    }

    /// Mover reports arrival at the pickup address; the student has to
    /// confirm before the goods count as picked up.
    pub async fn request_pickup_confirmation(
        &self,
        job_id: Uuid,
        acting_mover: Uuid,
    ) -> Result<Job, AppError> {
        self.assert_assigned_mover(job_id, acting_mover).await?;
        self.request_status_change(job_id, JobStatus::AwaitingStudentConfirmation, None)
            .await
    }

    /// Student confirms the mover collected the goods.
    pub async fn confirm_pickup(&self, job_id: Uuid, acting_student: Uuid) -> Result<Job, AppError> {
        self.assert_owning_student(job_id, acting_student).await?;
        self.request_status_change(job_id, JobStatus::PickedUp, None)
            .await
    }

    /// Mover reports the goods delivered; the student has to confirm to
    /// complete the job.
    pub async fn request_delivery_confirmation(
        &self,
        job_id: Uuid,
        acting_mover: Uuid,
    ) -> Result<Job, AppError> {
        self.assert_assigned_mover(job_id, acting_mover).await?;
        self.request_status_change(job_id, JobStatus::AwaitingStudentConfirmation, None)
            .await
    }

    /// Student confirms delivery, completing the job.
    pub async fn confirm_delivery(
        &self,
        job_id: Uuid,
        acting_student: Uuid,
    ) -> Result<Job, AppError> {
        self.assert_owning_student(job_id, acting_student).await?;
        self.request_status_change(job_id, JobStatus::Completed, None)
            .await
    }

    async fn load_job(&self, job_id: Uuid) -> Result<Job, AppError> {
        self.jobs
            .find_by_id(job_id)
            .await?
            .ok_or(AppError::JobNotFound)
    }

    async fn assert_assigned_mover(&self, job_id: Uuid, mover_id: Uuid) -> Result<(), AppError> {
        let job = self.load_job(job_id).await?;
        if job.mover_id != Some(mover_id) {
            return Err(AppError::UnauthorizedActor);
        }
        Ok(())
    }

    async fn assert_owning_student(&self, job_id: Uuid, student_id: Uuid) -> Result<(), AppError> {
        let job = self.load_job(job_id).await?;
        if job.student_id != student_id {
            return Err(AppError::UnauthorizedActor);
        }
        Ok(())
    }
}

fn validate_amounts(volume: f64, price: f64) -> Result<(), AppError> {
    if !volume.is_finite() || volume < 0.0 {
        return Err(AppError::BadRequest(
            "volume must be non-negative".to_string(),
        ));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::BadRequest(
            "price must be non-negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{Duration, Utc};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::{JobLifecycleService, NewJob, NewOrder};
    use crate::error::AppError;
    use crate::fanout::events::ChangeEvent;
    use crate::fanout::{Fanout, QueueFanout};
    use crate::models::job::{Address, JobStatus, JobType};
    use crate::models::order::OrderStatus;
    use crate::observability::metrics::Metrics;
    use crate::store::memory::{MemoryAccountStore, MemoryJobStore, MemoryOrderStore};
    use crate::store::{JobStore, OrderStore};

    #[derive(Default)]
    struct RecordingFanout {
        events: Mutex<Vec<String>>,
    }

    impl RecordingFanout {
        fn names(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Fanout for RecordingFanout {
        fn publish(&self, event: ChangeEvent) {
            self.events.lock().unwrap().push(event.name().to_string());
        }
    }

    struct Harness {
        service: JobLifecycleService,
        jobs: Arc<MemoryJobStore>,
        orders: Arc<MemoryOrderStore>,
        accounts: Arc<MemoryAccountStore>,
        fanout: Arc<RecordingFanout>,
    }

    fn harness() -> Harness {
        let jobs = Arc::new(MemoryJobStore::new());
        let orders = Arc::new(MemoryOrderStore::new());
        let accounts = Arc::new(MemoryAccountStore::new());
        let fanout = Arc::new(RecordingFanout::default());
        let service = JobLifecycleService::new(
            jobs.clone(),
            orders.clone(),
            accounts.clone(),
            fanout.clone(),
            Metrics::new(),
        );
        Harness {
            service,
            jobs,
            orders,
            accounts,
            fanout,
        }
    }

    fn address(formatted: &str) -> Address {
        Address {
            lat: 49.2827,
            lon: -123.1207,
            formatted_address: formatted.to_string(),
        }
    }

    fn new_order(student: Uuid) -> NewOrder {
        NewOrder {
            student_id: student,
            volume: 100.0,
            price: 50.0,
            student_address: address("123 Test St"),
            warehouse_address: address("456 Warehouse Ave"),
            pickup_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn placing_an_order_opens_a_storage_job() {
        let h = harness();
        let student = Uuid::new_v4();

        let (order, job) = h.service.create_order(new_order(student)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(job.status, JobStatus::Available);
        assert_eq!(job.job_type, JobType::Storage);
        assert_eq!(job.order_id, Some(order.id));
        assert!(job.mover_id.is_none());
        assert_eq!(h.fanout.names(), vec!["job.created", "order.created"]);
    }

    #[tokio::test]
    async fn negative_price_is_rejected_at_placement() {
        let h = harness();
        let mut req = new_order(Uuid::new_v4());
        req.price = -1.0;

        let result = h.service.create_order(req).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn accepting_a_job_assigns_mover_and_order() {
        let h = harness();
        let (order, job) = h.service.create_order(new_order(Uuid::new_v4())).await.unwrap();
        let mover = Uuid::new_v4();

        let accepted = h
            .service
            .request_status_change(job.id, JobStatus::Accepted, Some(mover))
            .await
            .unwrap();

        assert_eq!(accepted.status, JobStatus::Accepted);
        assert_eq!(accepted.mover_id, Some(mover));

        let order = h.orders.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(order.mover_id, Some(mover));
    }

    #[tokio::test]
    async fn accept_without_mover_is_a_bad_request() {
        let h = harness();
        let (_, job) = h.service.create_order(new_order(Uuid::new_v4())).await.unwrap();

        let result = h
            .service
            .request_status_change(job.id, JobStatus::Accepted, None)
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn losing_mover_sees_job_already_accepted_and_state_is_kept() {
        let h = harness();
        let (_, job) = h.service.create_order(new_order(Uuid::new_v4())).await.unwrap();
        let winner = Uuid::new_v4();
        let loser = Uuid::new_v4();

        h.service
            .request_status_change(job.id, JobStatus::Accepted, Some(winner))
            .await
            .unwrap();
        let result = h
            .service
            .request_status_change(job.id, JobStatus::Accepted, Some(loser))
            .await;

        assert!(matches!(result, Err(AppError::JobAlreadyAccepted)));
        let stored = h.jobs.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.mover_id, Some(winner));
    }

    #[tokio::test]
    async fn exactly_one_of_many_concurrent_accepts_wins() {
        let h = harness();
        let (_, job) = h.service.create_order(new_order(Uuid::new_v4())).await.unwrap();

        let movers: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();
        let mut handles = Vec::new();
        for mover in &movers {
            let service = h.service.clone();
            let job_id = job.id;
            let mover = *mover;
            handles.push(tokio::spawn(async move {
                service
                    .request_status_change(job_id, JobStatus::Accepted, Some(mover))
                    .await
            }));
        }

        let mut winners = Vec::new();
        let mut losses = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(job) => winners.push(job.mover_id.unwrap()),
                Err(AppError::JobAlreadyAccepted) => losses += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(losses, movers.len() - 1);
        let stored = h.jobs.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.mover_id, Some(winners[0]));
    }

    #[tokio::test]
    async fn off_table_transition_leaves_job_and_order_unchanged() {
        let h = harness();
        let (order, job) = h.service.create_order(new_order(Uuid::new_v4())).await.unwrap();

        let result = h
            .service
            .request_status_change(job.id, JobStatus::PickedUp, None)
            .await;

        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
        let stored = h.jobs.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Available);
        let order = h.orders.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_job_fails_with_job_not_found() {
        let h = harness();
        let result = h
            .service
            .request_status_change(Uuid::new_v4(), JobStatus::PickedUp, None)
            .await;
        assert!(matches!(result, Err(AppError::JobNotFound)));
    }

    #[tokio::test]
    async fn storage_completion_drives_order_in_storage_and_credits_once() {
        let h = harness();
        let (order, job) = h.service.create_order(new_order(Uuid::new_v4())).await.unwrap();
        let mover = Uuid::new_v4();

        h.service
            .request_status_change(job.id, JobStatus::Accepted, Some(mover))
            .await
            .unwrap();
        h.service
            .request_status_change(job.id, JobStatus::PickedUp, None)
            .await
            .unwrap();
        let completed = h
            .service
            .request_status_change(job.id, JobStatus::Completed, None)
            .await
            .unwrap();

        assert_eq!(completed.status, JobStatus::Completed);
        assert!(completed.settled_at.is_some());
        let order = h.orders.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::InStorage);
        assert_eq!(h.accounts.balance(mover), job.price);

        // Terminal: a replayed completion is rejected and never re-credits.
        let replay = h
            .service
            .request_status_change(job.id, JobStatus::Completed, None)
            .await;
        assert!(matches!(replay, Err(AppError::InvalidTransition { .. })));
        assert_eq!(h.accounts.balance(mover), job.price);
    }

    #[tokio::test]
    async fn return_leg_confirmation_flow_lands_order_returned() {
        let h = harness();
        let student = Uuid::new_v4();
        let mover = Uuid::new_v4();
        let (order, storage_job) = h.service.create_order(new_order(student)).await.unwrap();

        h.service
            .request_status_change(storage_job.id, JobStatus::Accepted, Some(mover))
            .await
            .unwrap();
        h.service
            .request_status_change(storage_job.id, JobStatus::PickedUp, None)
            .await
            .unwrap();
        h.service
            .request_status_change(storage_job.id, JobStatus::Completed, None)
            .await
            .unwrap();

        let return_job = h
            .service
            .schedule_return(order.id, address("123 Test St"), Utc::now() + Duration::days(7))
            .await
            .unwrap();
        assert_eq!(return_job.job_type, JobType::Return);
        assert_eq!(return_job.status, JobStatus::Available);

        h.service
            .request_status_change(return_job.id, JobStatus::Accepted, Some(mover))
            .await
            .unwrap();
        h.service
            .request_status_change(return_job.id, JobStatus::PickedUp, None)
            .await
            .unwrap();
        h.service
            .request_delivery_confirmation(return_job.id, mover)
            .await
            .unwrap();
        let completed = h.service.confirm_delivery(return_job.id, student).await.unwrap();

        assert_eq!(completed.status, JobStatus::Completed);
        let order = h.orders.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Returned);
        // One settlement per job: storage leg + return leg.
        assert_eq!(h.accounts.balance(mover), storage_job.price + return_job.price);
    }

    #[tokio::test]
    async fn pickup_confirmation_handshake_round_trips() {
        let h = harness();
        let student = Uuid::new_v4();
        let mover = Uuid::new_v4();
        let (order, job) = h.service.create_order(new_order(student)).await.unwrap();

        h.service
            .request_status_change(job.id, JobStatus::Accepted, Some(mover))
            .await
            .unwrap();
        h.service
            .request_status_change(job.id, JobStatus::PickedUp, None)
            .await
            .unwrap();

        let awaiting = h
            .service
            .request_pickup_confirmation(job.id, mover)
            .await
            .unwrap();
        assert_eq!(awaiting.status, JobStatus::AwaitingStudentConfirmation);

        let confirmed = h.service.confirm_pickup(job.id, student).await.unwrap();
        assert_eq!(confirmed.status, JobStatus::PickedUp);
        let order = h.orders.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::PickedUp);
    }

    #[tokio::test]
    async fn confirmation_endpoints_reject_wrong_actor() {
        let h = harness();
        let student = Uuid::new_v4();
        let mover = Uuid::new_v4();
        let (_, job) = h.service.create_order(new_order(student)).await.unwrap();

        h.service
            .request_status_change(job.id, JobStatus::Accepted, Some(mover))
            .await
            .unwrap();
        h.service
            .request_status_change(job.id, JobStatus::PickedUp, None)
            .await
            .unwrap();

        let intruder = Uuid::new_v4();
        assert!(matches!(
            h.service.request_pickup_confirmation(job.id, intruder).await,
            Err(AppError::UnauthorizedActor)
        ));

        h.service.request_pickup_confirmation(job.id, mover).await.unwrap();
        assert!(matches!(
            h.service.confirm_pickup(job.id, intruder).await,
            Err(AppError::UnauthorizedActor)
        ));
    }

    #[tokio::test]
    async fn missing_order_fails_request_but_job_write_stays() {
        let h = harness();
        let job = h
            .service
            .create_job(NewJob {
                order_id: Some(Uuid::new_v4()),
                student_id: Uuid::new_v4(),
                job_type: JobType::Storage,
                volume: 10.0,
                price: 50.0,
                pickup_address: address("123 Test St"),
                dropoff_address: address("456 Warehouse Ave"),
                scheduled_time: Utc::now(),
            })
            .await
            .unwrap();
        let mover = Uuid::new_v4();

        let result = h
            .service
            .request_status_change(job.id, JobStatus::Accepted, Some(mover))
            .await;

        assert!(matches!(result, Err(AppError::Dependency(_))));
        let stored = h.jobs.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Accepted);
        assert_eq!(stored.mover_id, Some(mover));
    }

    #[tokio::test]
    async fn job_without_order_reference_is_a_data_integrity_error() {
        let h = harness();
        let job = h
            .service
            .create_job(NewJob {
                order_id: None,
                student_id: Uuid::new_v4(),
                job_type: JobType::Storage,
                volume: 10.0,
                price: 50.0,
                pickup_address: address("123 Test St"),
                dropoff_address: address("456 Warehouse Ave"),
                scheduled_time: Utc::now(),
            })
            .await
            .unwrap();

        let result = h
            .service
            .request_status_change(job.id, JobStatus::Accepted, Some(Uuid::new_v4()))
            .await;

        assert!(matches!(result, Err(AppError::DataIntegrity)));
    }

    #[tokio::test]
    async fn fanout_transport_failure_never_fails_the_request() {
        let jobs = Arc::new(MemoryJobStore::new());
        let orders = Arc::new(MemoryOrderStore::new());
        let accounts = Arc::new(MemoryAccountStore::new());
        // A queue with no publisher behind it: every publish hits a
        // closed channel and gets dropped.
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let service = JobLifecycleService::new(
            jobs.clone(),
            orders.clone(),
            accounts,
            Arc::new(QueueFanout::new(tx, Metrics::new())),
            Metrics::new(),
        );

        let (order, job) = service.create_order(new_order(Uuid::new_v4())).await.unwrap();
        let mover = Uuid::new_v4();
        let accepted = service
            .request_status_change(job.id, JobStatus::Accepted, Some(mover))
            .await
            .unwrap();

        assert_eq!(accepted.status, JobStatus::Accepted);
        let stored_order = orders.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored_order.status, OrderStatus::Accepted);
    }

    #[tokio::test]
    async fn cancel_order_is_rejected_once_terminal() {
        let h = harness();
        let (order, _) = h.service.create_order(new_order(Uuid::new_v4())).await.unwrap();

        let cancelled = h.service.cancel_order(order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let again = h.service.cancel_order(order.id).await;
        assert!(matches!(again, Err(AppError::InvalidOrderTransition(_))));
    }

    #[tokio::test]
    async fn return_leg_requires_order_in_storage() {
        let h = harness();
        let (order, _) = h.service.create_order(new_order(Uuid::new_v4())).await.unwrap();

        let result = h
            .service
            .schedule_return(order.id, address("123 Test St"), Utc::now())
            .await;

        assert!(matches!(result, Err(AppError::InvalidOrderTransition(_))));
    }
}
