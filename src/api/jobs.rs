use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::lifecycle::NewJob;
use crate::error::AppError;
use crate::models::job::{Address, Job, JobStatus, JobType};
use crate::state::AppState;
use crate::store::JobStore;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/available", get(list_available_jobs))
        .route("/jobs/mover/:mover_id", get(list_mover_jobs))
        .route("/jobs/student/:student_id", get(list_student_jobs))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/status", patch(update_job_status))
        .route("/jobs/:id/arrived", post(mover_arrived))
        .route("/jobs/:id/confirm-pickup", post(confirm_pickup))
        .route("/jobs/:id/delivered", post(mover_delivered))
        .route("/jobs/:id/confirm-delivery", post(confirm_delivery))
}

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub order_id: Option<Uuid>,
    pub student_id: Uuid,
    pub job_type: JobType,
    pub volume: f64,
    pub price: f64,
    pub pickup_address: Address,
    pub dropoff_address: Address,
    pub scheduled_time: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: JobStatus,
    pub mover_id: Option<Uuid>,
}

/// Authenticated principal forwarded by the gateway. Identity is the
/// upstream's concern; ownership checks happen here.
#[derive(Deserialize)]
pub struct MoverActionRequest {
    pub mover_id: Uuid,
}

#[derive(Deserialize)]
pub struct StudentActionRequest {
    pub student_id: Uuid,
}

async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateJobRequest>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .lifecycle
        .create_job(NewJob {
            order_id: payload.order_id,
            student_id: payload.student_id,
            job_type: payload.job_type,
            volume: payload.volume,
            price: payload.price,
            pickup_address: payload.pickup_address,
            dropoff_address: payload.dropoff_address,
            scheduled_time: payload.scheduled_time,
        })
        .await?;

    Ok(Json(job))
}

async fn list_jobs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.jobs.find_all().await?))
}

async fn list_available_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.jobs.find_available().await?))
}

async fn list_mover_jobs(
    State(state): State<Arc<AppState>>,
    Path(mover_id): Path<Uuid>,
) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.jobs.find_by_mover(mover_id).await?))
}

async fn list_student_jobs(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.jobs.find_by_student(student_id).await?))
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .jobs
        .find_by_id(id)
        .await?
        .ok_or(AppError::JobNotFound)?;

    Ok(Json(job))
}

async fn update_job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .lifecycle
        .request_status_change(id, payload.status, payload.mover_id)
        .await?;

    Ok(Json(job))
}

async fn mover_arrived(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MoverActionRequest>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .lifecycle
        .request_pickup_confirmation(id, payload.mover_id)
        .await?;

    Ok(Json(job))
}

async fn confirm_pickup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StudentActionRequest>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .lifecycle
        .confirm_pickup(id, payload.student_id)
        .await?;

    Ok(Json(job))
}

async fn mover_delivered(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MoverActionRequest>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .lifecycle
        .request_delivery_confirmation(id, payload.mover_id)
        .await?;

    Ok(Json(job))
}

async fn confirm_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StudentActionRequest>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .lifecycle
        .confirm_delivery(id, payload.student_id)
        .await?;

    Ok(Json(job))
}
