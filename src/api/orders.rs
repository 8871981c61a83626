use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::lifecycle::NewOrder;
use crate::error::AppError;
use crate::models::job::{Address, Job};
use crate::models::order::Order;
use crate::state::AppState;
use crate::store::{JobStore, OrderStore};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order).delete(cancel_order))
        .route("/orders/:id/jobs", get(list_order_jobs))
        .route("/orders/:id/return", post(schedule_return))
        .route("/orders/student/:student_id", get(list_student_orders))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub student_id: Uuid,
    pub volume: f64,
    pub price: f64,
    pub student_address: Address,
    pub warehouse_address: Address,
    pub pickup_time: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CreateOrderResponse {
    pub order: Order,
    pub job: Job,
}

#[derive(Deserialize)]
pub struct ScheduleReturnRequest {
    pub return_address: Address,
    pub return_time: DateTime<Utc>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let (order, job) = state
        .lifecycle
        .create_order(NewOrder {
            student_id: payload.student_id,
            volume: payload.volume,
            price: payload.price,
            student_address: payload.student_address,
            warehouse_address: payload.warehouse_address,
            pickup_time: payload.pickup_time,
        })
        .await?;

    Ok(Json(CreateOrderResponse { order, job }))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .find_by_id(id)
        .await?
        .ok_or(AppError::OrderNotFound)?;

    Ok(Json(order))
}

async fn list_order_jobs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.jobs.find_by_order(id).await?))
}

async fn list_student_orders(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orders.find_by_student(student_id).await?))
}

async fn schedule_return(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScheduleReturnRequest>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .lifecycle
        .schedule_return(id, payload.return_address, payload.return_time)
        .await?;

    Ok(Json(job))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.lifecycle.cancel_order(id).await?;
    Ok(Json(order))
}
