use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geocoded location as produced by the upstream address service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub lat: f64,
    pub lon: f64,
    pub formatted_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Storage,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Available,
    Accepted,
    PickedUp,
    AwaitingStudentConfirmation,
    Completed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Available => "AVAILABLE",
            JobStatus::Accepted => "ACCEPTED",
            JobStatus::PickedUp => "PICKED_UP",
            JobStatus::AwaitingStudentConfirmation => "AWAITING_STUDENT_CONFIRMATION",
            JobStatus::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

/// A single leg of work offered on the marketplace.
///
/// `mover_id` is set exactly when the job has left `Available`; the
/// acceptance path in the store is the only place it gets written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub student_id: Uuid,
    pub mover_id: Option<Uuid>,
    pub job_type: JobType,
    pub status: JobStatus,
    pub volume: f64,
    pub price: f64,
    pub pickup_address: Address,
    pub dropoff_address: Address,
    pub scheduled_time: DateTime<Utc>,
    /// Set when the mover's payout for this job has been credited.
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller may change on an existing job. `None` leaves the
/// field untouched; the store bumps `updated_at` on every applied patch.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub mover_id: Option<Uuid>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}
