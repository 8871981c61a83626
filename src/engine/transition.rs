use crate::error::AppError;
use crate::models::job::{JobStatus, JobType};
use crate::models::order::OrderStatus;

/// Everything a legal transition entails, computed up front so the
/// orchestration layer only has to apply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub job_status: JobStatus,
    /// Derived parent-order status; `None` when the order is untouched.
    pub order_status: Option<OrderStatus>,
    /// True when this transition is the mover's settlement milestone.
    pub settles_mover: bool,
}

/// Validates a requested job-status edge and derives its side effects.
///
/// Pure function of its inputs; performs no I/O. The legal edges form a
/// DAG with `Completed` as the only terminal state, plus the one loop
/// between `PickedUp` and `AwaitingStudentConfirmation` used by the
/// confirmation handshake.
pub fn plan_transition(
    current: JobStatus,
    requested: JobStatus,
    job_type: JobType,
) -> Result<TransitionPlan, AppError> {
    use JobStatus::*;

    let legal = matches!(
        (current, requested),
        (Available, Accepted)
            | (Accepted, PickedUp)
            | (PickedUp, AwaitingStudentConfirmation)
            | (AwaitingStudentConfirmation, PickedUp)
            | (PickedUp, Completed)
            | (AwaitingStudentConfirmation, Completed)
    );

    if !legal {
        return Err(AppError::InvalidTransition {
            from: current,
            to: requested,
        });
    }

    let order_status = derive_order_status(job_type, requested);
    let settles_mover = matches!(
        order_status,
        Some(OrderStatus::InStorage) | Some(OrderStatus::Returned)
    );

    Ok(TransitionPlan {
        job_status: requested,
        order_status,
        settles_mover,
    })
}

/// The parent order tracks its jobs: acceptance and pickup map directly,
/// completion lands the goods in storage (STORAGE leg) or back with the
/// student (RETURN leg). The confirmation-pending state is job-internal.
fn derive_order_status(job_type: JobType, new_status: JobStatus) -> Option<OrderStatus> {
    match (job_type, new_status) {
        (_, JobStatus::Accepted) => Some(OrderStatus::Accepted),
        (_, JobStatus::PickedUp) => Some(OrderStatus::PickedUp),
        (JobType::Storage, JobStatus::Completed) => Some(OrderStatus::InStorage),
        (JobType::Return, JobStatus::Completed) => Some(OrderStatus::Returned),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{plan_transition, TransitionPlan};
    use crate::error::AppError;
    use crate::models::job::{JobStatus, JobType};
    use crate::models::order::OrderStatus;

    const ALL_STATUSES: [JobStatus; 5] = [
        JobStatus::Available,
        JobStatus::Accepted,
        JobStatus::PickedUp,
        JobStatus::AwaitingStudentConfirmation,
        JobStatus::Completed,
    ];

    const LEGAL_EDGES: [(JobStatus, JobStatus); 6] = [
        (JobStatus::Available, JobStatus::Accepted),
        (JobStatus::Accepted, JobStatus::PickedUp),
        (JobStatus::PickedUp, JobStatus::AwaitingStudentConfirmation),
        (JobStatus::AwaitingStudentConfirmation, JobStatus::PickedUp),
        (JobStatus::PickedUp, JobStatus::Completed),
        (JobStatus::AwaitingStudentConfirmation, JobStatus::Completed),
    ];

    #[test]
    fn every_legal_edge_is_accepted_for_both_job_types() {
        for job_type in [JobType::Storage, JobType::Return] {
            for (from, to) in LEGAL_EDGES {
                let plan = plan_transition(from, to, job_type).unwrap();
                assert_eq!(plan.job_status, to);
            }
        }
    }

    #[test]
    fn every_off_table_edge_is_rejected() {
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                if LEGAL_EDGES.contains(&(from, to)) {
                    continue;
                }
                let result = plan_transition(from, to, JobType::Storage);
                assert!(
                    matches!(result, Err(AppError::InvalidTransition { .. })),
                    "{from} -> {to} should be rejected"
                );
            }
        }
    }

    #[test]
    fn completed_is_terminal() {
        for to in ALL_STATUSES {
            assert!(plan_transition(JobStatus::Completed, to, JobType::Return).is_err());
        }
    }

    #[test]
    fn acceptance_drives_order_to_accepted() {
        for job_type in [JobType::Storage, JobType::Return] {
            let plan =
                plan_transition(JobStatus::Available, JobStatus::Accepted, job_type).unwrap();
            assert_eq!(plan.order_status, Some(OrderStatus::Accepted));
            assert!(!plan.settles_mover);
        }
    }

    #[test]
    fn pickup_drives_order_to_picked_up() {
        for job_type in [JobType::Storage, JobType::Return] {
            let plan = plan_transition(JobStatus::Accepted, JobStatus::PickedUp, job_type).unwrap();
            assert_eq!(plan.order_status, Some(OrderStatus::PickedUp));
            assert!(!plan.settles_mover);
        }
    }

    #[test]
    fn storage_completion_lands_in_storage_and_settles() {
        let plan =
            plan_transition(JobStatus::PickedUp, JobStatus::Completed, JobType::Storage).unwrap();
        assert_eq!(
            plan,
            TransitionPlan {
                job_status: JobStatus::Completed,
                order_status: Some(OrderStatus::InStorage),
                settles_mover: true,
            }
        );
    }

    #[test]
    fn return_completion_lands_returned_and_settles() {
        let plan = plan_transition(
            JobStatus::AwaitingStudentConfirmation,
            JobStatus::Completed,
            JobType::Return,
        )
        .unwrap();
        assert_eq!(plan.order_status, Some(OrderStatus::Returned));
        assert!(plan.settles_mover);
    }

    #[test]
    fn confirmation_request_leaves_order_untouched() {
        for job_type in [JobType::Storage, JobType::Return] {
            let plan = plan_transition(
                JobStatus::PickedUp,
                JobStatus::AwaitingStudentConfirmation,
                job_type,
            )
            .unwrap();
            assert_eq!(plan.order_status, None);
            assert!(!plan.settles_mover);
        }
    }
}
