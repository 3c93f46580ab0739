//! Task assignment lifecycle rules.
//!
//! An assignment is created open, then either completed (answers recorded)
//! or returned by its owner, which deletes it and frees the task slot. Open
//! assignments past their allotted time are expired in bulk.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Default hours a worker has to finish an assignment.
pub const DEFAULT_ALLOTTED_HOURS: i32 = 24;

/// Upper bound on the allotted time (one year).
pub const MAX_ALLOTTED_HOURS: i32 = 24 * 365;

/// Default number of assignments per task.
pub const DEFAULT_ASSIGNMENTS_PER_TASK: i32 = 1;

/// Upper bound on assignments per task.
pub const MAX_ASSIGNMENTS_PER_TASK: i32 = 1_000;

pub fn validate_assignments_per_task(n: i32) -> Result<(), CoreError> {
    if !(1..=MAX_ASSIGNMENTS_PER_TASK).contains(&n) {
        return Err(CoreError::Validation(format!(
            "Assignments per task must be between 1 and {MAX_ASSIGNMENTS_PER_TASK} (got {n})"
        )));
    }
    Ok(())
}

pub fn validate_allotted_hours(hours: i32) -> Result<(), CoreError> {
    if !(1..=MAX_ALLOTTED_HOURS).contains(&hours) {
        return Err(CoreError::Validation(format!(
            "Allotted assignment time must be between 1 and {MAX_ALLOTTED_HOURS} hours (got {hours})"
        )));
    }
    Ok(())
}

/// When an assignment created at `created_at` is considered abandoned.
pub fn expires_at(created_at: Timestamp, allotted_hours: i32) -> Timestamp {
    created_at + Duration::hours(i64::from(allotted_hours))
}

/// A task is complete once it has as many completed assignments as the
/// batch asks for.
pub fn task_is_complete(completed_assignments: i64, assignments_per_task: i32) -> bool {
    completed_assignments >= i64::from(assignments_per_task)
}

/// Identity of whoever claimed an assignment.
///
/// Authenticated workers own assignments by user id. Anonymous workers own
/// them through their worker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claimant {
    User(DbId),
    Session(DbId),
}

impl Claimant {
    /// Whether an assignment stored with `assigned_to`/`session_id` belongs
    /// to this claimant.
    pub fn owns(&self, assigned_to: Option<DbId>, session_id: DbId) -> bool {
        match (self, assigned_to) {
            (Claimant::User(user), Some(owner)) => *user == owner,
            (Claimant::Session(session), None) => *session == session_id,
            _ => false,
        }
    }
}

/// Check that an assignment may be returned (deleted) by the requester.
pub fn ensure_returnable(
    assignment_id: DbId,
    completed: bool,
    owned: bool,
) -> Result<(), CoreError> {
    if !owned {
        return Err(CoreError::Forbidden(format!(
            "The Task Assignment with ID {assignment_id} belongs to another worker"
        )));
    }
    if completed {
        return Err(CoreError::Conflict(
            "The Task can't be returned because it has been completed".to_string(),
        ));
    }
    Ok(())
}

/// Check that answers may be submitted for an assignment.
pub fn ensure_submittable(
    assignment_id: DbId,
    completed: bool,
    owned: bool,
) -> Result<(), CoreError> {
    if !owned {
        return Err(CoreError::Forbidden(format!(
            "You do not have permission to work on the Task Assignment with ID {assignment_id}"
        )));
    }
    if completed {
        return Err(CoreError::Conflict(format!(
            "The Task Assignment with ID {assignment_id} has already been submitted"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    #[test]
    fn expiry_adds_allotted_hours() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap();
        assert_eq!(
            expires_at(t, 3),
            Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap()
        );
    }

    #[test]
    fn completion_needs_all_assignments() {
        assert!(!task_is_complete(1, 3));
        assert!(task_is_complete(3, 3));
        assert!(task_is_complete(1, 1));
    }

    #[test]
    fn user_claimant_ignores_session() {
        assert!(Claimant::User(4).owns(Some(4), 77));
        assert!(!Claimant::User(4).owns(Some(5), 77));
        assert!(!Claimant::User(4).owns(None, 77));
    }

    #[test]
    fn anonymous_claimant_matches_session() {
        assert!(Claimant::Session(12).owns(None, 12));
        assert!(!Claimant::Session(12).owns(None, 13));
        assert!(!Claimant::Session(12).owns(Some(1), 12));
    }

    #[test]
    fn completed_assignment_cannot_be_returned() {
        assert_matches!(ensure_returnable(1, true, true), Err(CoreError::Conflict(_)));
        assert_matches!(ensure_returnable(1, false, false), Err(CoreError::Forbidden(_)));
        assert!(ensure_returnable(1, false, true).is_ok());
    }

    #[test]
    fn submitted_assignment_cannot_be_resubmitted() {
        assert_matches!(ensure_submittable(2, true, true), Err(CoreError::Conflict(_)));
        assert!(ensure_submittable(2, false, true).is_ok());
    }

    #[test]
    fn batch_settings_bounds() {
        assert!(validate_assignments_per_task(0).is_err());
        assert!(validate_assignments_per_task(3).is_ok());
        assert!(validate_allotted_hours(0).is_err());
        assert!(validate_allotted_hours(DEFAULT_ALLOTTED_HOURS).is_ok());
    }
}
