//! Task assignment model and lifecycle outcomes.

use std::collections::HashMap;

use hitlist_core::error::CoreError;
use hitlist_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `task_assignments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskAssignment {
    pub id: DbId,
    pub task_id: DbId,
    pub assigned_to: Option<DbId>,
    #[serde(skip_serializing)]
    pub session_id: DbId,
    pub completed: bool,
    pub answers: Option<Json<HashMap<String, String>>>,
    pub expires_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An open assignment listed on the worker's index page.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OpenAssignmentSummary {
    pub assignment_id: DbId,
    pub task_id: DbId,
    pub batch_id: DbId,
    pub batch_name: String,
    pub project_id: DbId,
    pub project_name: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// Result of an attempt to claim a task.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    Claimed {
        assignment: TaskAssignment,
        /// The task came off the skip list, which has now been cleared.
        from_skipped: bool,
    },
    NoneAvailable,
}

/// Result of a successful answer submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub assignment: TaskAssignment,
    /// The submission finished the task.
    pub task_completed: bool,
}

/// Outcome of a lifecycle operation on an existing row.
///
/// Lets handlers tell "no such row" apart from "row exists but the
/// operation is not allowed" without a second query.
#[derive(Debug)]
pub enum Transition<T> {
    Done(T),
    NotFound,
    Rejected(CoreError),
}
