//! Batch entity model and DTOs.
//!
//! A batch is one CSV upload against a project; each CSV row becomes a task.

use hitlist_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A batch row from the `batches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Batch {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub filename: String,
    pub csv_fields: Vec<String>,
    pub assignments_per_task: i32,
    pub allotted_assignment_hours: i32,
    pub active: bool,
    pub published_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A batch together with its progress counters.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BatchWithStats {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub batch: Batch,
    pub total_tasks: i64,
    /// Tasks that reached their required number of completed assignments.
    pub total_finished_tasks: i64,
    pub total_completed_assignments: i64,
}

/// Insert DTO. The task rows are passed separately to
/// [`BatchRepo::create_with_tasks`](crate::repositories::BatchRepo::create_with_tasks).
#[derive(Debug, Clone)]
pub struct CreateBatch {
    pub project_id: DbId,
    pub name: String,
    pub filename: String,
    pub csv_fields: Vec<String>,
    pub assignments_per_task: i32,
    pub allotted_assignment_hours: i32,
    pub active: bool,
    pub created_by: Option<DbId>,
}

/// DTO for updating a batch. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBatch {
    pub name: Option<String>,
    pub active: Option<bool>,
    pub allotted_assignment_hours: Option<i32>,
}

/// A batch the current worker can pick up, as listed on the work index.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvailableBatch {
    pub batch_id: DbId,
    pub batch_name: String,
    pub project_id: DbId,
    pub project_name: String,
    pub assignments_available: i64,
    pub published_at: Option<Timestamp>,
}
