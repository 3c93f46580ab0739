//! Project entity model and DTOs.

use hitlist_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub html_template: String,
    pub template_filename: Option<String>,
    /// `${field}` names extracted from `html_template`.
    pub field_names: Vec<String>,
    pub assignments_per_task: i32,
    pub active: bool,
    pub login_required: bool,
    pub custom_permissions: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub html_template: String,
    pub template_filename: Option<String>,
    /// Defaults to 1.
    pub assignments_per_task: Option<i32>,
    /// Defaults to `true`.
    pub active: Option<bool>,
    /// Defaults to `true`.
    pub login_required: Option<bool>,
    /// Defaults to `false`.
    pub custom_permissions: Option<bool>,
}

/// DTO for updating an existing project. All fields are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub html_template: Option<String>,
    pub template_filename: Option<String>,
    pub assignments_per_task: Option<i32>,
    pub active: Option<bool>,
    pub login_required: Option<bool>,
    pub custom_permissions: Option<bool>,
}
