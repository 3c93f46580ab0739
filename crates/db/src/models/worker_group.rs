//! Worker group model and DTOs.
//!
//! Projects with custom permissions are restricted to members of their
//! worker groups.

use hitlist_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `worker_groups` table plus its member count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkerGroup {
    pub id: DbId,
    pub name: String,
    pub total_members: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkerGroup {
    pub name: String,
    /// Initial members.
    #[serde(default)]
    pub user_ids: Vec<DbId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWorkerGroup {
    pub name: Option<String>,
}
