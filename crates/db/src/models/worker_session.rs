//! Worker session model.

use hitlist_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Per-browser worker state, addressed by the `X-Session-Id` token.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkerSession {
    /// Internal key; never leaves the server.
    #[serde(skip_serializing)]
    pub id: DbId,
    pub token: Uuid,
    pub user_id: Option<DbId>,
    pub auto_accept: bool,
    pub last_seen_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
