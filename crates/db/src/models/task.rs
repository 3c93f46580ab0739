//! Task entity model.

use std::collections::HashMap;

use hitlist_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// One row of a batch's CSV, waiting for worker answers.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub batch_id: DbId,
    pub input_fields: Json<HashMap<String, String>>,
    pub completed: bool,
    pub answers: Option<Json<HashMap<String, String>>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
