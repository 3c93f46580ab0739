//! Staff maintenance operations.

use axum::extract::State;
use axum::Json;
use hitlist_db::repositories::AssignmentRepo;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExpireResult {
    pub expired: u64,
}

/// POST /api/v1/admin/assignments/expire-abandoned
///
/// Deletes every open assignment past its `expires_at`. The background
/// sweep does the same on a timer.
pub async fn expire_abandoned(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
) -> AppResult<Json<DataResponse<ExpireResult>>> {
    let expired = AssignmentRepo::expire_abandoned(&state.pool).await?;
    tracing::info!(expired, requested_by = user.user_id, "Expired abandoned assignments");
    Ok(Json(DataResponse {
        data: ExpireResult { expired },
    }))
}
