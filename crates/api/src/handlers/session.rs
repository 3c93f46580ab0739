//! Handlers for `/sessions` (worker sessions).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use hitlist_db::models::worker_session::WorkerSession;
use hitlist_db::repositories::WorkerSessionRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::actor::Actor;
use crate::middleware::auth::MaybeAuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AutoAcceptRequest {
    /// Omit to toggle the current setting.
    pub auto_accept: Option<bool>,
}

/// POST /api/v1/sessions
///
/// Starts a session, bound to the caller when a bearer token is sent.
pub async fn create(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
) -> AppResult<(StatusCode, Json<DataResponse<WorkerSession>>)> {
    let session = WorkerSessionRepo::create(&state.pool, user.map(|u| u.user_id)).await?;
    tracing::debug!(user_id = ?session.user_id, "Worker session started");
    Ok((StatusCode::CREATED, Json(DataResponse { data: session })))
}

/// GET /api/v1/sessions/current
pub async fn current(actor: Actor) -> AppResult<Json<DataResponse<WorkerSession>>> {
    Ok(Json(DataResponse {
        data: actor.session,
    }))
}

/// POST /api/v1/sessions/auto-accept
pub async fn auto_accept(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<AutoAcceptRequest>,
) -> AppResult<Json<DataResponse<WorkerSession>>> {
    let value = input.auto_accept.unwrap_or(!actor.session.auto_accept);
    let session = WorkerSessionRepo::set_auto_accept(&state.pool, actor.session.id, value).await?;
    Ok(Json(DataResponse { data: session }))
}
