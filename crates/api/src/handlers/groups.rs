//! Handlers for `/admin/groups` (worker groups and their members).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hitlist_core::error::CoreError;
use hitlist_core::types::DbId;
use hitlist_core::validation::validate_name;
use hitlist_db::models::user::UserResponse;
use hitlist_db::models::worker_group::{CreateWorkerGroup, UpdateWorkerGroup, WorkerGroup};
use hitlist_db::repositories::WorkerGroupRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetMembersRequest {
    pub user_ids: Vec<DbId>,
}

fn group_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "WorkerGroup",
        id,
    })
}

/// GET /api/v1/admin/groups
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<WorkerGroup>>>> {
    let groups = WorkerGroupRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: groups }))
}

/// POST /api/v1/admin/groups
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateWorkerGroup>,
) -> AppResult<(StatusCode, Json<DataResponse<WorkerGroup>>)> {
    validate_name("Group", &input.name)?;
    let group = WorkerGroupRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: group })))
}

/// GET /api/v1/admin/groups/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<WorkerGroup>>> {
    let group = WorkerGroupRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| group_not_found(id))?;
    Ok(Json(DataResponse { data: group }))
}

/// PUT /api/v1/admin/groups/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateWorkerGroup>,
) -> AppResult<Json<DataResponse<WorkerGroup>>> {
    if let Some(name) = &input.name {
        validate_name("Group", name)?;
    }
    let group = WorkerGroupRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| group_not_found(id))?;
    Ok(Json(DataResponse { data: group }))
}

/// DELETE /api/v1/admin/groups/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if WorkerGroupRepo::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(group_not_found(id))
    }
}

/// GET /api/v1/admin/groups/{id}/members
pub async fn list_members(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    if WorkerGroupRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(group_not_found(id));
    }
    let members = WorkerGroupRepo::members(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: members.into_iter().map(UserResponse::from).collect(),
    }))
}

/// PUT /api/v1/admin/groups/{id}/members
pub async fn set_members(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<SetMembersRequest>,
) -> AppResult<Json<DataResponse<WorkerGroup>>> {
    if WorkerGroupRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(group_not_found(id));
    }
    WorkerGroupRepo::set_members(&state.pool, id, &input.user_ids).await?;
    let group = WorkerGroupRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| group_not_found(id))?;
    Ok(Json(DataResponse { data: group }))
}
