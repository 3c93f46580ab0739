//! Handlers for the `/projects` resource.
//!
//! Saving a project re-extracts the `${field}` names from its template.
//! Whether those names match a CSV is only checked when a batch is uploaded.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hitlist_core::assignment::validate_assignments_per_task;
use hitlist_core::error::CoreError;
use hitlist_core::template::{extract_field_names, validate_template};
use hitlist_core::types::DbId;
use hitlist_core::validation::validate_name;
use hitlist_db::models::batch::BatchWithStats;
use hitlist_db::models::project::{CreateProject, Project, UpdateProject};
use hitlist_db::repositories::{BatchRepo, ProjectRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectWorkerGroups {
    pub group_ids: Vec<DbId>,
}

fn project_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Project",
        id,
    })
}

async fn ensure_exists(state: &AppState, id: DbId) -> AppResult<Project> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| project_not_found(id))
}

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<DataResponse<Project>>)> {
    validate_name("Project", &input.name)?;
    validate_template(&input.html_template)?;
    if let Some(n) = input.assignments_per_task {
        validate_assignments_per_task(n)?;
    }

    let field_names = extract_field_names(&input.html_template);
    let project =
        ProjectRepo::create(&state.pool, &input, &field_names, Some(user.user_id)).await?;

    tracing::info!(
        project_id = project.id,
        fields = project.field_names.len(),
        "Project created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects
pub async fn list(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = ProjectRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = ensure_exists(&state, id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// PUT /api/v1/projects/{id}
///
/// Batches keep their own `assignments_per_task`; changing the project's
/// value only affects batches uploaded afterwards.
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<DataResponse<Project>>> {
    if let Some(name) = &input.name {
        validate_name("Project", name)?;
    }
    if let Some(html) = &input.html_template {
        validate_template(html)?;
    }
    if let Some(n) = input.assignments_per_task {
        validate_assignments_per_task(n)?;
    }

    let field_names = input.html_template.as_deref().map(extract_field_names);
    let project = ProjectRepo::update(&state.pool, id, &input, field_names.as_deref())
        .await?
        .ok_or_else(|| project_not_found(id))?;
    Ok(Json(DataResponse { data: project }))
}

/// DELETE /api/v1/projects/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ProjectRepo::delete(&state.pool, id).await? {
        return Err(project_not_found(id));
    }
    tracing::info!(project_id = id, deleted_by = user.user_id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/projects/{id}/worker-groups
pub async fn get_worker_groups(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectWorkerGroups>>> {
    ensure_exists(&state, id).await?;
    let group_ids = ProjectRepo::group_ids(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ProjectWorkerGroups { group_ids },
    }))
}

/// PUT /api/v1/projects/{id}/worker-groups
///
/// Only consulted while the project has `custom_permissions` set.
pub async fn set_worker_groups(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<ProjectWorkerGroups>,
) -> AppResult<Json<DataResponse<ProjectWorkerGroups>>> {
    ensure_exists(&state, id).await?;
    ProjectRepo::set_groups(&state.pool, id, &input.group_ids).await?;
    let group_ids = ProjectRepo::group_ids(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ProjectWorkerGroups { group_ids },
    }))
}

/// GET /api/v1/projects/{id}/batches
pub async fn list_batches(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<BatchWithStats>>>> {
    ensure_exists(&state, id).await?;
    let batches = BatchRepo::list_for_project(&state.pool, id).await?;
    Ok(Json(DataResponse { data: batches }))
}
