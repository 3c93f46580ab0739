//! Handlers for the `/batches` resource (staff side).
//!
//! A batch is created from a multipart CSV upload. Upload problems are
//! collected and reported together; nothing is stored unless all pass.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use hitlist_core::assignment::{
    validate_allotted_hours, validate_assignments_per_task, DEFAULT_ALLOTTED_HOURS,
};
use hitlist_core::csv_batch::{parse_batch_csv, results_filename, write_results_csv};
use hitlist_core::error::CoreError;
use hitlist_core::types::DbId;
use hitlist_core::validation::validate_name;
use hitlist_db::models::batch::{Batch, BatchWithStats, CreateBatch, UpdateBatch};
use hitlist_db::repositories::{BatchRepo, ProjectRepo, TaskRepo};
use serde::Deserialize;

use super::context::BatchContext;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

const REQUIRED: &str = "This field is required.";
const UNKNOWN_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

fn batch_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Batch", id })
}

/// Fold a validation result into the list of upload errors.
fn collect<T>(errors: &mut Vec<String>, result: Result<T, CoreError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(CoreError::InvalidInput(messages)) => {
            errors.extend(messages);
            None
        }
        Err(CoreError::Validation(message)) => {
            errors.push(message);
            None
        }
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    }
}

fn parse_int(field: &str, value: &str) -> Result<i32, CoreError> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| CoreError::Validation(format!("{field}: Enter a whole number.")))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}

/// Raw multipart fields of a batch upload.
#[derive(Debug, Default)]
struct BatchUpload {
    project_id: Option<String>,
    name: Option<String>,
    csv_file: Option<(String, Vec<u8>)>,
    assignments_per_task: Option<String>,
    allotted_assignment_time: Option<String>,
    active: Option<String>,
}

impl BatchUpload {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut upload = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "csv_file" {
                let filename = field.file_name().unwrap_or("batch.csv").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload.csv_file = Some((filename, data.to_vec()));
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            match name.as_str() {
                "project_id" => upload.project_id = Some(value),
                "name" => upload.name = Some(value),
                "assignments_per_task" => upload.assignments_per_task = Some(value),
                "allotted_assignment_time" => upload.allotted_assignment_time = Some(value),
                "active" => upload.active = Some(value),
                other => tracing::debug!(field = other, "Ignoring unknown upload field"),
            }
        }
        Ok(upload)
    }
}

/// POST /api/v1/batches
///
/// Multipart fields: `project_id`, `name`, `csv_file`, and optionally
/// `assignments_per_task` (defaults to the project's),
/// `allotted_assignment_time` in hours (defaults to 24) and `active`
/// (defaults to false, leaving the batch unpublished).
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Batch>>)> {
    let upload = BatchUpload::read(multipart).await?;
    let mut errors: Vec<String> = Vec::new();

    let project_id = match upload.project_id.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(format!("project_id: {REQUIRED}"));
            None
        }
        Some(raw) => match raw.parse::<DbId>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push("project_id: Enter a whole number.".to_string());
                None
            }
        },
    };
    let project = match project_id {
        Some(id) => {
            let project = ProjectRepo::find_by_id(&state.pool, id).await?;
            if project.is_none() {
                errors.push(format!("project_id: {UNKNOWN_CHOICE}"));
            }
            project
        }
        None => None,
    };

    let name = match upload.name {
        Some(name) => collect(&mut errors, validate_name("Batch", &name).map(|_| name)),
        None => {
            errors.push(format!("name: {REQUIRED}"));
            None
        }
    };

    let allotted_hours = match upload.allotted_assignment_time.as_deref().map(str::trim) {
        None => Some(DEFAULT_ALLOTTED_HOURS),
        Some("") => {
            errors.push(format!("allotted_assignment_time: {REQUIRED}"));
            None
        }
        Some(raw) => collect(
            &mut errors,
            parse_int("allotted_assignment_time", raw)
                .and_then(|h| validate_allotted_hours(h).map(|_| h)),
        ),
    };

    let assignments_per_task = match upload.assignments_per_task.as_deref().map(str::trim) {
        None | Some("") => project.as_ref().map(|p| p.assignments_per_task),
        Some(raw) => collect(
            &mut errors,
            parse_int("assignments_per_task", raw)
                .and_then(|n| validate_assignments_per_task(n).map(|_| n)),
        ),
    };

    let parsed = match (&upload.csv_file, &project) {
        (None, _) => {
            errors.push(format!("csv_file: {REQUIRED}"));
            None
        }
        (Some((_, bytes)), Some(project)) => {
            collect(&mut errors, parse_batch_csv(bytes, &project.field_names))
        }
        (Some(_), None) => None,
    };

    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "Batch upload rejected");
        return Err(AppError::Core(CoreError::InvalidInput(errors)));
    }
    let (
        Some(project),
        Some(name),
        Some(allotted_hours),
        Some(assignments_per_task),
        Some(parsed),
        Some((filename, _)),
    ) = (
        project,
        name,
        allotted_hours,
        assignments_per_task,
        parsed,
        upload.csv_file,
    )
    else {
        return Err(AppError::InternalError(
            "Batch upload passed validation with missing fields".into(),
        ));
    };

    let input = CreateBatch {
        project_id: project.id,
        name,
        filename,
        csv_fields: parsed.fields,
        assignments_per_task,
        allotted_assignment_hours: allotted_hours,
        active: upload.active.as_deref().is_some_and(parse_flag),
        created_by: Some(user.user_id),
    };
    let batch = BatchRepo::create_with_tasks(&state.pool, &input, &parsed.rows).await?;

    tracing::info!(
        batch_id = batch.id,
        project_id = project.id,
        tasks = parsed.rows.len(),
        active = batch.active,
        "Batch created from CSV",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: batch })))
}

/// GET /api/v1/batches/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BatchWithStats>>> {
    let batch = BatchRepo::find_with_stats(&state.pool, id)
        .await?
        .ok_or_else(|| batch_not_found(id))?;
    Ok(Json(DataResponse { data: batch }))
}

/// PUT /api/v1/batches/{id}
///
/// `assignments_per_task` is fixed at upload and cannot be changed here.
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateBatch>,
) -> AppResult<Json<DataResponse<Batch>>> {
    if let Some(name) = &input.name {
        validate_name("Batch", name)?;
    }
    if let Some(hours) = input.allotted_assignment_hours {
        validate_allotted_hours(hours)?;
    }
    let batch = BatchRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| batch_not_found(id))?;
    Ok(Json(DataResponse { data: batch }))
}

/// DELETE /api/v1/batches/{id}
///
/// Cancels the batch, deleting its tasks and assignments.
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !BatchRepo::delete(&state.pool, id).await? {
        return Err(batch_not_found(id));
    }
    tracing::info!(batch_id = id, deleted_by = user.user_id, "Batch cancelled");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/batches/{id}/review
///
/// Task ids in review order.
pub async fn review(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<DbId>>>> {
    if BatchRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(batch_not_found(id));
    }
    let task_ids = BatchRepo::task_ids(&state.pool, id).await?;
    Ok(Json(DataResponse { data: task_ids }))
}

/// POST /api/v1/batches/{id}/publish
pub async fn publish(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Batch>>> {
    let batch = BatchRepo::publish(&state.pool, id)
        .await?
        .ok_or_else(|| batch_not_found(id))?;
    tracing::info!(batch_id = id, "Batch published");
    Ok(Json(DataResponse { data: batch }))
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub include_worker_identity: Option<bool>,
}

/// GET /api/v1/batches/{id}/download-csv
///
/// Results file: one row per completed assignment, input columns in the
/// uploaded CSV's order, then the sorted answer columns.
pub async fn download_csv(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    Path(id): Path<DbId>,
    Query(params): Query<DownloadParams>,
) -> AppResult<impl IntoResponse> {
    let ctx = BatchContext::load(&state, id).await?;
    let tasks = TaskRepo::export_for_batch(&state.pool, id).await?;
    let include_worker_identity = params
        .include_worker_identity
        .unwrap_or(state.config.export_worker_identity);

    let csv = write_results_csv(&ctx.batch.csv_fields, &tasks, include_worker_identity)?;
    let filename = results_filename(&ctx.project.name, &ctx.batch.name);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    ))
}
