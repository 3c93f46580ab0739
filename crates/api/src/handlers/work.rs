//! Worker-facing handlers: the work index, claiming and previewing tasks.
//!
//! Every handler takes an [`Actor`], so all of them need an `X-Session-Id`.
//! Running out of tasks is reported in the response body, not as an error.

use axum::extract::{Path, State};
use axum::response::Html;
use axum::Json;
use hitlist_core::error::CoreError;
use hitlist_core::roles::ROLE_ADMIN;
use hitlist_core::types::{DbId, Timestamp};
use hitlist_db::models::assignment::{ClaimOutcome, OpenAssignmentSummary, TaskAssignment};
use hitlist_db::models::batch::AvailableBatch;
use hitlist_db::repositories::{AssignmentRepo, BatchRepo, WorkerSessionRepo};
use serde::Serialize;

use super::context::{load_task, Access, BatchContext, RenderedTask};
use crate::error::{AppError, AppResult};
use crate::middleware::actor::Actor;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WorkIndex {
    pub open_assignments: Vec<OpenAssignmentSummary>,
    pub batches: Vec<AvailableBatch>,
}

/// A freshly created assignment, with what the client needs to open it.
#[derive(Debug, Serialize)]
pub struct ClaimedAssignment {
    pub assignment_id: DbId,
    pub task_id: DbId,
    pub batch_id: DbId,
    pub expires_at: Timestamp,
    pub from_skipped: bool,
}

impl ClaimedAssignment {
    fn new(assignment: &TaskAssignment, batch_id: DbId, from_skipped: bool) -> Self {
        Self {
            assignment_id: assignment.id,
            task_id: assignment.task_id,
            batch_id,
            expires_at: assignment.expires_at,
            from_skipped,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub assignment: Option<ClaimedAssignment>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub task: Option<RenderedTask>,
    pub message: Option<String>,
}

pub(crate) fn no_more_tasks(batch_name: &str) -> String {
    format!("No more Tasks available from Batch {batch_name}")
}

/// Claim the next task of an already access-checked batch.
pub(crate) async fn claim_next_in(
    state: &AppState,
    actor: &Actor,
    ctx: &BatchContext,
) -> AppResult<ClaimResponse> {
    let outcome = AssignmentRepo::claim_next(
        &state.pool,
        &ctx.batch,
        actor.claim_actor(),
        state.config.claim_lock_timeout(),
    )
    .await?;

    Ok(match outcome {
        ClaimOutcome::Claimed {
            assignment,
            from_skipped,
        } => ClaimResponse {
            assignment: Some(ClaimedAssignment::new(&assignment, ctx.batch.id, from_skipped)),
            message: None,
        },
        ClaimOutcome::NoneAvailable => ClaimResponse {
            assignment: None,
            message: Some(no_more_tasks(&ctx.batch.name)),
        },
    })
}

/// The task the actor would get next from `ctx`, rendered for preview.
async fn preview_next_in(
    state: &AppState,
    actor: &Actor,
    ctx: &BatchContext,
) -> AppResult<PreviewResponse> {
    let selection = AssignmentRepo::peek_next(&state.pool, ctx.batch.id, actor.claim_actor()).await?;
    let Some(selection) = selection else {
        return Ok(PreviewResponse {
            task: None,
            message: Some(no_more_tasks(&ctx.batch.name)),
        });
    };
    let task = ctx.task(state, selection.task_id).await?;
    Ok(PreviewResponse {
        task: Some(ctx.render(&task)),
        message: None,
    })
}

/// GET /api/v1/work
pub async fn index(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<DataResponse<WorkIndex>>> {
    let open_assignments =
        AssignmentRepo::list_open_for_actor(&state.pool, actor.claim_actor()).await?;
    let batches = BatchRepo::available_for_actor(
        &state.pool,
        actor.user_id(),
        actor.session.id,
        actor.role() == Some(ROLE_ADMIN),
    )
    .await?;
    Ok(Json(DataResponse {
        data: WorkIndex {
            open_assignments,
            batches,
        },
    }))
}

/// POST /api/v1/batches/{id}/accept-next
pub async fn accept_next(
    State(state): State<AppState>,
    actor: Actor,
    Path(batch_id): Path<DbId>,
) -> AppResult<Json<ClaimResponse>> {
    let ctx = BatchContext::load_for(&state, &actor, batch_id, Access::Work).await?;
    Ok(Json(claim_next_in(&state, &actor, &ctx).await?))
}

/// GET /api/v1/batches/{id}/preview-next
pub async fn preview_next(
    State(state): State<AppState>,
    actor: Actor,
    Path(batch_id): Path<DbId>,
) -> AppResult<Json<PreviewResponse>> {
    let ctx = BatchContext::load_for(&state, &actor, batch_id, Access::Work).await?;
    Ok(Json(preview_next_in(&state, &actor, &ctx).await?))
}

/// POST /api/v1/batches/{id}/tasks/{task_id}/accept
pub async fn accept_task(
    State(state): State<AppState>,
    actor: Actor,
    Path((batch_id, task_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<ClaimResponse>> {
    let ctx = BatchContext::load_for(&state, &actor, batch_id, Access::Work).await?;
    ctx.task(&state, task_id).await?;

    let claimed = AssignmentRepo::claim_task(
        &state.pool,
        &ctx.batch,
        task_id,
        actor.claim_actor(),
        state.config.claim_lock_timeout(),
    )
    .await?;

    Ok(Json(match claimed {
        Some(assignment) => ClaimResponse {
            assignment: Some(ClaimedAssignment::new(&assignment, batch_id, false)),
            message: None,
        },
        None => ClaimResponse {
            assignment: None,
            message: Some(format!("The Task with ID {task_id} is no longer available")),
        },
    }))
}

/// POST /api/v1/batches/{id}/tasks/{task_id}/skip
///
/// Adds the task to the session's skip list and previews the next one.
pub async fn skip_task(
    State(state): State<AppState>,
    actor: Actor,
    Path((batch_id, task_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<PreviewResponse>> {
    let ctx = BatchContext::load_for(&state, &actor, batch_id, Access::Work).await?;
    ctx.task(&state, task_id).await?;

    WorkerSessionRepo::add_skip(&state.pool, actor.session.id, batch_id, task_id).await?;
    tracing::debug!(session_id = actor.session.id, batch_id, task_id, "Task skipped");

    Ok(Json(preview_next_in(&state, &actor, &ctx).await?))
}

async fn previewable(state: &AppState, actor: &Actor, task_id: DbId) -> AppResult<RenderedTask> {
    let (ctx, task) = load_task(state, task_id).await?;
    ctx.ensure(state, actor, Access::Preview).await?;
    if task.completed && !actor.is_staff() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "The Task with ID {task_id} has already been completed"
        ))));
    }
    Ok(ctx.render(&task))
}

/// GET /api/v1/tasks/{id}/preview
pub async fn preview_task(
    State(state): State<AppState>,
    actor: Actor,
    Path(task_id): Path<DbId>,
) -> AppResult<Json<DataResponse<RenderedTask>>> {
    let task = previewable(&state, &actor, task_id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// GET /api/v1/tasks/{id}/preview/iframe
pub async fn preview_task_iframe(
    State(state): State<AppState>,
    actor: Actor,
    Path(task_id): Path<DbId>,
) -> AppResult<Html<String>> {
    let task = previewable(&state, &actor, task_id).await?;
    Ok(Html(task.html))
}
