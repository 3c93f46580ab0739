//! Handlers for an actor's own task assignments: view, submit, return.
//!
//! Assignments are addressed as `/assignments/{task_id}/{assignment_id}`.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::{Form, Json};
use hitlist_core::error::CoreError;
use hitlist_core::types::DbId;
use hitlist_db::models::assignment::TaskAssignment;
use hitlist_db::repositories::{AssignmentRepo, WorkerSessionRepo};
use serde::Serialize;

use super::context::{load_task, Access, RenderedTask};
use super::finish_transition;
use super::work::{claim_next_in, ClaimResponse, ClaimedAssignment};
use crate::error::{AppError, AppResult};
use crate::middleware::actor::Actor;
use crate::state::AppState;

/// Reported when claiming the next task fails after an earlier step of the
/// same request has already been stored.
pub const NEXT_CLAIM_FAILED: &str = "The next Task could not be claimed. Please try again.";

#[derive(Debug, Serialize)]
pub struct AssignmentView {
    pub assignment: TaskAssignment,
    pub task: RenderedTask,
    pub auto_accept: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub assignment: TaskAssignment,
    pub task_completed: bool,
    /// Set when auto-accept claimed another task of the same batch.
    pub next: Option<ClaimedAssignment>,
    pub message: Option<String>,
}

/// Load an assignment the actor owns, checking it belongs to `task_id`.
async fn owned_assignment(
    state: &AppState,
    actor: &Actor,
    task_id: DbId,
    assignment_id: DbId,
) -> AppResult<TaskAssignment> {
    let assignment = AssignmentRepo::find_by_id(&state.pool, assignment_id)
        .await?
        .filter(|a| a.task_id == task_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TaskAssignment",
            id: assignment_id,
        }))?;
    if !actor
        .claimant()
        .owns(assignment.assigned_to, assignment.session_id)
    {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "You do not have permission to work on the Task Assignment with ID {assignment_id}"
        ))));
    }
    Ok(assignment)
}

/// Claim the next task of `task_id`'s batch once the actor's earlier change
/// is committed.
///
/// Never fails: a refused or busy claim is logged and reported in the
/// message.
async fn claim_after_commit(state: &AppState, actor: &Actor, task_id: DbId) -> ClaimResponse {
    let claim: AppResult<ClaimResponse> = async {
        let (ctx, _) = load_task(state, task_id).await?;
        ctx.ensure(state, actor, Access::Work).await?;
        claim_next_in(state, actor, &ctx).await
    }
    .await;

    claim.unwrap_or_else(|e| {
        tracing::warn!(task_id, error = %e, "Follow-up claim failed");
        let message = match e {
            AppError::Core(CoreError::Forbidden(msg)) => msg,
            _ => NEXT_CLAIM_FAILED.to_string(),
        };
        ClaimResponse {
            assignment: None,
            message: Some(message),
        }
    })
}

/// GET /api/v1/assignments/{task_id}/{assignment_id}
pub async fn get_by_id(
    State(state): State<AppState>,
    actor: Actor,
    Path((task_id, assignment_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<AssignmentView>> {
    let assignment = owned_assignment(&state, &actor, task_id, assignment_id).await?;
    let (ctx, task) = load_task(&state, task_id).await?;
    Ok(Json(AssignmentView {
        assignment,
        task: ctx.render(&task),
        auto_accept: actor.session.auto_accept,
    }))
}

/// GET /api/v1/assignments/{task_id}/{assignment_id}/iframe
pub async fn iframe(
    State(state): State<AppState>,
    actor: Actor,
    Path((task_id, assignment_id)): Path<(DbId, DbId)>,
) -> AppResult<Html<String>> {
    owned_assignment(&state, &actor, task_id, assignment_id).await?;
    let (ctx, task) = load_task(&state, task_id).await?;
    Ok(Html(ctx.render(&task).html))
}

/// POST /api/v1/assignments/{task_id}/{assignment_id}
///
/// Accepts the task's HTML form as `application/x-www-form-urlencoded`.
/// With auto-accept on, the next task of the batch is claimed right away;
/// once the answers are stored the response is a success even if that
/// claim does not go through.
pub async fn submit(
    State(state): State<AppState>,
    actor: Actor,
    Path((task_id, assignment_id)): Path<(DbId, DbId)>,
    Form(answers): Form<HashMap<String, String>>,
) -> AppResult<Json<SubmitResponse>> {
    let transition = AssignmentRepo::submit(
        &state.pool,
        task_id,
        assignment_id,
        actor.claimant(),
        answers,
        state.config.claim_lock_timeout(),
    )
    .await?;
    let outcome = finish_transition(transition, "TaskAssignment", assignment_id)?;

    tracing::info!(
        task_id,
        assignment_id,
        task_completed = outcome.task_completed,
        "Assignment submitted",
    );

    let (next, message) = if actor.session.auto_accept {
        let claim = claim_after_commit(&state, &actor, task_id).await;
        (claim.assignment, claim.message)
    } else {
        (None, None)
    };

    Ok(Json(SubmitResponse {
        assignment: outcome.assignment,
        task_completed: outcome.task_completed,
        next,
        message,
    }))
}

/// POST /api/v1/assignments/{task_id}/{assignment_id}/return
///
/// Deletes the actor's open assignment, freeing the slot for other workers.
pub async fn return_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path((task_id, assignment_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let transition = AssignmentRepo::delete_open(
        &state.pool,
        task_id,
        assignment_id,
        actor.claimant(),
        state.config.claim_lock_timeout(),
    )
    .await?;
    finish_transition(transition, "TaskAssignment", assignment_id)?;
    tracing::info!(task_id, assignment_id, "Assignment returned");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/assignments/{task_id}/{assignment_id}/skip-and-accept-next
///
/// Returns the assignment, skips its task for this session and claims the
/// next task of the same batch. Only the return itself can fail the request.
pub async fn skip_and_accept_next(
    State(state): State<AppState>,
    actor: Actor,
    Path((task_id, assignment_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<ClaimResponse>> {
    let (ctx, _) = load_task(&state, task_id).await?;

    let transition = AssignmentRepo::delete_open(
        &state.pool,
        task_id,
        assignment_id,
        actor.claimant(),
        state.config.claim_lock_timeout(),
    )
    .await?;
    finish_transition(transition, "TaskAssignment", assignment_id)?;
    tracing::info!(task_id, assignment_id, "Assignment returned");

    if let Err(e) =
        WorkerSessionRepo::add_skip(&state.pool, actor.session.id, ctx.batch.id, task_id).await
    {
        tracing::warn!(task_id, error = %e, "Could not record skip");
    }
    Ok(Json(claim_after_commit(&state, &actor, task_id).await))
}
