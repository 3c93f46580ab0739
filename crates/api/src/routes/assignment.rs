//! Route definitions for the `/assignments` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::assignment;
use crate::state::AppState;

/// Routes mounted at `/assignments`. All require `X-Session-Id`.
///
/// ```text
/// GET  /{task_id}/{assignment_id}                        -> get_by_id
/// POST /{task_id}/{assignment_id}                        -> submit (form)
/// GET  /{task_id}/{assignment_id}/iframe                 -> iframe
/// POST /{task_id}/{assignment_id}/return                 -> return_assignment
/// POST /{task_id}/{assignment_id}/skip-and-accept-next   -> skip_and_accept_next
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{task_id}/{assignment_id}",
            get(assignment::get_by_id).post(assignment::submit),
        )
        .route("/{task_id}/{assignment_id}/iframe", get(assignment::iframe))
        .route(
            "/{task_id}/{assignment_id}/return",
            post(assignment::return_assignment),
        )
        .route(
            "/{task_id}/{assignment_id}/skip-and-accept-next",
            post(assignment::skip_and_accept_next),
        )
}
