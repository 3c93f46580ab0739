//! Route definitions for the `/tasks` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::work;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET /{id}/preview         -> preview_task
/// GET /{id}/preview/iframe  -> preview_task_iframe
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/preview", get(work::preview_task))
        .route("/{id}/preview/iframe", get(work::preview_task_iframe))
}
