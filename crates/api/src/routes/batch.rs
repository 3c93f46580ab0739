//! Route definitions for the `/batches` resource.
//!
//! Staff manage batches here; workers claim and preview tasks through the
//! same prefix.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{batch, work};
use crate::state::AppState;

/// Routes mounted at `/batches`.
///
/// ```text
/// POST   /                                -> batch::create (multipart)
/// GET    /{id}                            -> batch::get_by_id
/// PUT    /{id}                            -> batch::update
/// DELETE /{id}                            -> batch::delete
/// GET    /{id}/review                     -> batch::review
/// POST   /{id}/publish                    -> batch::publish
/// GET    /{id}/download-csv               -> batch::download_csv
///
/// POST   /{id}/accept-next                -> work::accept_next
/// GET    /{id}/preview-next               -> work::preview_next
/// POST   /{id}/tasks/{task_id}/accept     -> work::accept_task
/// POST   /{id}/tasks/{task_id}/skip       -> work::skip_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(batch::create))
        .route(
            "/{id}",
            get(batch::get_by_id)
                .put(batch::update)
                .delete(batch::delete),
        )
        .route("/{id}/review", get(batch::review))
        .route("/{id}/publish", post(batch::publish))
        .route("/{id}/download-csv", get(batch::download_csv))
        .route("/{id}/accept-next", post(work::accept_next))
        .route("/{id}/preview-next", get(work::preview_next))
        .route("/{id}/tasks/{task_id}/accept", post(work::accept_task))
        .route("/{id}/tasks/{task_id}/skip", post(work::skip_task))
}
