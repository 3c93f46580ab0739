//! Route definitions for the `/projects` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::project;
use crate::state::AppState;

/// Routes mounted at `/projects`. Staff only.
///
/// ```text
/// GET    /                        -> list
/// POST   /                        -> create
/// GET    /{id}                    -> get_by_id
/// PUT    /{id}                    -> update
/// DELETE /{id}                    -> delete
/// GET    /{id}/worker-groups      -> get_worker_groups
/// PUT    /{id}/worker-groups      -> set_worker_groups
/// GET    /{id}/batches            -> list_batches
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::create))
        .route(
            "/{id}",
            get(project::get_by_id)
                .put(project::update)
                .delete(project::delete),
        )
        .route(
            "/{id}/worker-groups",
            get(project::get_worker_groups).put(project::set_worker_groups),
        )
        .route("/{id}/batches", get(project::list_batches))
}
