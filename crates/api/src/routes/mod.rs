pub mod admin;
pub mod assignment;
pub mod auth;
pub mod batch;
pub mod health;
pub mod project;
pub mod session;
pub mod task;
pub mod work;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/me                                         current user (requires auth)
///
/// /admin/users                                     list, create (admin only)
/// /admin/users/{id}                                get, update, deactivate
/// /admin/users/{id}/reset-password                 reset password
/// /admin/groups                                    list, create (admin only)
/// /admin/groups/{id}                               get, update, delete
/// /admin/groups/{id}/members                       list, replace members
/// /admin/assignments/expire-abandoned              bulk expiry (staff)
///
/// /sessions                                        start worker session
/// /sessions/current                                session state
/// /sessions/auto-accept                            toggle auto-accept
///
/// /work                                            worker index
///
/// /projects                                        list, create (staff)
/// /projects/{id}                                   get, update, delete
/// /projects/{id}/worker-groups                     get, replace
/// /projects/{id}/batches                           batches with stats
///
/// /batches                                         multipart upload (staff)
/// /batches/{id}                                    get, update, cancel
/// /batches/{id}/review                             task ids
/// /batches/{id}/publish                            activate
/// /batches/{id}/download-csv                       results CSV
/// /batches/{id}/accept-next                        claim next task (worker)
/// /batches/{id}/preview-next                       peek next task (worker)
/// /batches/{id}/tasks/{task_id}/accept             claim previewed task
/// /batches/{id}/tasks/{task_id}/skip               skip, preview next
///
/// /tasks/{id}/preview                              rendered task (JSON)
/// /tasks/{id}/preview/iframe                       rendered task (HTML)
///
/// /assignments/{task_id}/{assignment_id}           get, submit
/// /assignments/{task_id}/{assignment_id}/iframe    rendered task (HTML)
/// /assignments/{task_id}/{assignment_id}/return    return
/// /assignments/{task_id}/{assignment_id}/skip-and-accept-next
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication routes.
        .nest("/auth", auth::router())
        // Admin routes (users, worker groups, maintenance).
        .nest("/admin", admin::router())
        // Worker sessions.
        .nest("/sessions", session::router())
        // Worker index.
        .nest("/work", work::router())
        // Project management.
        .nest("/projects", project::router())
        // Batch management plus the worker claim endpoints.
        .nest("/batches", batch::router())
        // Task previews.
        .nest("/tasks", task::router())
        // A worker's own assignments.
        .nest("/assignments", assignment::router())
}
