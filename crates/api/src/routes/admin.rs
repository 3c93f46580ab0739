//! Route definitions for the `/admin` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{admin, groups, maintenance};
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// User and group routes require the `admin` role; expiry is open to any
/// staff member. Both are enforced by handler extractors.
///
/// ```text
/// GET    /users                         -> list_users
/// POST   /users                         -> create_user
/// GET    /users/{id}                    -> get_user
/// PUT    /users/{id}                    -> update_user
/// DELETE /users/{id}                    -> deactivate_user
/// POST   /users/{id}/reset-password     -> reset_password
///
/// GET    /groups                        -> list
/// POST   /groups                        -> create
/// GET    /groups/{id}                   -> get_by_id
/// PUT    /groups/{id}                   -> update
/// DELETE /groups/{id}                   -> delete
/// GET    /groups/{id}/members           -> list_members
/// PUT    /groups/{id}/members           -> set_members
///
/// POST   /assignments/expire-abandoned  -> expire_abandoned
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::deactivate_user),
        )
        .route("/users/{id}/reset-password", post(admin::reset_password))
        .route("/groups", get(groups::list).post(groups::create))
        .route(
            "/groups/{id}",
            get(groups::get_by_id)
                .put(groups::update)
                .delete(groups::delete),
        )
        .route(
            "/groups/{id}/members",
            get(groups::list_members).put(groups::set_members),
        )
        .route(
            "/assignments/expire-abandoned",
            post(maintenance::expire_abandoned),
        )
}
