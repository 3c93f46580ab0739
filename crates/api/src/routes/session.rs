//! Route definitions for the `/sessions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::session;
use crate::state::AppState;

/// Routes mounted at `/sessions`.
///
/// ```text
/// POST /              -> create
/// GET  /current       -> current (X-Session-Id)
/// POST /auto-accept   -> auto_accept (X-Session-Id)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(session::create))
        .route("/current", get(session::current))
        .route("/auto-accept", post(session::auto_accept))
}
