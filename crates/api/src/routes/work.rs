//! Route definitions for the `/work` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::work;
use crate::state::AppState;

/// Routes mounted at `/work`.
///
/// ```text
/// GET /  -> index
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(work::index))
}
