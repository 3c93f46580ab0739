//! Shared response envelope types for API handlers.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "data": T, "message": "..." }` for operations whose outcome needs a
/// user-visible explanation (e.g. no task left to claim).
#[derive(Debug, Serialize)]
pub struct MessageResponse<T: Serialize> {
    pub data: T,
    pub message: String,
}
