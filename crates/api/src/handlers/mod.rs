//! HTTP handlers, one module per resource.

pub mod admin;
pub mod assignment;
pub mod auth;
pub mod batch;
pub mod context;
pub mod groups;
pub mod maintenance;
pub mod project;
pub mod session;
pub mod work;

use hitlist_core::error::CoreError;
use hitlist_core::types::DbId;
use hitlist_db::models::assignment::Transition;

use crate::error::{AppError, AppResult};

/// Map a repository [`Transition`] to a handler result.
pub(crate) fn finish_transition<T>(
    transition: Transition<T>,
    entity: &'static str,
    id: DbId,
) -> AppResult<T> {
    match transition {
        Transition::Done(value) => Ok(value),
        Transition::NotFound => Err(AppError::Core(CoreError::NotFound { entity, id })),
        Transition::Rejected(e) => Err(AppError::Core(e)),
    }
}
