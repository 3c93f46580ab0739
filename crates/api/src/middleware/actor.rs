//! The requesting worker: an optional authenticated user plus the worker
//! session named by the `X-Session-Id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use hitlist_core::assignment::Claimant;
use hitlist_core::error::CoreError;
use hitlist_core::types::DbId;
use hitlist_db::models::worker_session::WorkerSession;
use hitlist_db::repositories::{ClaimActor, WorkerSessionRepo};
use uuid::Uuid;

use super::auth::{AuthUser, MaybeAuthUser};
use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Clone)]
pub struct Actor {
    pub user: Option<AuthUser>,
    pub session: WorkerSession,
}

impl Actor {
    pub fn user_id(&self) -> Option<DbId> {
        self.user.as_ref().map(|u| u.user_id)
    }

    pub fn role(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.role.as_str())
    }

    pub fn is_staff(&self) -> bool {
        self.user.as_ref().is_some_and(AuthUser::is_staff)
    }

    pub fn claim_actor(&self) -> ClaimActor {
        ClaimActor {
            user_id: self.user_id(),
            session_id: self.session.id,
        }
    }

    pub fn claimant(&self) -> Claimant {
        self.claim_actor().claimant()
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(user) = MaybeAuthUser::from_request_parts(parts, state).await?;

        let token = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing X-Session-Id header. Start a session with POST /api/v1/sessions"
                        .into(),
                ))
            })?;
        let token = Uuid::parse_str(token.trim())
            .map_err(|_| AppError::BadRequest("X-Session-Id must be a UUID".into()))?;

        let session = WorkerSessionRepo::find_by_token(&state.pool, token)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Unknown or expired session".into()))
            })?;

        let session = match (&user, session.user_id) {
            (Some(u), Some(owner)) if u.user_id != owner => {
                return Err(AppError::Core(CoreError::Forbidden(
                    "This session belongs to another user".into(),
                )));
            }
            (None, Some(_)) => {
                return Err(AppError::Core(CoreError::Unauthorized(
                    "This session belongs to a signed-in user".into(),
                )));
            }
            (Some(u), None) => {
                tracing::debug!(session_id = session.id, user_id = u.user_id, "Binding session to user");
                WorkerSessionRepo::bind_user(&state.pool, session.id, u.user_id).await?
            }
            _ => {
                WorkerSessionRepo::touch(&state.pool, session.id).await?;
                session
            }
        };

        Ok(Actor { user, session })
    }
}
