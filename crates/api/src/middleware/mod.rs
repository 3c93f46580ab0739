//! Request extractors for authentication, authorization and worker sessions.
//!
//! - [`auth::AuthUser`] -- the user from a JWT Bearer token (required).
//! - [`auth::MaybeAuthUser`] -- the same, but anonymous requests pass.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.
//! - [`rbac::RequireStaff`] -- requires `requester` or `admin`.
//! - [`actor::Actor`] -- the worker: optional user plus `X-Session-Id` session.

pub mod actor;
pub mod auth;
pub mod rbac;
