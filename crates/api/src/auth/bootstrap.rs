//! Create the first admin account when the database has no users.

use hitlist_core::roles::ROLE_ADMIN;
use hitlist_db::models::user::CreateUser;
use hitlist_db::repositories::UserRepo;
use sqlx::PgPool;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};

/// Create an admin from `BOOTSTRAP_ADMIN_USERNAME` / `BOOTSTRAP_ADMIN_PASSWORD`
/// if both are set and no user exists yet. Returns whether one was created.
pub async fn ensure_admin_from_env(pool: &PgPool) -> AppResult<bool> {
    let (Ok(username), Ok(password)) = (
        std::env::var("BOOTSTRAP_ADMIN_USERNAME"),
        std::env::var("BOOTSTRAP_ADMIN_PASSWORD"),
    ) else {
        return Ok(false);
    };
    ensure_admin(pool, &username, &password).await
}

pub async fn ensure_admin(pool: &PgPool, username: &str, password: &str) -> AppResult<bool> {
    if UserRepo::count(pool).await? > 0 {
        return Ok(false);
    }
    let password_hash = hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: String::new(),
            password_hash,
            role: ROLE_ADMIN.to_string(),
        },
    )
    .await?;
    tracing::info!(user_id = user.id, username, "Bootstrap admin created");
    Ok(true)
}
