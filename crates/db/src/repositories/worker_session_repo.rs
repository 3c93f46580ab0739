//! Repository for `worker_sessions` and their per-batch skip lists.

use std::collections::HashSet;

use hitlist_core::types::DbId;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::worker_session::WorkerSession;

const COLUMNS: &str = "id, token, user_id, auto_accept, last_seen_at, created_at, updated_at";

pub struct WorkerSessionRepo;

impl WorkerSessionRepo {
    /// Start a new session with a random token.
    pub async fn create(pool: &PgPool, user_id: Option<DbId>) -> Result<WorkerSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO worker_sessions (token, user_id) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkerSession>(&query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_token(
        pool: &PgPool,
        token: Uuid,
    ) -> Result<Option<WorkerSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM worker_sessions WHERE token = $1");
        sqlx::query_as::<_, WorkerSession>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Record activity on the session.
    pub async fn touch(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE worker_sessions SET last_seen_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Attach an anonymous session to a user who has since logged in.
    ///
    /// A session already bound to a user is left untouched; returns the
    /// session as stored.
    pub async fn bind_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<WorkerSession, sqlx::Error> {
        let query = format!(
            "UPDATE worker_sessions SET user_id = COALESCE(user_id, $2)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkerSession>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn set_auto_accept(
        pool: &PgPool,
        id: DbId,
        auto_accept: bool,
    ) -> Result<WorkerSession, sqlx::Error> {
        let query = format!(
            "UPDATE worker_sessions SET auto_accept = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkerSession>(&query)
            .bind(id)
            .bind(auto_accept)
            .fetch_one(pool)
            .await
    }

    /// Add a task to the session's skip list for its batch.
    pub async fn add_skip(
        pool: &PgPool,
        session_id: DbId,
        batch_id: DbId,
        task_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO session_skipped_tasks (session_id, batch_id, task_id)
             VALUES ($1, $2, $3)
             ON CONFLICT DO NOTHING",
        )
        .bind(session_id)
        .bind(batch_id)
        .bind(task_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Tasks of `batch_id` the session has skipped.
    pub async fn skipped_for_batch<'e>(
        executor: impl PgExecutor<'e>,
        session_id: DbId,
        batch_id: DbId,
    ) -> Result<HashSet<DbId>, sqlx::Error> {
        let ids: Vec<DbId> = sqlx::query_scalar(
            "SELECT task_id FROM session_skipped_tasks WHERE session_id = $1 AND batch_id = $2",
        )
        .bind(session_id)
        .bind(batch_id)
        .fetch_all(executor)
        .await?;
        Ok(ids.into_iter().collect())
    }

    /// Forget every skip the session made in `batch_id`.
    pub async fn clear_skips_for_batch<'e>(
        executor: impl PgExecutor<'e>,
        session_id: DbId,
        batch_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM session_skipped_tasks WHERE session_id = $1 AND batch_id = $2",
        )
        .bind(session_id)
        .bind(batch_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
