//! Repository for `worker_groups` and `worker_group_members`.

use hitlist_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::User;
use crate::models::worker_group::{CreateWorkerGroup, UpdateWorkerGroup, WorkerGroup};

const SELECT_GROUP: &str = "SELECT g.id, g.name,
        (SELECT COUNT(*) FROM worker_group_members m WHERE m.group_id = g.id) AS total_members,
        g.created_at, g.updated_at
     FROM worker_groups g";

pub struct WorkerGroupRepo;

impl WorkerGroupRepo {
    /// Create a group with its initial members in one transaction.
    pub async fn create(
        pool: &PgPool,
        input: &CreateWorkerGroup,
    ) -> Result<WorkerGroup, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let id: DbId = sqlx::query_scalar("INSERT INTO worker_groups (name) VALUES ($1) RETURNING id")
            .bind(&input.name)
            .fetch_one(&mut *tx)
            .await?;
        insert_members(&mut tx, id, &input.user_ids).await?;
        let query = format!("{SELECT_GROUP} WHERE g.id = $1");
        let group = sqlx::query_as::<_, WorkerGroup>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(group)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<WorkerGroup>, sqlx::Error> {
        let query = format!("{SELECT_GROUP} WHERE g.id = $1");
        sqlx::query_as::<_, WorkerGroup>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<WorkerGroup>, sqlx::Error> {
        let query = format!("{SELECT_GROUP} ORDER BY g.name");
        sqlx::query_as::<_, WorkerGroup>(&query).fetch_all(pool).await
    }

    /// Rename a group. Returns `None` if it does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateWorkerGroup,
    ) -> Result<Option<WorkerGroup>, sqlx::Error> {
        let updated = sqlx::query("UPDATE worker_groups SET name = COALESCE($2, name) WHERE id = $1")
            .bind(id)
            .bind(&input.name)
            .execute(pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM worker_groups WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Members of a group, alphabetically.
    pub async fn members(pool: &PgPool, group_id: DbId) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.email, u.password_hash, u.role, u.is_active,
                    u.last_login_at, u.created_at, u.updated_at
             FROM users u
             JOIN worker_group_members m ON m.user_id = u.id
             WHERE m.group_id = $1
             ORDER BY u.username",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the member list of a group.
    pub async fn set_members(
        pool: &PgPool,
        group_id: DbId,
        user_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM worker_group_members WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        insert_members(&mut tx, group_id, user_ids).await?;
        tx.commit().await
    }

    /// Ids of every group the user belongs to.
    pub async fn group_ids_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT group_id FROM worker_group_members WHERE user_id = $1 ORDER BY group_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

async fn insert_members(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    group_id: DbId,
    user_ids: &[DbId],
) -> Result<(), sqlx::Error> {
    if user_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO worker_group_members (group_id, user_id)
         SELECT $1, UNNEST($2::BIGINT[])
         ON CONFLICT DO NOTHING",
    )
    .bind(group_id)
    .bind(user_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
