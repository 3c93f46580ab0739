//! Repository for the `batches` table.
//!
//! Batch creation inserts the batch row and one task per CSV row in a
//! single transaction, so a failed upload leaves nothing behind.

use std::collections::HashMap;

use hitlist_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::batch::{AvailableBatch, Batch, BatchWithStats, CreateBatch, UpdateBatch};

const COLUMNS: &str = "id, project_id, name, filename, csv_fields, assignments_per_task, \
                       allotted_assignment_hours, active, published_at, created_by, \
                       created_at, updated_at";

const SELECT_WITH_STATS: &str = "SELECT b.id, b.project_id, b.name, b.filename, b.csv_fields,
        b.assignments_per_task, b.allotted_assignment_hours, b.active, b.published_at,
        b.created_by, b.created_at, b.updated_at,
        (SELECT COUNT(*) FROM tasks t WHERE t.batch_id = b.id) AS total_tasks,
        (SELECT COUNT(*) FROM tasks t WHERE t.batch_id = b.id AND t.completed)
            AS total_finished_tasks,
        (SELECT COUNT(*) FROM task_assignments a JOIN tasks t ON t.id = a.task_id
            WHERE t.batch_id = b.id AND a.completed) AS total_completed_assignments
     FROM batches b";

/// Rows per multi-row task insert.
const TASK_INSERT_CHUNK: usize = 1_000;

pub struct BatchRepo;

impl BatchRepo {
    /// Create a batch and its tasks (one per entry of `rows`) atomically.
    pub async fn create_with_tasks(
        pool: &PgPool,
        input: &CreateBatch,
        rows: &[HashMap<String, String>],
    ) -> Result<Batch, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "INSERT INTO batches
                (project_id, name, filename, csv_fields, assignments_per_task,
                 allotted_assignment_hours, active, published_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $7 THEN NOW() END, $8)
             RETURNING {COLUMNS}"
        );
        let batch = sqlx::query_as::<_, Batch>(&query)
            .bind(input.project_id)
            .bind(&input.name)
            .bind(&input.filename)
            .bind(&input.csv_fields)
            .bind(input.assignments_per_task)
            .bind(input.allotted_assignment_hours)
            .bind(input.active)
            .bind(input.created_by)
            .fetch_one(&mut *tx)
            .await?;

        for chunk in rows.chunks(TASK_INSERT_CHUNK) {
            let inputs: Vec<Json<&HashMap<String, String>>> = chunk.iter().map(Json).collect();
            sqlx::query(
                "INSERT INTO tasks (batch_id, input_fields)
                 SELECT $1, fields FROM UNNEST($2::JSONB[]) WITH ORDINALITY AS r(fields, n)
                 ORDER BY n",
            )
            .bind(batch.id)
            .bind(inputs)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(batch_id = batch.id, tasks = rows.len(), "Batch created");
        Ok(batch)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Batch>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM batches WHERE id = $1");
        sqlx::query_as::<_, Batch>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a batch together with its progress counters.
    pub async fn find_with_stats(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BatchWithStats>, sqlx::Error> {
        let query = format!("{SELECT_WITH_STATS} WHERE b.id = $1");
        sqlx::query_as::<_, BatchWithStats>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Batches of a project with progress counters, newest first.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<BatchWithStats>, sqlx::Error> {
        let query = format!("{SELECT_WITH_STATS} WHERE b.project_id = $1 ORDER BY b.id DESC");
        sqlx::query_as::<_, BatchWithStats>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Update a batch. Only non-`None` fields are applied.
    ///
    /// Activating a batch for the first time stamps `published_at`.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateBatch,
    ) -> Result<Option<Batch>, sqlx::Error> {
        let query = format!(
            "UPDATE batches SET
                name = COALESCE($2, name),
                active = COALESCE($3, active),
                allotted_assignment_hours = COALESCE($4, allotted_assignment_hours),
                published_at = CASE WHEN COALESCE($3, active) THEN COALESCE(published_at, NOW())
                                    ELSE published_at END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Batch>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.active)
            .bind(input.allotted_assignment_hours)
            .fetch_optional(pool)
            .await
    }

    /// Make a batch available to workers.
    pub async fn publish(pool: &PgPool, id: DbId) -> Result<Option<Batch>, sqlx::Error> {
        Self::update(
            pool,
            id,
            &UpdateBatch {
                active: Some(true),
                ..UpdateBatch::default()
            },
        )
        .await
    }

    /// Delete a batch with its tasks and assignments.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Task ids of a batch in upload order.
    pub async fn task_ids(pool: &PgPool, batch_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM tasks WHERE batch_id = $1 ORDER BY id")
            .bind(batch_id)
            .fetch_all(pool)
            .await
    }

    /// Active batches the actor may work on that still have tasks for them.
    ///
    /// Access filtering matches `hitlist_core::access::can_work_on`: anonymous
    /// actors only see projects without login or group requirements; group
    /// restricted projects need a shared worker group unless `is_admin`.
    pub async fn available_for_actor(
        pool: &PgPool,
        user_id: Option<DbId>,
        session_id: DbId,
        is_admin: bool,
    ) -> Result<Vec<AvailableBatch>, sqlx::Error> {
        sqlx::query_as::<_, AvailableBatch>(
            "SELECT * FROM (
                SELECT b.id AS batch_id, b.name AS batch_name, p.id AS project_id,
                       p.name AS project_name, b.published_at,
                       (SELECT COUNT(*) FROM tasks t
                         WHERE t.batch_id = b.id AND t.completed = false
                           AND (SELECT COUNT(*) FROM task_assignments a WHERE a.task_id = t.id)
                               < b.assignments_per_task
                           AND NOT EXISTS (
                               SELECT 1 FROM task_assignments a
                                WHERE a.task_id = t.id
                                  AND CASE WHEN $1::BIGINT IS NULL
                                           THEN a.assigned_to IS NULL AND a.session_id = $2
                                           ELSE a.assigned_to = $1 END)
                       ) AS assignments_available
                  FROM batches b
                  JOIN projects p ON p.id = b.project_id
                 WHERE b.active AND p.active
                   AND CASE WHEN $1::BIGINT IS NULL
                            THEN NOT p.login_required AND NOT p.custom_permissions
                            ELSE NOT p.custom_permissions OR $3 OR EXISTS (
                                SELECT 1 FROM project_worker_groups pg
                                  JOIN worker_group_members m ON m.group_id = pg.group_id
                                 WHERE pg.project_id = p.id AND m.user_id = $1)
                       END
             ) s
             WHERE s.assignments_available > 0
             ORDER BY s.published_at, s.batch_id",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(is_admin)
        .fetch_all(pool)
        .await
    }
}
