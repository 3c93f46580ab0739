//! Repository for the `tasks` table.

use std::collections::HashMap;

use hitlist_core::csv_batch::{ExportAssignment, ExportTask};
use hitlist_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::task::Task;

const COLUMNS: &str = "id, batch_id, input_fields, completed, answers, created_at, updated_at";

pub struct TaskRepo;

impl TaskRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Tasks of a batch with their completed assignments, for the results CSV.
    pub async fn export_for_batch(
        pool: &PgPool,
        batch_id: DbId,
    ) -> Result<Vec<ExportTask>, sqlx::Error> {
        let tasks: Vec<(DbId, Json<HashMap<String, String>>)> =
            sqlx::query_as("SELECT id, input_fields FROM tasks WHERE batch_id = $1 ORDER BY id")
                .bind(batch_id)
                .fetch_all(pool)
                .await?;

        let rows: Vec<ExportRow> = sqlx::query_as(
            "SELECT a.task_id, a.id, u.username, a.created_at, a.completed_at, a.answers
             FROM task_assignments a
             JOIN tasks t ON t.id = a.task_id
             LEFT JOIN users u ON u.id = a.assigned_to
             WHERE t.batch_id = $1 AND a.completed
             ORDER BY a.task_id, a.id",
        )
        .bind(batch_id)
        .fetch_all(pool)
        .await?;

        let mut by_task: HashMap<DbId, Vec<ExportAssignment>> = HashMap::new();
        for (task_id, assignment_id, worker, accepted_at, submitted_at, answers) in rows {
            by_task.entry(task_id).or_default().push(ExportAssignment {
                assignment_id,
                worker,
                accepted_at,
                submitted_at,
                answers: answers.map(|a| a.0).unwrap_or_default(),
            });
        }

        Ok(tasks
            .into_iter()
            .map(|(task_id, input)| ExportTask {
                task_id,
                input: input.0,
                assignments: by_task.remove(&task_id).unwrap_or_default(),
            })
            .collect())
    }
}

type ExportRow = (
    DbId,
    DbId,
    Option<String>,
    Timestamp,
    Option<Timestamp>,
    Option<Json<HashMap<String, String>>>,
);
