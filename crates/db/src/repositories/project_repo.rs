//! Repository for the `projects` table and its worker-group permissions.

use hitlist_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project, UpdateProject};

const COLUMNS: &str = "id, name, html_template, template_filename, field_names, \
                       assignments_per_task, active, login_required, custom_permissions, \
                       created_by, created_at, updated_at";

pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project.
    ///
    /// `field_names` are the placeholders extracted from the template by the
    /// caller; unset flags take the column defaults.
    pub async fn create(
        pool: &PgPool,
        input: &CreateProject,
        field_names: &[String],
        created_by: Option<DbId>,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects
                (name, html_template, template_filename, field_names, assignments_per_task,
                 active, login_required, custom_permissions, created_by)
             VALUES ($1, $2, $3, $4, COALESCE($5, 1), COALESCE($6, true),
                     COALESCE($7, true), COALESCE($8, false), $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(&input.html_template)
            .bind(&input.template_filename)
            .bind(field_names)
            .bind(input.assignments_per_task)
            .bind(input.active)
            .bind(input.login_required)
            .bind(input.custom_permissions)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all projects, most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// Update a project. Only non-`None` fields are applied; `field_names`
    /// must be passed whenever the template changes.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
        field_names: Option<&[String]>,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($2, name),
                html_template = COALESCE($3, html_template),
                template_filename = COALESCE($4, template_filename),
                field_names = COALESCE($5, field_names),
                assignments_per_task = COALESCE($6, assignments_per_task),
                active = COALESCE($7, active),
                login_required = COALESCE($8, login_required),
                custom_permissions = COALESCE($9, custom_permissions)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.html_template)
            .bind(&input.template_filename)
            .bind(field_names)
            .bind(input.assignments_per_task)
            .bind(input.active)
            .bind(input.login_required)
            .bind(input.custom_permissions)
            .fetch_optional(pool)
            .await
    }

    /// Delete a project with all its batches, tasks and assignments.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Worker groups allowed on a project with custom permissions.
    pub async fn group_ids(pool: &PgPool, project_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT group_id FROM project_worker_groups WHERE project_id = $1 ORDER BY group_id",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the worker groups of a project.
    pub async fn set_groups(
        pool: &PgPool,
        project_id: DbId,
        group_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM project_worker_groups WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO project_worker_groups (project_id, group_id)
             SELECT $1, UNNEST($2::BIGINT[])
             ON CONFLICT DO NOTHING",
        )
        .bind(project_id)
        .bind(group_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }
}
