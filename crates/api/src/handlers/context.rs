//! Loading a batch or task together with what is needed to decide whether
//! the current worker may see or work on it.

use std::collections::HashMap;

use hitlist_core::access::{can_preview, can_work_on, AccessRules, ActorAccess};
use hitlist_core::error::CoreError;
use hitlist_core::template::render;
use hitlist_core::types::DbId;
use hitlist_db::models::batch::Batch;
use hitlist_db::models::project::Project;
use hitlist_db::models::task::Task;
use hitlist_db::repositories::{BatchRepo, ProjectRepo, TaskRepo, WorkerGroupRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::actor::Actor;
use crate::state::AppState;

/// A batch with its owning project.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub batch: Batch,
    pub project: Project,
}

/// What a worker is allowed to do with a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Preview,
    Work,
}

impl BatchContext {
    pub async fn load(state: &AppState, batch_id: DbId) -> AppResult<Self> {
        let batch = BatchRepo::find_by_id(&state.pool, batch_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Batch",
                id: batch_id,
            }))?;
        let project = ProjectRepo::find_by_id(&state.pool, batch.project_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Project",
                id: batch.project_id,
            }))?;
        Ok(Self { batch, project })
    }

    /// Load the batch and check the actor's access to it.
    pub async fn load_for(
        state: &AppState,
        actor: &Actor,
        batch_id: DbId,
        access: Access,
    ) -> AppResult<Self> {
        let ctx = Self::load(state, batch_id).await?;
        ctx.ensure(state, actor, access).await?;
        Ok(ctx)
    }

    fn rules(&self) -> AccessRules {
        AccessRules {
            active: self.project.active && self.batch.active,
            login_required: self.project.login_required,
            custom_permissions: self.project.custom_permissions,
        }
    }

    pub async fn ensure(&self, state: &AppState, actor: &Actor, access: Access) -> AppResult<()> {
        let rules = self.rules();
        let (user_groups, project_groups) = match (rules.custom_permissions, actor.user_id()) {
            (true, Some(user_id)) => (
                WorkerGroupRepo::group_ids_for_user(&state.pool, user_id).await?,
                ProjectRepo::group_ids(&state.pool, self.project.id).await?,
            ),
            _ => (Vec::new(), Vec::new()),
        };
        let who = ActorAccess {
            user_id: actor.user_id(),
            role: actor.role(),
            group_ids: &user_groups,
        };

        let allowed = match access {
            Access::Preview => can_preview(&rules, &who, &project_groups),
            Access::Work => can_work_on(&rules, &who, &project_groups),
        };
        if allowed {
            return Ok(());
        }
        if !rules.active && !(access == Access::Preview && actor.is_staff()) {
            return Err(AppError::Core(CoreError::Forbidden(format!(
                "The Batch with ID {} is not active",
                self.batch.id
            ))));
        }
        Err(AppError::Core(CoreError::Forbidden(format!(
            "You do not have permission to work on the Batch with ID {}",
            self.batch.id
        ))))
    }

    /// Load a task and check that it belongs to this batch.
    pub async fn task(&self, state: &AppState, task_id: DbId) -> AppResult<Task> {
        let task = TaskRepo::find_by_id(&state.pool, task_id)
            .await?
            .filter(|t| t.batch_id == self.batch.id)
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Task",
                id: task_id,
            }))?;
        Ok(task)
    }

    pub fn render(&self, task: &Task) -> RenderedTask {
        RenderedTask {
            task_id: task.id,
            batch_id: self.batch.id,
            batch_name: self.batch.name.clone(),
            project_id: self.project.id,
            project_name: self.project.name.clone(),
            completed: task.completed,
            html: render(&self.project.html_template, &task.input_fields.0),
            input_fields: task.input_fields.0.clone(),
        }
    }
}

/// Load a task and its batch context in one go.
pub async fn load_task(state: &AppState, task_id: DbId) -> AppResult<(BatchContext, Task)> {
    let task = TaskRepo::find_by_id(&state.pool, task_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        }))?;
    let ctx = BatchContext::load(state, task.batch_id).await?;
    Ok((ctx, task))
}

/// A task with the project template filled in.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedTask {
    pub task_id: DbId,
    pub batch_id: DbId,
    pub batch_name: String,
    pub project_id: DbId,
    pub project_name: String,
    pub completed: bool,
    pub html: String,
    pub input_fields: HashMap<String, String>,
}
