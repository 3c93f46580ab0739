//! Repository for the `task_assignments` table: claiming, submitting,
//! returning and expiring assignments.
//!
//! Every state change runs in one short transaction that first locks the
//! affected `tasks` rows. Claims lock all currently-available tasks of the
//! batch in id order, so concurrent claims serialize on the same rows
//! without deadlocking and never hand out more than `assignments_per_task`
//! slots of a task.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use hitlist_core::allocation::{select_next, Selection};
use hitlist_core::answers::sanitize_answers;
use hitlist_core::assignment::{
    ensure_returnable, ensure_submittable, expires_at, task_is_complete, Claimant,
};
use hitlist_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::assignment::{
    ClaimOutcome, OpenAssignmentSummary, SubmitOutcome, TaskAssignment, Transition,
};
use crate::models::batch::Batch;
use crate::repositories::WorkerSessionRepo;

const COLUMNS: &str = "id, task_id, assigned_to, session_id, completed, answers, expires_at, \
                       completed_at, created_at, updated_at";

/// Tasks of batch `$1` that actor (`$2` user, `$3` session) may claim.
///
/// A task is available while it is not completed, has fewer assignments
/// (open or completed) than the batch allows, and the actor holds none of
/// them. Authenticated actors are matched by user, anonymous ones by session.
const AVAILABLE_FROM_WHERE: &str = "FROM tasks t
    JOIN batches b ON b.id = t.batch_id
    WHERE t.batch_id = $1
      AND t.completed = false
      AND (SELECT COUNT(*) FROM task_assignments a WHERE a.task_id = t.id) < b.assignments_per_task
      AND NOT EXISTS (
          SELECT 1 FROM task_assignments a
           WHERE a.task_id = t.id
             AND CASE WHEN $2::BIGINT IS NULL
                      THEN a.assigned_to IS NULL AND a.session_id = $3
                      ELSE a.assigned_to = $2 END)";

/// The worker a claim is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimActor {
    /// `None` for anonymous workers.
    pub user_id: Option<DbId>,
    /// Every claim is made through a worker session.
    pub session_id: DbId,
}

impl ClaimActor {
    pub fn claimant(&self) -> Claimant {
        match self.user_id {
            Some(user_id) => Claimant::User(user_id),
            None => Claimant::Session(self.session_id),
        }
    }
}

pub struct AssignmentRepo;

impl AssignmentRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TaskAssignment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM task_assignments WHERE id = $1");
        sqlx::query_as::<_, TaskAssignment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Pick the task the actor would be offered next, without claiming it.
    ///
    /// When only skipped tasks remain the skip list is cleared, exactly as a
    /// claim would.
    pub async fn peek_next(
        pool: &PgPool,
        batch_id: DbId,
        actor: ClaimActor,
    ) -> Result<Option<Selection>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let available = available_ids(&mut tx, batch_id, actor, false).await?;
        let skipped =
            WorkerSessionRepo::skipped_for_batch(&mut *tx, actor.session_id, batch_id).await?;
        let selection = select_next(&available, &skipped);
        if selection.is_some_and(|s| s.from_skipped) {
            WorkerSessionRepo::clear_skips_for_batch(&mut *tx, actor.session_id, batch_id).await?;
        }
        tx.commit().await?;
        Ok(selection)
    }

    /// Claim the next available task of `batch` for the actor.
    ///
    /// Prefers the lowest task id the actor has not skipped in this session.
    /// When only skipped tasks are left, the lowest of those is claimed and
    /// the skip list for the batch is cleared.
    pub async fn claim_next(
        pool: &PgPool,
        batch: &Batch,
        actor: ClaimActor,
        lock_timeout: Duration,
    ) -> Result<ClaimOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;
        set_lock_timeout(&mut tx, lock_timeout).await?;

        let available = lock_available(&mut tx, batch.id, actor).await?;
        let skipped =
            WorkerSessionRepo::skipped_for_batch(&mut *tx, actor.session_id, batch.id).await?;
        let Some(selection) = select_next(&available, &skipped) else {
            tx.rollback().await?;
            return Ok(ClaimOutcome::NoneAvailable);
        };
        if selection.from_skipped {
            WorkerSessionRepo::clear_skips_for_batch(&mut *tx, actor.session_id, batch.id).await?;
        }

        let assignment = insert_assignment(&mut tx, batch, selection.task_id, actor).await?;
        tx.commit().await?;

        tracing::info!(
            batch_id = batch.id,
            task_id = assignment.task_id,
            assignment_id = assignment.id,
            from_skipped = selection.from_skipped,
            "Task claimed",
        );
        Ok(ClaimOutcome::Claimed {
            assignment,
            from_skipped: selection.from_skipped,
        })
    }

    /// Claim one specific task, e.g. after previewing it.
    ///
    /// Returns `None` when the task is no longer available to the actor.
    pub async fn claim_task(
        pool: &PgPool,
        batch: &Batch,
        task_id: DbId,
        actor: ClaimActor,
        lock_timeout: Duration,
    ) -> Result<Option<TaskAssignment>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        set_lock_timeout(&mut tx, lock_timeout).await?;

        let available = lock_available(&mut tx, batch.id, actor).await?;
        if !available.contains(&task_id) {
            tx.rollback().await?;
            return Ok(None);
        }

        let assignment = insert_assignment(&mut tx, batch, task_id, actor).await?;
        tx.commit().await?;

        tracing::info!(
            batch_id = batch.id,
            task_id,
            assignment_id = assignment.id,
            "Task claimed",
        );
        Ok(Some(assignment))
    }

    /// Record answers for an open assignment owned by `claimant`.
    ///
    /// CSRF fields are stripped from `answers`. When this submission brings
    /// the task's completed assignments up to the batch's
    /// `assignments_per_task`, the task is marked completed and the answers
    /// are copied onto it.
    pub async fn submit(
        pool: &PgPool,
        task_id: DbId,
        assignment_id: DbId,
        claimant: Claimant,
        answers: HashMap<String, String>,
        lock_timeout: Duration,
    ) -> Result<Transition<SubmitOutcome>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        set_lock_timeout(&mut tx, lock_timeout).await?;

        let Some((task_completed, assignments_per_task)) = lock_task(&mut tx, task_id).await?
        else {
            return Ok(Transition::NotFound);
        };
        let Some(current) = lock_assignment(&mut tx, task_id, assignment_id).await? else {
            return Ok(Transition::NotFound);
        };
        let owned = claimant.owns(current.assigned_to, current.session_id);
        if let Err(e) = ensure_submittable(assignment_id, current.completed, owned) {
            return Ok(Transition::Rejected(e));
        }

        let answers = Json(sanitize_answers(answers));
        let query = format!(
            "UPDATE task_assignments SET completed = true, answers = $2, completed_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let assignment = sqlx::query_as::<_, TaskAssignment>(&query)
            .bind(assignment_id)
            .bind(&answers)
            .fetch_one(&mut *tx)
            .await?;

        let completed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM task_assignments WHERE task_id = $1 AND completed",
        )
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        let finishes_task =
            !task_completed && task_is_complete(completed, assignments_per_task);
        if finishes_task {
            sqlx::query("UPDATE tasks SET completed = true, answers = $2 WHERE id = $1")
                .bind(task_id)
                .bind(&answers)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(Transition::Done(SubmitOutcome {
            assignment,
            task_completed: finishes_task,
        }))
    }

    /// Return (delete) an open assignment owned by `claimant`, freeing its
    /// slot for the next claim.
    pub async fn delete_open(
        pool: &PgPool,
        task_id: DbId,
        assignment_id: DbId,
        claimant: Claimant,
        lock_timeout: Duration,
    ) -> Result<Transition<TaskAssignment>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        set_lock_timeout(&mut tx, lock_timeout).await?;

        if lock_task(&mut tx, task_id).await?.is_none() {
            return Ok(Transition::NotFound);
        }
        let Some(current) = lock_assignment(&mut tx, task_id, assignment_id).await? else {
            return Ok(Transition::NotFound);
        };
        let owned = claimant.owns(current.assigned_to, current.session_id);
        if let Err(e) = ensure_returnable(assignment_id, current.completed, owned) {
            return Ok(Transition::Rejected(e));
        }

        sqlx::query("DELETE FROM task_assignments WHERE id = $1")
            .bind(assignment_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Transition::Done(current))
    }

    /// Delete every open assignment past its `expires_at`.
    ///
    /// Returns the number of assignments removed.
    pub async fn expire_abandoned(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM task_assignments WHERE completed = false AND expires_at < NOW()",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// The actor's open assignments across all batches, oldest first.
    pub async fn list_open_for_actor(
        pool: &PgPool,
        actor: ClaimActor,
    ) -> Result<Vec<OpenAssignmentSummary>, sqlx::Error> {
        sqlx::query_as::<_, OpenAssignmentSummary>(
            "SELECT a.id AS assignment_id, a.task_id, b.id AS batch_id, b.name AS batch_name,
                    p.id AS project_id, p.name AS project_name, a.expires_at, a.created_at
             FROM task_assignments a
             JOIN tasks t ON t.id = a.task_id
             JOIN batches b ON b.id = t.batch_id
             JOIN projects p ON p.id = b.project_id
             WHERE a.completed = false
               AND CASE WHEN $1::BIGINT IS NULL
                        THEN a.assigned_to IS NULL AND a.session_id = $2
                        ELSE a.assigned_to = $1 END
             ORDER BY a.created_at, a.id",
        )
        .bind(actor.user_id)
        .bind(actor.session_id)
        .fetch_all(pool)
        .await
    }
}

async fn set_lock_timeout(
    tx: &mut Transaction<'_, Postgres>,
    lock_timeout: Duration,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", lock_timeout.as_millis()))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn available_ids(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: DbId,
    actor: ClaimActor,
    for_update: bool,
) -> Result<Vec<DbId>, sqlx::Error> {
    let lock = if for_update { "FOR UPDATE OF t" } else { "" };
    let query = format!("SELECT t.id {AVAILABLE_FROM_WHERE} ORDER BY t.id {lock}");
    sqlx::query_scalar(&query)
        .bind(batch_id)
        .bind(actor.user_id)
        .bind(actor.session_id)
        .fetch_all(&mut **tx)
        .await
}

/// Lock the available task rows, then re-read availability.
///
/// Blocking on a row lock does not refresh the locking statement's view of
/// other tables, so a competing claim committed while we waited is only
/// visible to a new statement. Only tasks that are both locked and still
/// available are returned.
async fn lock_available(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: DbId,
    actor: ClaimActor,
) -> Result<Vec<DbId>, sqlx::Error> {
    let locked: HashSet<DbId> = available_ids(tx, batch_id, actor, true)
        .await?
        .into_iter()
        .collect();
    if locked.is_empty() {
        return Ok(Vec::new());
    }
    let fresh = available_ids(tx, batch_id, actor, false).await?;
    Ok(fresh.into_iter().filter(|id| locked.contains(id)).collect())
}

async fn insert_assignment(
    tx: &mut Transaction<'_, Postgres>,
    batch: &Batch,
    task_id: DbId,
    actor: ClaimActor,
) -> Result<TaskAssignment, sqlx::Error> {
    let query = format!(
        "INSERT INTO task_assignments (task_id, assigned_to, session_id, expires_at)
         VALUES ($1, $2, $3, $4)
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, TaskAssignment>(&query)
        .bind(task_id)
        .bind(actor.user_id)
        .bind(actor.session_id)
        .bind(expires_at(Utc::now(), batch.allotted_assignment_hours))
        .fetch_one(&mut **tx)
        .await
}

/// Lock a task row. Returns its completed flag and the batch's
/// `assignments_per_task`, or `None` if the task does not exist.
async fn lock_task(
    tx: &mut Transaction<'_, Postgres>,
    task_id: DbId,
) -> Result<Option<(bool, i32)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT t.completed, b.assignments_per_task
         FROM tasks t JOIN batches b ON b.id = t.batch_id
         WHERE t.id = $1
         FOR UPDATE OF t",
    )
    .bind(task_id)
    .fetch_optional(&mut **tx)
    .await
}

async fn lock_assignment(
    tx: &mut Transaction<'_, Postgres>,
    task_id: DbId,
    assignment_id: DbId,
) -> Result<Option<TaskAssignment>, sqlx::Error> {
    let query = format!(
        "SELECT {COLUMNS} FROM task_assignments WHERE id = $1 AND task_id = $2 FOR UPDATE"
    );
    sqlx::query_as::<_, TaskAssignment>(&query)
        .bind(assignment_id)
        .bind(task_id)
        .fetch_optional(&mut **tx)
        .await
}
