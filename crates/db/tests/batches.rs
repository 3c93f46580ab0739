//! Integration tests for projects, batches and results export.

use std::time::Duration;

use hitlist_core::csv_batch::{parse_batch_csv, write_results_csv};
use hitlist_core::template::extract_field_names;
use hitlist_db::models::assignment::ClaimOutcome;
use hitlist_db::models::batch::{CreateBatch, UpdateBatch};
use hitlist_db::models::project::{CreateProject, Project, UpdateProject};
use hitlist_db::models::user::CreateUser;
use hitlist_db::models::worker_group::CreateWorkerGroup;
use hitlist_db::repositories::{
    AssignmentRepo, BatchRepo, ClaimActor, ProjectRepo, TaskRepo, UserRepo, WorkerGroupRepo,
    WorkerSessionRepo,
};
use sqlx::PgPool;

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

fn new_project(name: &str, html: &str) -> CreateProject {
    CreateProject {
        name: name.to_string(),
        html_template: html.to_string(),
        template_filename: Some("task.html".to_string()),
        assignments_per_task: None,
        active: None,
        login_required: None,
        custom_permissions: None,
    }
}

async fn create_project(pool: &PgPool, input: &CreateProject) -> Project {
    let fields = extract_field_names(&input.html_template);
    ProjectRepo::create(pool, input, &fields, None).await.unwrap()
}

fn batch_for(project: &Project, csv_fields: Vec<String>, active: bool) -> CreateBatch {
    CreateBatch {
        project_id: project.id,
        name: "Batch 1".to_string(),
        filename: "input.csv".to_string(),
        csv_fields,
        assignments_per_task: project.assignments_per_task,
        allotted_assignment_hours: 24,
        active,
        created_by: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn project_defaults_and_field_names(pool: PgPool) {
    let project = create_project(&pool, &new_project("Pairs", "${a} vs ${b} (${a})")).await;

    assert_eq!(project.field_names, vec!["a", "b"]);
    assert_eq!(project.assignments_per_task, 1);
    assert!(project.active);
    assert!(project.login_required);
    assert!(!project.custom_permissions);

    let updated = ProjectRepo::update(
        &pool,
        project.id,
        &UpdateProject {
            name: None,
            html_template: Some("${c}".to_string()),
            template_filename: None,
            assignments_per_task: Some(3),
            active: None,
            login_required: Some(false),
            custom_permissions: None,
        },
        Some(&["c".to_string()]),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.field_names, vec!["c"]);
    assert_eq!(updated.assignments_per_task, 3);
    assert!(!updated.login_required);
    assert_eq!(updated.template_filename.as_deref(), Some("task.html"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_project_name_violates_unique_constraint(pool: PgPool) {
    create_project(&pool, &new_project("Same", "${x}")).await;
    let err = ProjectRepo::create(&pool, &new_project("Same", "${x}"), &[], None)
        .await
        .unwrap_err();
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.constraint(), Some("uq_projects_name"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn batch_stats_and_publish(pool: PgPool) {
    let project = create_project(&pool, &new_project("Stats", "${a}")).await;
    let parsed = parse_batch_csv(b"a\n1\n2\n3\n", &project.field_names).unwrap();
    let batch = BatchRepo::create_with_tasks(&pool, &batch_for(&project, parsed.fields, false), &parsed.rows)
        .await
        .unwrap();
    assert!(!batch.active);
    assert!(batch.published_at.is_none());

    let stats = BatchRepo::find_with_stats(&pool, batch.id).await.unwrap().unwrap();
    assert_eq!(stats.total_tasks, 3);
    assert_eq!(stats.total_finished_tasks, 0);
    assert_eq!(stats.total_completed_assignments, 0);

    let published = BatchRepo::publish(&pool, batch.id).await.unwrap().unwrap();
    assert!(published.active);
    let first_published = published.published_at.unwrap();

    let renamed = BatchRepo::update(
        &pool,
        batch.id,
        &UpdateBatch {
            name: Some("Renamed".to_string()),
            ..UpdateBatch::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(renamed.name, "Renamed");
    assert_eq!(renamed.published_at, Some(first_published));

    let listed = BatchRepo::list_for_project(&pool, project.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].batch.id, batch.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_batch_cascades(pool: PgPool) {
    let project = create_project(&pool, &new_project("Cascade", "${a}")).await;
    let parsed = parse_batch_csv(b"a\n1\n", &project.field_names).unwrap();
    let batch = BatchRepo::create_with_tasks(&pool, &batch_for(&project, parsed.fields, true), &parsed.rows)
        .await
        .unwrap();
    let task_ids = BatchRepo::task_ids(&pool, batch.id).await.unwrap();

    assert!(BatchRepo::delete(&pool, batch.id).await.unwrap());
    assert!(BatchRepo::find_by_id(&pool, batch.id).await.unwrap().is_none());
    assert!(TaskRepo::find_by_id(&pool, task_ids[0]).await.unwrap().is_none());
    assert!(!BatchRepo::delete(&pool, batch.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn csv_import_then_export_appends_answers(pool: PgPool) {
    let mut input = new_project("Pairs", "${a} ${b} <input name=\"answer\">");
    input.login_required = Some(false);
    let project = create_project(&pool, &input).await;

    let parsed = parse_batch_csv(b"a,b\n1,2\n3,4\n", &project.field_names).unwrap();
    let batch = BatchRepo::create_with_tasks(&pool, &batch_for(&project, parsed.fields, true), &parsed.rows)
        .await
        .unwrap();

    let session = WorkerSessionRepo::create(&pool, None).await.unwrap();
    let actor = ClaimActor {
        user_id: None,
        session_id: session.id,
    };
    let ClaimOutcome::Claimed { assignment, .. } =
        AssignmentRepo::claim_next(&pool, &batch, actor, LOCK_TIMEOUT).await.unwrap()
    else {
        panic!("expected a task");
    };
    let answers = [("answer".to_string(), "yes".to_string())].into_iter().collect();
    AssignmentRepo::submit(
        &pool,
        assignment.task_id,
        assignment.id,
        actor.claimant(),
        answers,
        LOCK_TIMEOUT,
    )
    .await
    .unwrap();

    let tasks = TaskRepo::export_for_batch(&pool, batch.id).await.unwrap();
    let bytes = write_results_csv(&batch.csv_fields, &tasks, false).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "HITId,AssignmentId,Input.a,Input.b,Answer.answer");
    assert_eq!(lines[1], format!("{},{},1,2,yes", assignment.task_id, assignment.id));
    assert!(lines[2].ends_with(",,3,4,"), "{}", lines[2]);
    assert_eq!(lines.len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn available_batches_follow_access_rules(pool: PgPool) {
    let mut open = new_project("Open", "${a}");
    open.login_required = Some(false);
    let open = create_project(&pool, &open).await;
    let members_only = {
        let mut input = new_project("Members only", "${a}");
        input.custom_permissions = Some(true);
        create_project(&pool, &input).await
    };

    for project in [&open, &members_only] {
        let parsed = parse_batch_csv(b"a\n1\n", &project.field_names).unwrap();
        BatchRepo::create_with_tasks(&pool, &batch_for(project, parsed.fields, true), &parsed.rows)
            .await
            .unwrap();
    }
    // Unpublished batches are never listed.
    let parsed = parse_batch_csv(b"a\n1\n", &open.field_names).unwrap();
    BatchRepo::create_with_tasks(&pool, &batch_for(&open, parsed.fields, false), &parsed.rows)
        .await
        .unwrap();

    let member = UserRepo::create(
        &pool,
        &CreateUser {
            username: "member".to_string(),
            email: "member@example.com".to_string(),
            password_hash: "x".to_string(),
            role: "worker".to_string(),
        },
    )
    .await
    .unwrap();
    let group = WorkerGroupRepo::create(
        &pool,
        &CreateWorkerGroup {
            name: "Annotators".to_string(),
            user_ids: vec![member.id],
        },
    )
    .await
    .unwrap();
    assert_eq!(group.total_members, 1);

    let anon_session = WorkerSessionRepo::create(&pool, None).await.unwrap();
    let member_session = WorkerSessionRepo::create(&pool, Some(member.id)).await.unwrap();

    let anon = BatchRepo::available_for_actor(&pool, None, anon_session.id, false)
        .await
        .unwrap();
    assert_eq!(anon.len(), 1);
    assert_eq!(anon[0].project_id, open.id);

    let before = BatchRepo::available_for_actor(&pool, Some(member.id), member_session.id, false)
        .await
        .unwrap();
    assert_eq!(before.len(), 1);

    ProjectRepo::set_groups(&pool, members_only.id, &[group.id]).await.unwrap();
    let after = BatchRepo::available_for_actor(&pool, Some(member.id), member_session.id, false)
        .await
        .unwrap();
    assert_eq!(after.len(), 2);
    assert!(after.iter().all(|b| b.assignments_available == 1));
    assert_eq!(
        WorkerGroupRepo::group_ids_for_user(&pool, member.id).await.unwrap(),
        vec![group.id]
    );
}
