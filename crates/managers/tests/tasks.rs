mod common;

use assert_matches::assert_matches;
use schoolnet_core::error::CoreError;
use schoolnet_core::notification_types as types;
use schoolnet_core::roles::ROLE_TUTOR;
use schoolnet_db::models::task::{CreateTask, CreateTaskTemplate};
use schoolnet_db::repositories::{NotificationRepo, TaskTemplateRepo};
use schoolnet_managers::{ManagerError, TaskManager};
use sqlx::PgPool;

async fn essay_template(pool: &PgPool, created_by: Option<i64>, title: &str) -> i64 {
    TaskTemplateRepo::create(
        pool,
        &CreateTaskTemplate {
            title: title.to_string(),
            roadmap_key: Some("essay".to_string()),
            created_by_id: created_by,
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .id
}

fn for_user(user_id: i64) -> CreateTask {
    CreateTask {
        for_user_id: user_id,
        ..Default::default()
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_template_task_uses_counselor_override(pool: PgPool) {
    let (notifier, _) = common::notifier(&pool);
    let (counselor_id, counselor_user) = common::counselor(&pool, "c@example.com", false).await;
    let family = common::family(&pool, "ada", Some(counselor_id)).await;
    let stock = essay_template(&pool, None, "Write your essay").await;
    let own = essay_template(&pool, Some(counselor_user), "Write your essay (my way)").await;
    let manager = TaskManager::new(notifier);

    let task = manager
        .create_task(Some(stock), for_user(family.student_user))
        .await
        .unwrap();
    assert_eq!(task.task_template_id, Some(own));
    assert_eq!(task.title, "Write your essay (my way)");
    assert_eq!(task.created_by_id, Some(counselor_user));
    // Counseling tasks stay unassigned until shown to the student.
    assert!(task.assigned_time.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_plain_task_is_assigned_immediately(pool: PgPool) {
    let (notifier, _) = common::notifier(&pool);
    let tutor_user = common::user(&pool, "t@example.com", ROLE_TUTOR).await;
    let family = common::family(&pool, "ada", None).await;
    let manager = TaskManager::new(notifier);

    let task = manager
        .create_task(
            None,
            CreateTask {
                title: "Practice test".to_string(),
                created_by_id: Some(tutor_user),
                ..for_user(family.student_user)
            },
        )
        .await
        .unwrap();
    assert!(task.assigned_time.is_some());

    let err = manager
        .create_task(None, for_user(family.student_user))
        .await
        .unwrap_err();
    assert_matches!(err, ManagerError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_created_notification_is_deduplicated(pool: PgPool) {
    let (notifier, _) = common::notifier(&pool);
    let (counselor_id, counselor_user) = common::counselor(&pool, "c@example.com", false).await;
    let family = common::family(&pool, "ada", Some(counselor_id)).await;
    let manager = TaskManager::new(notifier);
    let task = manager
        .create_task(
            None,
            CreateTask {
                title: "Finish survey".to_string(),
                created_by_id: Some(counselor_user),
                ..for_user(family.student_user)
            },
        )
        .await
        .unwrap();

    assert!(manager
        .send_task_created_notification(task.id, None, false)
        .await
        .unwrap());
    assert!(!manager
        .send_task_created_notification(task.id, None, false)
        .await
        .unwrap());
    assert!(manager
        .send_task_created_notification(task.id, None, true)
        .await
        .unwrap());

    let sent = NotificationRepo::list_for_user_by_type(&pool, family.student_user, types::TASK)
        .await
        .unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].actor_id, Some(counselor_user));
    assert_eq!(sent[0].additional_args["title"], "Finish survey");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_no_created_notification_without_access(pool: PgPool) {
    let (notifier, _) = common::notifier(&pool);
    let (counselor_id, counselor_user) = common::counselor(&pool, "c@example.com", false).await;
    let family = common::family(&pool, "ada", Some(counselor_id)).await;
    sqlx::query("UPDATE students SET has_access_to_cap = false WHERE id = $1")
        .bind(family.student_id)
        .execute(&pool)
        .await
        .unwrap();
    let manager = TaskManager::new(notifier);
    let task = manager
        .create_task(
            None,
            CreateTask {
                title: "Finish survey".to_string(),
                created_by_id: Some(counselor_user),
                ..for_user(family.student_user)
            },
        )
        .await
        .unwrap();

    assert!(!manager
        .send_task_created_notification(task.id, None, false)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_completion_notifies_counselor_once(pool: PgPool) {
    let (notifier, _) = common::notifier(&pool);
    let (counselor_id, counselor_user) = common::counselor(&pool, "c@example.com", false).await;
    let family = common::family(&pool, "ada", Some(counselor_id)).await;
    let manager = TaskManager::new(notifier);

    // No creator: the student's counselor hears about it.
    let task = manager
        .create_task(
            None,
            CreateTask {
                title: "Sign up for SAT".to_string(),
                ..for_user(family.student_user)
            },
        )
        .await
        .unwrap();
    let done = manager
        .complete_task(task.id, Some(family.student_user), true)
        .await
        .unwrap();
    assert!(done.completed.is_some());

    let sent = NotificationRepo::list_for_user_by_type(&pool, counselor_user, types::TASK_COMPLETE)
        .await
        .unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].additional_args["name"], "ada Test");
    assert_eq!(sent[0].additional_args["title"], "Sign up for SAT");

    let err = manager
        .complete_task(task.id, None, true)
        .await
        .unwrap_err();
    assert_matches!(err, ManagerError::Core(CoreError::Conflict(_)));
}
