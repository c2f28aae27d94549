//! Worker jobs run against a real database at fixed points in time.

mod common;

use chrono::{Duration, SubsecRound, TimeZone, Utc};
use schoolnet_core::conversations::CONVERSATION_TYPE_TUTOR;
use schoolnet_core::notification_types as types;
use schoolnet_core::roles::ROLE_STUDENT;
use schoolnet_db::models::conversation::CreateConversation;
use schoolnet_core::types::Timestamp;
use schoolnet_db::models::task::CreateTask;
use schoolnet_db::models::tutoring::{
    CreateCourse, CreateGroupTutoringSession, CreateStudentTutoringSession, StudentTutoringSession,
};
use schoolnet_db::models::user::User;
use schoolnet_db::repositories::{
    ConversationRepo, CounselorMeetingRepo, CourseRepo, NotificationRecipientRepo,
    NotificationRepo, TaskRepo, TutoringSessionRepo, UserRepo,
};
use schoolnet_events::NewNotification;
use schoolnet_worker::jobs::{admins, counselors, invites, messages, sessions, tasks, tutors};
use schoolnet_worker::{Job, JobContext};
use sqlx::PgPool;

async fn load(pool: &PgPool, id: i64) -> User {
    UserRepo::find_by_id(pool, id).await.unwrap().unwrap()
}

fn utc(month: u32, day: u32, hour: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2024, month, day, hour, 0, 0).unwrap()
}

async fn individual_session(
    pool: &PgPool,
    student_id: i64,
    tutor_id: i64,
    starts_at: Timestamp,
) -> StudentTutoringSession {
    TutoringSessionRepo::create(
        pool,
        &CreateStudentTutoringSession {
            student_id: Some(student_id),
            individual_session_tutor_id: Some(tutor_id),
            group_tutoring_session_id: None,
            session_type: None,
            starts_at,
            ends_at: starts_at + Duration::hours(1),
            duration_minutes: 60,
            is_tentative: None,
        },
    )
    .await
    .unwrap()
}

async fn task_for(
    pool: &PgPool,
    user_id: i64,
    title: &str,
    due: Option<Timestamp>,
    assigned: Timestamp,
) -> i64 {
    TaskRepo::create(
        pool,
        &CreateTask {
            for_user_id: user_id,
            title: title.to_string(),
            due,
            ..Default::default()
        },
        Some(assigned),
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Session reminders
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tutoring_reminder_sent_once(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    let (tutor_id, tutor_user) = common::tutor(&pool, "tia@example.com").await;
    let (student_id, student_user) = common::student(&pool, "ada").await;
    let now = Utc::now();

    let session = TutoringSessionRepo::create(
        &pool,
        &CreateStudentTutoringSession {
            student_id: Some(student_id),
            individual_session_tutor_id: Some(tutor_id),
            group_tutoring_session_id: None,
            session_type: None,
            starts_at: now + Duration::hours(24),
            ends_at: now + Duration::hours(25),
            duration_minutes: 60,
            is_tentative: None,
        },
    )
    .await
    .unwrap();

    let sent = sessions::upcoming_tutoring_sessions(&ctx, now).await.unwrap();
    assert_eq!(sent.sessions, vec![session.id]);
    assert!(!channel.emails_to("ada@example.com").is_empty());

    let student_notices =
        NotificationRepo::list_for_user_by_type(&pool, student_user, types::STUDENT_TUTORING_SESSION_REMINDER)
            .await
            .unwrap();
    assert_eq!(student_notices.len(), 1);
    let tutor_notices =
        NotificationRepo::list_for_user_by_type(&pool, tutor_user, types::TUTOR_TUTORING_SESSION_REMINDER)
            .await
            .unwrap();
    assert_eq!(tutor_notices.len(), 1);

    let again = sessions::upcoming_tutoring_sessions(&ctx, now + Duration::minutes(5))
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tentative_and_distant_sessions_skipped(pool: PgPool) {
    let (ctx, _) = common::context(&pool);
    let (tutor_id, _) = common::tutor(&pool, "tia@example.com").await;
    let (student_id, _) = common::student(&pool, "ada").await;
    let now = Utc::now();

    for (hours, tentative) in [(12, true), (72, false)] {
        TutoringSessionRepo::create(
            &pool,
            &CreateStudentTutoringSession {
                student_id: Some(student_id),
                individual_session_tutor_id: Some(tutor_id),
                group_tutoring_session_id: None,
                session_type: None,
                starts_at: now + Duration::hours(hours),
                ends_at: now + Duration::hours(hours + 1),
                duration_minutes: 60,
                is_tentative: Some(tentative),
            },
        )
        .await
        .unwrap();
    }

    let sent = sessions::upcoming_tutoring_sessions(&ctx, now).await.unwrap();
    assert!(sent.is_empty());
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_task_reminder_backs_off(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    let (_, student_user) = common::student(&pool, "ada").await;
    let now = Utc::now().trunc_subsecs(6);

    let overdue = TaskRepo::create(
        &pool,
        &CreateTask {
            for_user_id: student_user,
            title: "Draft essay".to_string(),
            due: Some(now - Duration::days(1)),
            ..Default::default()
        },
        Some(now - Duration::days(3)),
    )
    .await
    .unwrap();
    let coming = TaskRepo::create(
        &pool,
        &CreateTask {
            for_user_id: student_user,
            title: "Request transcript".to_string(),
            due: Some(now + Duration::hours(30)),
            ..Default::default()
        },
        Some(now - Duration::days(3)),
    )
    .await
    .unwrap();
    TaskRepo::create(
        &pool,
        &CreateTask {
            for_user_id: student_user,
            title: "Far off".to_string(),
            due: Some(now + Duration::days(10)),
            ..Default::default()
        },
        Some(now - Duration::days(3)),
    )
    .await
    .unwrap();

    let mut reminded = tasks::student_task_reminders(&ctx, now).await.unwrap();
    reminded.sort_unstable();
    assert_eq!(reminded, vec![overdue.id, coming.id]);

    let emails = channel.emails_to("ada@example.com");
    assert_eq!(emails.len(), 1);
    assert!(emails[0].body.contains("Draft essay"));
    assert!(!emails[0].body.contains("Far off"));

    let task = TaskRepo::find_by_id(&pool, overdue.id).await.unwrap().unwrap();
    assert_eq!(task.last_reminder_sent, Some(now));

    // Inside the 23 hour backoff nothing goes out.
    let again = tasks::student_task_reminders(&ctx, now + Duration::hours(2))
        .await
        .unwrap();
    assert!(again.is_empty());
    let later = tasks::student_task_reminders(&ctx, now + Duration::hours(24))
        .await
        .unwrap();
    assert!(later.contains(&overdue.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_daily_digest_once_per_day(pool: PgPool) {
    let (ctx, _) = common::context(&pool);
    let (_, student_user) = common::student(&pool, "ada").await;
    let now = Utc::now();

    TaskRepo::create(
        &pool,
        &CreateTask {
            for_user_id: student_user,
            title: "New task".to_string(),
            ..Default::default()
        },
        Some(now - Duration::hours(2)),
    )
    .await
    .unwrap();

    let sent = tasks::daily_task_digest(&ctx, now).await.unwrap();
    assert_eq!(sent, vec![student_user]);
    let again = tasks::daily_task_digest(&ctx, now + Duration::hours(1)).await.unwrap();
    assert!(again.is_empty());
}

// ---------------------------------------------------------------------------
// Invites
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invite_reminder_after_two_days(pool: PgPool) {
    let (ctx, _) = common::context(&pool);
    let pending = common::user(&pool, "new@example.com", ROLE_STUDENT, true).await;
    ctx.notifier
        .create(NewNotification::new(types::INVITE).to_user(pending))
        .await
        .unwrap();
    let now = Utc::now().trunc_subsecs(6);

    assert!(invites::invite_reminders(&ctx, now + Duration::days(1))
        .await
        .unwrap()
        .is_empty());

    let at = now + Duration::days(3);
    assert_eq!(invites::invite_reminders(&ctx, at).await.unwrap(), vec![pending]);
    assert_eq!(load(&pool, pending).await.last_invited, Some(at));

    // The first reminder went out; the next one waits a week.
    assert!(invites::invite_reminders(&ctx, at + Duration::days(1))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        invites::invite_reminders(&ctx, at + Duration::days(8)).await.unwrap(),
        vec![pending]
    );
}

// ---------------------------------------------------------------------------
// Unread messages
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unread_notice_sent_once_per_message(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    let (tutor_id, tutor_user) = common::tutor(&pool, "tia@example.com").await;
    let (student_id, student_user) = common::student(&pool, "ada").await;

    let conversation = ConversationRepo::create(
        &pool,
        &CreateConversation {
            conversation_type: CONVERSATION_TYPE_TUTOR.to_string(),
            student_id: Some(student_id),
            tutor_id: Some(tutor_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let mut participants = Vec::new();
    for user_id in [student_user, tutor_user] {
        let recipient = NotificationRecipientRepo::get_or_create(&pool, user_id)
            .await
            .unwrap();
        participants.push(
            ConversationRepo::add_participant(&pool, conversation.id, recipient.id, None)
                .await
                .unwrap()
                .id,
        );
    }
    ConversationRepo::post_message(&pool, conversation.id, Some(tutor_user), "tia Test", "See you Monday")
        .await
        .unwrap();

    // Too fresh to nag about.
    assert!(messages::unread_messages(&ctx, Utc::now()).await.unwrap().is_empty());

    let later = Utc::now() + Duration::minutes(10);
    let sent = messages::unread_messages(&ctx, later).await.unwrap();
    assert_eq!(sent, vec![participants[0]]);
    let emails = channel.emails_to("ada@example.com");
    assert_eq!(emails.len(), 1);
    assert!(emails[0].body.contains("tia Test: See you Monday"));

    assert!(messages::unread_messages(&ctx, later + Duration::minutes(1))
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Tutor time cards
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_time_cards_created_once_per_period(pool: PgPool) {
    let (ctx, _) = common::context(&pool);
    let (_, tutor_user) = common::tutor(&pool, "tia@example.com").await;
    let now = Utc::now();

    let cards = tutors::tutor_time_cards(&ctx, now).await.unwrap();
    assert_eq!(cards.len(), 1);
    let notices = NotificationRepo::list_for_user_by_type(&pool, tutor_user, types::TUTOR_TIME_CARD)
        .await
        .unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].related_object_id, Some(cards[0]));

    assert!(tutors::tutor_time_cards(&ctx, now).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_job_dispatch_counts_items(pool: PgPool) {
    let (ctx, _) = common::context(&pool);
    common::tutor(&pool, "tia@example.com").await;
    let now = Utc::now();

    assert_eq!(Job::TutorTimeCards.run(&ctx, now).await.unwrap(), 1);
    assert_eq!(Job::TutorDailyDigest.run(&ctx, now).await.unwrap(), 0);
    assert_eq!(Job::LastMeetings.run(&ctx, now).await.unwrap(), 0);
    assert_eq!(Job::UpcomingCourses.run(&ctx, now).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Parent tasks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_parent_task_in_daily_digest(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    common::student(&pool, "ada").await;
    let parent = common::parent_user(&pool, "ada").await;
    let now = Utc::now();

    task_for(&pool, parent, "Sign financial aid form", None, now - Duration::hours(2)).await;

    let sent = tasks::daily_task_digest(&ctx, now).await.unwrap();
    assert_eq!(sent, vec![parent]);
    let emails = channel.emails_to("ada-parent@example.com");
    assert_eq!(emails.len(), 1);
    assert!(emails[0].body.contains("Sign financial aid form"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_parent_overdue_task_reminded(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    common::student(&pool, "ada").await;
    let parent = common::parent_user(&pool, "ada").await;
    let now = Utc::now();

    let task = task_for(
        &pool,
        parent,
        "Pay deposit",
        Some(now - Duration::hours(5)),
        now - Duration::days(3),
    )
    .await;

    let reminded = tasks::student_task_reminders(&ctx, now).await.unwrap();
    assert_eq!(reminded, vec![task]);
    assert!(channel.emails_to("ada-parent@example.com")[0].body.contains("Pay deposit"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reminders_skip_students_without_cap_access(pool: PgPool) {
    let (ctx, _) = common::context(&pool);
    let (_, student_user) = common::enrolled_student(&pool, "bo", None, false).await;
    let now = Utc::now();

    task_for(
        &pool,
        student_user,
        "Draft essay",
        Some(now - Duration::hours(5)),
        now - Duration::days(3),
    )
    .await;

    assert!(tasks::student_task_reminders(&ctx, now).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Digests run twice
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tutor_digest_not_resent_on_rerun(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    let (tutor_id, _) = common::tutor(&pool, "tia@example.com").await;
    let (student_id, _) = common::student(&pool, "ada").await;
    let now = Utc::now();
    individual_session(&pool, student_id, tutor_id, now + Duration::hours(5)).await;

    assert_eq!(tutors::tutor_daily_digest(&ctx, now).await.unwrap(), vec![tutor_id]);
    let again = tutors::tutor_daily_digest(&ctx, now + Duration::minutes(5))
        .await
        .unwrap();
    assert!(again.is_empty());
    assert_eq!(channel.emails_to("tia@example.com").len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_last_meetings_reported_once(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    let admin = common::admin(&pool, "ops@example.com").await;
    let (tutor_id, _) = common::tutor(&pool, "tia@example.com").await;
    let (student_id, _) = common::student(&pool, "ada").await;
    let now = Utc::now();
    // No hours purchased, so this session leaves less than an hour.
    individual_session(&pool, student_id, tutor_id, now + Duration::hours(24)).await;

    let reported = sessions::last_meetings(&ctx, now).await.unwrap();
    assert_eq!(reported, vec![student_id]);
    let notices = NotificationRepo::list_for_user_by_type(&pool, admin, types::LAST_MEETING)
        .await
        .unwrap();
    assert_eq!(notices.len(), 1);
    let emails = channel.emails_to("ops@example.com");
    assert_eq!(emails.len(), 1);
    assert!(emails[0].body.contains("ada Test"));

    let again = sessions::last_meetings(&ctx, now + Duration::hours(1)).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(channel.emails_to("ops@example.com").len(), 1);
}

// ---------------------------------------------------------------------------
// Counselor digests
// ---------------------------------------------------------------------------

async fn meeting_at(pool: &PgPool, student_id: i64, title: &str, starts_at: Timestamp) -> i64 {
    let meeting = CounselorMeetingRepo::create(pool, student_id, None, title)
        .await
        .unwrap();
    CounselorMeetingRepo::set_times(pool, meeting.id, starts_at, starts_at + Duration::hours(1))
        .await
        .unwrap()
        .unwrap()
        .id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counselor_task_digest_at_two_pm(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    let (counselor_id, counselor_user) = common::counselor(&pool, "sam@example.com").await;
    let (student_id, student_user) =
        common::enrolled_student(&pool, "ada", Some(counselor_id), true).await;
    // Wednesday, 2pm in New York.
    let now = utc(3, 20, 18);

    let meeting = meeting_at(&pool, student_id, "College list review", utc(3, 21, 15)).await;
    // Due before the window closes, so it is both a meeting task and overdue.
    let linked = task_for(
        &pool,
        student_user,
        "Bring transcript",
        Some(utc(3, 21, 12)),
        utc(3, 18, 12),
    )
    .await;
    CounselorMeetingRepo::link_task(&pool, meeting, linked).await.unwrap();
    task_for(&pool, student_user, "Finish essay", Some(utc(3, 18, 12)), utc(3, 15, 12)).await;
    task_for(&pool, student_user, "Far off", Some(utc(4, 10, 12)), utc(3, 15, 12)).await;

    // 8am local is outside the send window.
    assert!(counselors::counselor_task_digest(&ctx, utc(3, 20, 12))
        .await
        .unwrap()
        .is_empty());

    let sent = counselors::counselor_task_digest(&ctx, now).await.unwrap();
    assert_eq!(sent, vec![counselor_id]);
    let notices =
        NotificationRepo::list_for_user_by_type(&pool, counselor_user, types::COUNSELOR_TASK_DIGEST)
            .await
            .unwrap();
    assert_eq!(notices.len(), 1);

    let emails = channel.emails_to("sam@example.com");
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].body.matches("Bring transcript").count(), 1);
    assert!(emails[0].body.contains("Finish essay (ada Test)"));
    assert!(!emails[0].body.contains("Far off"));

    let again = counselors::counselor_task_digest(&ctx, now + Duration::minutes(30))
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counselor_task_digest_held_on_weekends(pool: PgPool) {
    let (ctx, _) = common::context(&pool);
    let (counselor_id, _) = common::counselor(&pool, "sam@example.com").await;
    let (student_id, student_user) =
        common::enrolled_student(&pool, "ada", Some(counselor_id), true).await;
    // Saturday, 2pm in New York.
    let saturday = utc(3, 23, 18);

    let meeting = meeting_at(&pool, student_id, "Essay check-in", utc(3, 24, 15)).await;
    let task = task_for(&pool, student_user, "Outline essay", None, utc(3, 20, 12)).await;
    CounselorMeetingRepo::link_task(&pool, meeting, task).await.unwrap();

    let holding = JobContext::new(ctx.notifier.clone(), true);
    assert!(counselors::counselor_task_digest(&holding, saturday)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        counselors::counselor_task_digest(&ctx, saturday).await.unwrap(),
        vec![counselor_id]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_completed_tasks_look_back_over_the_week_on_friday(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    let (counselor_id, _) = common::counselor(&pool, "sam@example.com").await;
    let (_, student_user) = common::enrolled_student(&pool, "ada", Some(counselor_id), true).await;

    let task = task_for(&pool, student_user, "Submit FAFSA", None, utc(3, 18, 12)).await;
    TaskRepo::complete(&pool, task, utc(3, 20, 12)).await.unwrap();

    // Thursday 7pm looks back one day and misses Wednesday's completion.
    let thursday = counselors::counselor_completed_tasks(&ctx, utc(3, 21, 23))
        .await
        .unwrap();
    assert!(thursday.is_empty());

    // Friday 7pm looks back three days.
    let friday = utc(3, 22, 23);
    let sent = counselors::counselor_completed_tasks(&ctx, friday).await.unwrap();
    assert_eq!(sent, vec![counselor_id]);
    let emails = channel.emails_to("sam@example.com");
    assert_eq!(emails.len(), 1);
    assert!(emails[0].body.contains("Submit FAFSA (ada Test)"));

    let again = counselors::counselor_completed_tasks(&ctx, friday + Duration::minutes(30))
        .await
        .unwrap();
    assert!(again.is_empty());
    assert_eq!(channel.emails_to("sam@example.com").len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counselor_weekly_digest_sent_once(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    let (counselor_id, _) = common::counselor(&pool, "sam@example.com").await;
    let (student_id, _) = common::enrolled_student(&pool, "ada", Some(counselor_id), true).await;
    common::counselor(&pool, "idle@example.com").await;
    let now = Utc::now();

    meeting_at(&pool, student_id, "Activities list", now + Duration::days(2)).await;
    meeting_at(&pool, student_id, "Next month", now + Duration::days(20)).await;

    let sent = counselors::counselor_weekly_digest(&ctx, now).await.unwrap();
    assert_eq!(sent, vec![counselor_id]);
    let emails = channel.emails_to("sam@example.com");
    assert_eq!(emails.len(), 1);
    assert!(emails[0].body.contains("Activities list (ada Test)"));
    assert!(!emails[0].body.contains("Next month"));
    assert!(channel.emails_to("idle@example.com").is_empty());

    let again = counselors::counselor_weekly_digest(&ctx, now + Duration::hours(1))
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counselor_meeting_reminded_once(pool: PgPool) {
    let (ctx, _) = common::context(&pool);
    let (counselor_id, _) = common::counselor(&pool, "sam@example.com").await;
    let (student_id, student_user) =
        common::enrolled_student(&pool, "ada", Some(counselor_id), true).await;
    let now = Utc::now().trunc_subsecs(6);

    let meeting = meeting_at(&pool, student_id, "Kickoff", now + Duration::hours(24)).await;
    let cancelled = meeting_at(&pool, student_id, "Cancelled", now + Duration::hours(30)).await;
    CounselorMeetingRepo::cancel(&pool, cancelled, now).await.unwrap();

    let sent = sessions::upcoming_counselor_meetings(&ctx, now).await.unwrap();
    assert_eq!(sent, vec![meeting]);
    let stored = CounselorMeetingRepo::find_by_id(&pool, meeting).await.unwrap().unwrap();
    assert_eq!(stored.last_reminder_sent, Some(now));
    let notices = NotificationRepo::list_for_user_by_type(
        &pool,
        student_user,
        types::STUDENT_COUNSELOR_SESSION_REMINDER,
    )
    .await
    .unwrap();
    assert_eq!(notices.len(), 1);

    let again = sessions::upcoming_counselor_meetings(&ctx, now + Duration::minutes(5))
        .await
        .unwrap();
    assert!(again.is_empty());
}

// ---------------------------------------------------------------------------
// Operations notices
// ---------------------------------------------------------------------------

async fn course_with_sessions(pool: &PgPool, name: &str, tutor_id: i64, starts: &[Timestamp]) -> i64 {
    let course = CourseRepo::create(
        pool,
        &CreateCourse {
            name: name.to_string(),
            primary_tutor_id: Some(tutor_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    for (i, start) in starts.iter().enumerate() {
        let session = TutoringSessionRepo::create_group(
            pool,
            &CreateGroupTutoringSession {
                title: format!("{name} {}", i + 1),
                primary_tutor_id: Some(tutor_id),
                starts_at: *start,
                ends_at: *start + Duration::hours(2),
                charge_student_duration: None,
            },
        )
        .await
        .unwrap();
        CourseRepo::add_group_session(pool, course.id, session.id).await.unwrap();
    }
    course.id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upcoming_course_announced_once(pool: PgPool) {
    let (ctx, _) = common::context(&pool);
    let admin = common::admin(&pool, "ops@example.com").await;
    let (tutor_id, _) = common::tutor(&pool, "tia@example.com").await;
    let now = Utc::now();

    let course = course_with_sessions(
        &pool,
        "SAT Bootcamp",
        tutor_id,
        &[now + Duration::days(3), now + Duration::days(10)],
    )
    .await;
    // Already under way.
    course_with_sessions(
        &pool,
        "ACT Prep",
        tutor_id,
        &[now - Duration::days(2), now + Duration::days(2)],
    )
    .await;
    // Too far out.
    course_with_sessions(&pool, "AP Review", tutor_id, &[now + Duration::days(20)]).await;

    let announced = admins::upcoming_courses(&ctx, now).await.unwrap();
    assert_eq!(announced, vec![course]);
    let notices = NotificationRepo::list_for_user_by_type(&pool, admin, types::OPS_UPCOMING_COURSE)
        .await
        .unwrap();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].title.starts_with("Upcoming Course: SAT Bootcamp starting on"));
    assert!(notices[0].title.ends_with("with tia Test"));

    let again = admins::upcoming_courses(&ctx, now + Duration::hours(1)).await.unwrap();
    assert!(again.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_first_session_digest_lists_only_first_sessions(pool: PgPool) {
    let (ctx, channel) = common::context(&pool);
    let admin = common::admin(&pool, "ops@example.com").await;
    let (tutor_id, _) = common::tutor(&pool, "tia@example.com").await;
    let (ada, _) = common::student(&pool, "ada").await;
    let (bo, _) = common::student(&pool, "bo").await;
    let now = Utc::now();

    individual_session(&pool, ada, tutor_id, now - Duration::hours(2)).await;
    individual_session(&pool, bo, tutor_id, now - Duration::days(7)).await;
    individual_session(&pool, bo, tutor_id, now - Duration::hours(3)).await;

    let sent = admins::first_session_digest(&ctx, now).await.unwrap();
    assert_eq!(sent, vec![admin]);
    let emails = channel.emails_to("ops@example.com");
    assert_eq!(emails.len(), 1);
    assert!(emails[0].body.contains("ada Test with tia Test"));
    assert!(!emails[0].body.contains("bo Test"));

    let again = admins::first_session_digest(&ctx, now + Duration::hours(1)).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(channel.emails_to("ops@example.com").len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_first_session_digest_sent_when_empty(pool: PgPool) {
    let (ctx, _) = common::context(&pool);
    let admin = common::admin(&pool, "ops@example.com").await;

    let sent = admins::first_session_digest(&ctx, Utc::now()).await.unwrap();
    assert_eq!(sent, vec![admin]);
    let notices = NotificationRepo::list_for_user_by_type(
        &pool,
        admin,
        types::FIRST_INDIVIDUAL_TUTORING_SESSION_DAILY_DIGEST,
    )
    .await
    .unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].additional_args["count"], 0);
}
