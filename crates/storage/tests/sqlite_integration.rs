use chrono::{NaiveDate, NaiveTime};
use epsilon_core::model::{
    AnswerRecord, Badge, Category, CurrentUser, Difficulty, LessonSection, MeetingDraft,
    MeetingType, ProgressRecord, QuizAttempt, QuizQuestion, Recurrence, Resource, ResourceId,
    ResourceKind, ResourceType, Theme, UserEmail,
};
use epsilon_core::time::fixed_now;
use storage::repository::{
    MeetingRepository, ProfileRepository, ProgressPatch, ProgressRepository,
    QuizAttemptRepository, RegistrationRepository, ResourceRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn repo(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn ada() -> UserEmail {
    UserEmail::new("Ada@Example.com").unwrap()
}

#[tokio::test]
async fn sqlite_progress_create_patch_and_find() {
    let repo = repo("memdb_progress").await;

    let mut record = ProgressRecord::first_activity(ada());
    record.record_completion(ResourceType::Lesson, ResourceId::new(1), 150);
    let id = repo.create(&record).await.unwrap();
    assert_eq!(repo.create(&record).await, Err(StorageError::Conflict));

    record.record_completion(ResourceType::Quiz, ResourceId::new(2), 100);
    record.refresh_badges();
    repo.update(id, &ProgressPatch::after_completion(ResourceType::Quiz, &record))
        .await
        .unwrap();

    let entry = repo.find_by_email(&ada()).await.unwrap().expect("record");
    assert_eq!(entry.id, id);
    assert_eq!(entry.record.xp(), 250);
    assert_eq!(entry.record.streak_days(), 1);
    assert!(entry.record.completed_lessons().contains(&ResourceId::new(1)));
    assert!(entry.record.completed_quizzes().contains(&ResourceId::new(2)));
    assert!(entry.record.stored_badges().contains(&Badge::Starter));
    assert_eq!(repo.list().await.unwrap().len(), 1);

    let missing = UserEmail::new("nobody@example.com").unwrap();
    assert!(repo.find_by_email(&missing).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_update_of_unknown_record_is_not_found() {
    let repo = repo("memdb_progress_missing").await;
    let patch = ProgressPatch {
        streak_days: Some(3),
        ..ProgressPatch::default()
    };
    assert_eq!(
        repo.update(epsilon_core::model::ProgressId::new(7), &patch).await,
        Err(StorageError::NotFound)
    );
    assert_eq!(
        repo.update(
            epsilon_core::model::ProgressId::new(7),
            &ProgressPatch::default()
        )
        .await,
        Err(StorageError::NotFound)
    );
}

#[tokio::test]
async fn sqlite_attempts_keep_answers_and_order() {
    let repo = repo("memdb_attempts").await;
    let answers = vec![
        AnswerRecord {
            question_index: 0,
            selected_answer: 1,
            correct: true,
        },
        AnswerRecord {
            question_index: 1,
            selected_answer: 0,
            correct: false,
        },
    ];
    let first =
        QuizAttempt::from_answers(ada(), ResourceId::new(5), 2, answers.clone(), fixed_now()).unwrap();
    let second = QuizAttempt::from_answers(
        ada(),
        ResourceId::new(5),
        2,
        answers,
        fixed_now() + chrono::Duration::minutes(5),
    )
    .unwrap();
    let a = repo.append_attempt(&first).await.unwrap();
    let b = repo.append_attempt(&second).await.unwrap();
    assert!(b > a);

    let stored = repo.attempts_for_user(&ada()).await.unwrap();
    assert_eq!(stored, vec![first, second]);
    assert_eq!(stored[1].score_label(), "1/2");
}

#[tokio::test]
async fn sqlite_resources_roundtrip_kind_payload() {
    let repo = repo("memdb_resources").await;
    let quiz = Resource::new(
        ResourceId::new(10),
        "Pricing quiz",
        Some("Check your margins".into()),
        Category::Finance,
        Difficulty::Intermediate,
        ResourceKind::Quiz {
            questions: vec![
                QuizQuestion::new("Markup?", vec!["a".into(), "b".into()], 1, "b").unwrap(),
            ],
        },
    )
    .unwrap()
    .with_xp_reward(Some(120));
    let lesson = Resource::new(
        ResourceId::new(3),
        "Leading teams",
        None,
        Category::Leadership,
        Difficulty::Beginner,
        ResourceKind::Lesson {
            sections: vec![LessonSection::new("Trust", "Build **trust** first.")],
            sources: vec!["Team handbook".into()],
        },
    )
    .unwrap()
    .with_duration_minutes(Some(15));

    repo.upsert_resource(&quiz).await.unwrap();
    repo.upsert_resource(&lesson).await.unwrap();
    repo.upsert_resource(&lesson).await.unwrap();

    assert_eq!(repo.get_resource(ResourceId::new(10)).await.unwrap(), quiz);
    let listed = repo.list_resources().await.unwrap();
    assert_eq!(listed, vec![lesson.clone(), quiz]);
    assert_eq!(listed[0].xp_reward(), 150);
    assert_eq!(
        repo.get_resource(ResourceId::new(99)).await,
        Err(StorageError::NotFound)
    );
}

#[tokio::test]
async fn sqlite_meetings_and_registrations() {
    let repo = repo("memdb_meetings").await;
    let day = NaiveDate::from_ymd_opt(2026, 11, 3).unwrap();

    let mut late = MeetingDraft::new(
        "Growth study group",
        "Emma Rodriguez",
        day,
        NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        "meet.example.com/growth",
    );
    late.meeting_type = MeetingType::GroupStudy;
    late.recurring = Recurrence::Weekly;
    late.category = Category::Marketing;
    let early = MeetingDraft::new(
        "Tutoring",
        "Prof. Michael Chen",
        day,
        NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        "https://meet.example.com/tutor",
    );

    let late_id = repo.insert_meeting(&late.validate().unwrap()).await.unwrap();
    let early_id = repo.insert_meeting(&early.validate().unwrap()).await.unwrap();

    let meetings = repo.list_meetings().await.unwrap();
    assert_eq!(
        meetings.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![early_id, late_id]
    );
    let fetched = repo.get_meeting(late_id).await.unwrap();
    assert_eq!(fetched.meeting_link.as_str(), "https://meet.example.com/growth");
    assert_eq!(fetched.recurring, Recurrence::Weekly);
    assert_eq!(fetched.meeting_type, MeetingType::GroupStudy);

    assert!(repo.register(&ada(), late_id).await.unwrap());
    assert!(!repo.register(&ada(), late_id).await.unwrap());
    assert_eq!(repo.registrations_for_user(&ada()).await.unwrap(), vec![late_id]);
    assert!(repo.unregister(&ada(), late_id).await.unwrap());
    assert!(repo.registrations_for_user(&ada()).await.unwrap().is_empty());
    assert_eq!(
        repo.register(&ada(), epsilon_core::model::MeetingId::new(404)).await,
        Err(StorageError::NotFound)
    );
}

#[tokio::test]
async fn sqlite_profile_upsert_keeps_one_row_per_user() {
    let repo = repo("memdb_profiles").await;
    assert!(repo.find_profile(&ada()).await.unwrap().is_none());

    let mut user = CurrentUser::new(ada()).with_full_name("Ada");
    repo.save_profile(&user).await.unwrap();

    user.full_name = Some("Ada Lovelace".into());
    user.theme = Theme::HighContrast;
    repo.save_profile(&user).await.unwrap();

    let stored = repo.find_profile(&ada()).await.unwrap().expect("profile");
    assert_eq!(stored, user);
    assert_eq!(stored.theme.to_string(), "high-contrast");
}
