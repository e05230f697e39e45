use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use epsilon_core::model::{
    AttemptId, Badge, CurrentUser, MeetingFilter, ProgressId, ProgressRecord, QuizAttempt,
    ResourceId, ResourceType, UserEmail,
};
use epsilon_core::time::fixed_clock;
use epsilon_core::{NotificationTrigger, ProgressEvent, QuizSession};
use services::{AppServices, PersistenceStatus, RetryPolicy, StaticAuth};
use storage::repository::{
    ProgressEntry, ProgressPatch, ProgressRepository, QuizAttemptRepository, Storage,
    StorageError,
};

/// Attempt store that is always unreachable.
#[derive(Default)]
struct DownAttempts {
    calls: AtomicU32,
}

#[async_trait]
impl QuizAttemptRepository for DownAttempts {
    async fn append_attempt(&self, _attempt: &QuizAttempt) -> Result<AttemptId, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Connection("database is locked".into()))
    }

    async fn attempts_for_user(
        &self,
        _email: &UserEmail,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        Ok(Vec::new())
    }
}

/// Progress store that answers reads but rejects every write.
#[derive(Default)]
struct ReadOnlyProgress {
    writes: AtomicU32,
}

#[async_trait]
impl ProgressRepository for ReadOnlyProgress {
    async fn create(&self, _record: &ProgressRecord) -> Result<ProgressId, StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Connection("down".into()))
    }

    async fn update(&self, _id: ProgressId, _patch: &ProgressPatch) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Connection("down".into()))
    }

    async fn find_by_email(
        &self,
        _email: &UserEmail,
    ) -> Result<Option<ProgressEntry>, StorageError> {
        Ok(None)
    }

    async fn list(&self) -> Result<Vec<ProgressEntry>, StorageError> {
        Ok(Vec::new())
    }
}

fn ada() -> CurrentUser {
    CurrentUser::new(UserEmail::new("ada@example.com").unwrap()).with_full_name("Ada")
}

fn answer(session: &mut QuizSession, answers: &[usize]) {
    for (i, &a) in answers.iter().enumerate() {
        session.go_to(i).unwrap();
        session.select_answer(a).unwrap();
    }
}

fn correct_answers(session: &QuizSession) -> Vec<usize> {
    session.questions().iter().map(|q| q.correct_answer()).collect()
}

async fn seeded(storage: Storage, retry: RetryPolicy) -> AppServices {
    let app = AppServices::from_storage(
        storage,
        fixed_clock(),
        Arc::new(StaticAuth::signed_in(ada())),
        retry,
    );
    app.seed_demo().await.unwrap();
    app
}

async fn first_quiz(app: &AppServices) -> ResourceId {
    app.catalog()
        .list()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.resource_type() == ResourceType::Quiz)
        .map(|r| r.id())
        .unwrap()
}

#[tokio::test]
async fn completions_drive_notifications() {
    let app = seeded(Storage::in_memory(), RetryPolicy::none()).await;
    let user = app.current_user().await.unwrap().unwrap();
    let progress = app.progress();
    let mut trigger = NotificationTrigger::new();

    let resources = app.catalog().list().await.unwrap();
    let mut events = Vec::new();
    for r in resources.iter().filter(|r| r.resource_type() == ResourceType::Lesson) {
        let out = progress.complete_resource(&user.email, r).await.unwrap();
        events.extend(trigger.observe(out.before.as_ref(), Some(&out.after)));
    }

    // five lessons at 150 XP: the first creates the record, silently
    let summary = progress.summary(&user.email).await.unwrap();
    assert_eq!(summary.xp, 750);
    assert_eq!(summary.level, 2);
    assert_eq!(
        events.iter().filter(|e| matches!(e, ProgressEvent::LevelUp { level: 2 })).count(),
        1
    );
    assert!(events.contains(&ProgressEvent::BadgeUnlocked {
        badge: Badge::Learner
    }));
    assert_eq!(
        events.iter().filter(|e| matches!(e, ProgressEvent::XpGained { .. })).count(),
        4
    );
}

#[tokio::test]
async fn quiz_submission_persists_once_per_quiz() {
    let app = seeded(Storage::in_memory(), RetryPolicy::none()).await;
    let user = ada();
    let quizzes = app.quizzes();
    let quiz_id = first_quiz(&app).await;

    let mut session = quizzes.start(quiz_id).await.unwrap();
    let correct = correct_answers(&session);
    answer(&mut session, &correct);
    let first = quizzes.submit(&mut session, Some(&user)).await.unwrap();
    assert!(first.result.passed);
    assert!(first.persistence.is_saved());

    session.retry().unwrap();
    answer(&mut session, &correct);
    quizzes.submit(&mut session, Some(&user)).await.unwrap();

    let summary = app.progress().summary(&user.email).await.unwrap();
    assert_eq!(summary.xp, 100);

    let catalog = app.catalog();
    let quiz = catalog.quiz(quiz_id).await.unwrap();
    let status = catalog
        .statuses_for(&user.email, std::slice::from_ref(&quiz))
        .await
        .unwrap();
    assert!(status[0].completed);
    let total = session.total();
    assert_eq!(status[0].quiz_score, Some(format!("{total}/{total}")));
}

#[tokio::test]
async fn unreachable_store_is_reported_without_undoing_submission() {
    let down = Arc::new(DownAttempts::default());
    let attempts: Arc<dyn QuizAttemptRepository> = down.clone();
    let mut storage = Storage::in_memory();
    storage.attempts = attempts;
    let app = seeded(storage, RetryPolicy::new(3, Duration::ZERO)).await;
    let user = ada();
    let quizzes = app.quizzes();

    let mut session = quizzes.start(first_quiz(&app).await).await.unwrap();
    let correct = correct_answers(&session);
    answer(&mut session, &correct);
    let out = quizzes.submit(&mut session, Some(&user)).await.unwrap();

    assert!(matches!(
        out.persistence,
        PersistenceStatus::Failed(StorageError::Connection(_))
    ));
    assert_eq!(down.calls.load(Ordering::SeqCst), 3);
    assert!(session.is_submitted());
    assert_eq!(out.result.score, out.result.total);
    assert_eq!(app.progress().summary(&user.email).await.unwrap().xp, 0);
}

#[tokio::test]
async fn progress_failure_after_saved_attempt_is_reported() {
    let progress = Arc::new(ReadOnlyProgress::default());
    let progress_repo: Arc<dyn ProgressRepository> = progress.clone();
    let mut storage = Storage::in_memory();
    storage.progress = progress_repo;
    let attempts = Arc::clone(&storage.attempts);
    let app = seeded(storage, RetryPolicy::new(3, Duration::ZERO)).await;
    let user = ada();
    let quizzes = app.quizzes();

    let mut session = quizzes.start(first_quiz(&app).await).await.unwrap();
    let correct = correct_answers(&session);
    answer(&mut session, &correct);
    let out = quizzes.submit(&mut session, Some(&user)).await.unwrap();

    assert!(matches!(
        out.persistence,
        PersistenceStatus::Failed(StorageError::Connection(_))
    ));
    assert!(session.is_submitted());
    assert_eq!(out.result.score, out.result.total);
    // the attempt write is not undone
    assert_eq!(attempts.attempts_for_user(&user.email).await.unwrap().len(), 1);
    assert_eq!(progress.writes.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn sqlite_backed_dashboard() {
    let app = AppServices::new_sqlite(
        "sqlite:file:memdb_services_dashboard?mode=memory&cache=shared",
        fixed_clock(),
        Arc::new(StaticAuth::signed_in(ada())),
    )
    .await
    .unwrap();
    app.seed_demo().await.unwrap();
    let user = ada();
    let today = app.clock().today();

    let meetings = app.meetings();
    let upcoming = meetings
        .upcoming(today, &MeetingFilter::default(), Some(2))
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 2);
    assert!(meetings.register(&user.email, upcoming[1].id).await.unwrap());

    let overview = app.dashboard().overview(&user, today).await.unwrap();
    assert_eq!(overview.greeting_name, "Ada");
    assert_eq!(overview.featured.len(), 6);
    assert_eq!(overview.upcoming_meetings.len(), 1);
    assert_eq!(overview.upcoming_meetings[0].id, upcoming[1].id);
    assert_eq!(overview.summary.xp, 0);
}
