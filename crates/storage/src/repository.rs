use async_trait::async_trait;
use epsilon_core::model::{
    AttemptId, Badge, CurrentUser, Meeting, MeetingId, ProgressId, ProgressRecord, QuizAttempt,
    Resource, ResourceId, ResourceType, UserEmail, ValidatedMeeting,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Whether retrying the same call might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// A stored progress record together with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub id: ProgressId,
    pub record: ProgressRecord,
}

/// Partial update of a progress record. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressPatch {
    pub xp: Option<u32>,
    pub completed_lessons: Option<BTreeSet<ResourceId>>,
    pub completed_quizzes: Option<BTreeSet<ResourceId>>,
    pub completed_videos: Option<BTreeSet<ResourceId>>,
    pub downloaded_resources: Option<BTreeSet<ResourceId>>,
    pub badges: Option<BTreeSet<Badge>>,
    pub streak_days: Option<u32>,
}

impl ProgressPatch {
    /// The fields touched by completing a resource of `kind`: its completion
    /// set, XP and the stored badge list.
    #[must_use]
    pub fn after_completion(kind: ResourceType, record: &ProgressRecord) -> Self {
        let mut patch = Self {
            xp: Some(record.xp()),
            badges: Some(record.stored_badges().clone()),
            ..Self::default()
        };
        let set = Some(record.completions(kind).clone());
        match kind {
            ResourceType::Lesson => patch.completed_lessons = set,
            ResourceType::Quiz => patch.completed_quizzes = set,
            ResourceType::Video => patch.completed_videos = set,
            ResourceType::Download => patch.downloaded_resources = set,
        }
        patch
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Produce the record that results from applying this patch.
    #[must_use]
    pub fn apply_to(&self, record: &ProgressRecord) -> ProgressRecord {
        ProgressRecord::from_persisted(
            record.user_email().clone(),
            self.xp.unwrap_or(record.xp()),
            pick(self.completed_lessons.as_ref(), record.completed_lessons()),
            pick(self.completed_quizzes.as_ref(), record.completed_quizzes()),
            pick(self.completed_videos.as_ref(), record.completed_videos()),
            pick(
                self.downloaded_resources.as_ref(),
                record.downloaded_resources(),
            ),
            pick(self.badges.as_ref(), record.stored_badges()),
            self.streak_days.unwrap_or(record.streak_days()),
        )
    }
}

fn pick<T: Clone>(patched: Option<&T>, current: &T) -> T {
    patched.unwrap_or(current).clone()
}

/// The progress store: one record per user, keyed by email.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user already has a record.
    async fn create(&self, record: &ProgressRecord) -> Result<ProgressId, StorageError>;

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record has this id.
    async fn update(&self, id: ProgressId, patch: &ProgressPatch) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn find_by_email(&self, email: &UserEmail)
    -> Result<Option<ProgressEntry>, StorageError>;

    /// All records, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn list(&self) -> Result<Vec<ProgressEntry>, StorageError>;
}

//
// ─── QUIZ ATTEMPTS ─────────────────────────────────────────────────────────────
//

/// Append-only log of submitted quizzes.
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<AttemptId, StorageError>;

    /// Attempts by one user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn attempts_for_user(&self, email: &UserEmail)
    -> Result<Vec<QuizAttempt>, StorageError>;
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Read access to the resource catalog, plus `upsert` for seeding.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the resource cannot be stored.
    async fn upsert_resource(&self, resource: &Resource) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_resource(&self, id: ResourceId) -> Result<Resource, StorageError>;

    /// All resources, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn list_resources(&self) -> Result<Vec<Resource>, StorageError>;
}

//
// ─── MEETINGS ──────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait MeetingRepository: Send + Sync {
    /// Store a meeting and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the meeting cannot be stored.
    async fn insert_meeting(&self, meeting: &ValidatedMeeting) -> Result<MeetingId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_meeting(&self, id: MeetingId) -> Result<Meeting, StorageError>;

    /// All meetings ordered by date, time, then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn list_meetings(&self) -> Result<Vec<Meeting>, StorageError>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Register a user; returns `false` if they were already registered.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the meeting does not exist.
    async fn register(&self, email: &UserEmail, meeting: MeetingId) -> Result<bool, StorageError>;

    /// Remove a registration; returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be updated.
    async fn unregister(&self, email: &UserEmail, meeting: MeetingId)
    -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn registrations_for_user(
        &self,
        email: &UserEmail,
    ) -> Result<Vec<MeetingId>, StorageError>;
}

//
// ─── PROFILES ──────────────────────────────────────────────────────────────────
//

/// Display name and theme kept for each user who changed them.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, email: &UserEmail) -> Result<Option<CurrentUser>, StorageError>;

    /// Insert or replace the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn save_profile(&self, user: &CurrentUser) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<BTreeMap<ProgressId, ProgressRecord>>>,
    attempts: Arc<Mutex<BTreeMap<AttemptId, QuizAttempt>>>,
    resources: Arc<Mutex<BTreeMap<ResourceId, Resource>>>,
    meetings: Arc<Mutex<BTreeMap<MeetingId, Meeting>>>,
    registrations: Arc<Mutex<BTreeSet<(UserEmail, MeetingId)>>>,
    profiles: Arc<Mutex<BTreeMap<UserEmail, CurrentUser>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

fn next_key<K, V>(map: &BTreeMap<K, V>, value: impl Fn(&K) -> u64) -> u64 {
    map.keys().next_back().map_or(1, |k| value(k) + 1)
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn create(&self, record: &ProgressRecord) -> Result<ProgressId, StorageError> {
        let mut guard = lock(&self.progress)?;
        if guard.values().any(|r| r.user_email() == record.user_email()) {
            return Err(StorageError::Conflict);
        }
        let id = ProgressId::new(next_key(&guard, ProgressId::value));
        guard.insert(id, record.clone());
        Ok(id)
    }

    async fn update(&self, id: ProgressId, patch: &ProgressPatch) -> Result<(), StorageError> {
        let mut guard = lock(&self.progress)?;
        let record = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        *record = patch.apply_to(record);
        Ok(())
    }

    async fn find_by_email(
        &self,
        email: &UserEmail,
    ) -> Result<Option<ProgressEntry>, StorageError> {
        let guard = lock(&self.progress)?;
        Ok(guard
            .iter()
            .find(|(_, r)| r.user_email() == email)
            .map(|(id, r)| ProgressEntry {
                id: *id,
                record: r.clone(),
            }))
    }

    async fn list(&self) -> Result<Vec<ProgressEntry>, StorageError> {
        let guard = lock(&self.progress)?;
        Ok(guard
            .iter()
            .map(|(id, r)| ProgressEntry {
                id: *id,
                record: r.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<AttemptId, StorageError> {
        let mut guard = lock(&self.attempts)?;
        let id = AttemptId::new(next_key(&guard, AttemptId::value));
        guard.insert(id, attempt.clone());
        Ok(id)
    }

    async fn attempts_for_user(
        &self,
        email: &UserEmail,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let guard = lock(&self.attempts)?;
        let mut attempts: Vec<QuizAttempt> = guard
            .values()
            .filter(|a| a.user_email() == email)
            .cloned()
            .collect();
        // stable: ties keep insertion (id) order
        attempts.sort_by_key(QuizAttempt::completed_at);
        Ok(attempts)
    }
}

#[async_trait]
impl ResourceRepository for InMemoryRepository {
    async fn upsert_resource(&self, resource: &Resource) -> Result<(), StorageError> {
        lock(&self.resources)?.insert(resource.id(), resource.clone());
        Ok(())
    }

    async fn get_resource(&self, id: ResourceId) -> Result<Resource, StorageError> {
        lock(&self.resources)?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, StorageError> {
        Ok(lock(&self.resources)?.values().cloned().collect())
    }
}

#[async_trait]
impl MeetingRepository for InMemoryRepository {
    async fn insert_meeting(&self, meeting: &ValidatedMeeting) -> Result<MeetingId, StorageError> {
        let mut guard = lock(&self.meetings)?;
        let id = MeetingId::new(next_key(&guard, MeetingId::value));
        guard.insert(id, meeting.clone().assign_id(id));
        Ok(id)
    }

    async fn get_meeting(&self, id: MeetingId) -> Result<Meeting, StorageError> {
        lock(&self.meetings)?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_meetings(&self) -> Result<Vec<Meeting>, StorageError> {
        let mut meetings: Vec<Meeting> = lock(&self.meetings)?.values().cloned().collect();
        meetings.sort_by_key(|m| (m.date, m.time, m.id));
        Ok(meetings)
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryRepository {
    async fn register(&self, email: &UserEmail, meeting: MeetingId) -> Result<bool, StorageError> {
        if !lock(&self.meetings)?.contains_key(&meeting) {
            return Err(StorageError::NotFound);
        }
        Ok(lock(&self.registrations)?.insert((email.clone(), meeting)))
    }

    async fn unregister(
        &self,
        email: &UserEmail,
        meeting: MeetingId,
    ) -> Result<bool, StorageError> {
        Ok(lock(&self.registrations)?.remove(&(email.clone(), meeting)))
    }

    async fn registrations_for_user(
        &self,
        email: &UserEmail,
    ) -> Result<Vec<MeetingId>, StorageError> {
        Ok(lock(&self.registrations)?
            .iter()
            .filter(|(e, _)| e == email)
            .map(|(_, id)| *id)
            .collect())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn find_profile(&self, email: &UserEmail) -> Result<Option<CurrentUser>, StorageError> {
        Ok(lock(&self.profiles)?.get(email).cloned())
    }

    async fn save_profile(&self, user: &CurrentUser) -> Result<(), StorageError> {
        lock(&self.profiles)?.insert(user.email.clone(), user.clone());
        Ok(())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
    pub resources: Arc<dyn ResourceRepository>,
    pub meetings: Arc<dyn MeetingRepository>,
    pub registrations: Arc<dyn RegistrationRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            progress: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            resources: Arc::new(repo.clone()),
            meetings: Arc::new(repo.clone()),
            registrations: Arc::new(repo.clone()),
            profiles: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use epsilon_core::model::{AnswerRecord, MeetingDraft, Theme};
    use epsilon_core::time::fixed_now;

    fn email(s: &str) -> UserEmail {
        UserEmail::new(s).unwrap()
    }

    #[tokio::test]
    async fn saving_a_profile_replaces_the_previous_one() {
        let repo = InMemoryRepository::new();
        let ada = email("ada@example.com");
        repo.save_profile(&CurrentUser::new(ada.clone())).await.unwrap();

        let mut edited = CurrentUser::new(ada.clone()).with_full_name("Ada");
        edited.theme = Theme::Dark;
        repo.save_profile(&edited).await.unwrap();

        assert_eq!(repo.find_profile(&ada).await.unwrap(), Some(edited));
        assert!(repo.find_profile(&email("bob@example.com")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_rejects_second_record_for_same_user() {
        let repo = InMemoryRepository::new();
        let record = ProgressRecord::first_activity(email("ada@example.com"));
        let id = repo.create(&record).await.unwrap();
        assert_eq!(id, ProgressId::new(1));
        assert_eq!(repo.create(&record).await, Err(StorageError::Conflict));
    }

    #[tokio::test]
    async fn patch_only_touches_given_fields() {
        let repo = InMemoryRepository::new();
        let mut record = ProgressRecord::first_activity(email("ada@example.com"));
        let id = repo.create(&record).await.unwrap();

        record.record_completion(ResourceType::Video, ResourceId::new(9), 75);
        record.refresh_badges();
        let patch = ProgressPatch::after_completion(ResourceType::Video, &record);
        assert!(patch.completed_lessons.is_none());
        repo.update(id, &patch).await.unwrap();

        let stored = repo
            .find_by_email(&email("ada@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.record.xp(), 75);
        assert_eq!(stored.record.streak_days(), 1);
        assert!(stored.record.stored_badges().contains(&Badge::Starter));
        assert_eq!(
            repo.update(ProgressId::new(99), &patch).await,
            Err(StorageError::NotFound)
        );
    }

    #[tokio::test]
    async fn attempts_are_scoped_to_user() {
        let repo = InMemoryRepository::new();
        let answers = vec![AnswerRecord {
            question_index: 0,
            selected_answer: 1,
            correct: true,
        }];
        for who in ["ada@example.com", "bob@example.com"] {
            let attempt =
                QuizAttempt::from_answers(email(who), ResourceId::new(3), 1, answers.clone(), fixed_now())
                    .unwrap();
            repo.append_attempt(&attempt).await.unwrap();
        }
        let mine = repo
            .attempts_for_user(&email("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].score_label(), "1/1");
    }

    #[tokio::test]
    async fn registration_is_idempotent() {
        let repo = InMemoryRepository::new();
        let meeting = MeetingDraft::new(
            "Office hours",
            "Dr. Sarah Johnson",
            NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            "meet.example.com/oh",
        )
        .validate()
        .unwrap();
        let id = repo.insert_meeting(&meeting).await.unwrap();
        let ada = email("ada@example.com");

        assert!(repo.register(&ada, id).await.unwrap());
        assert!(!repo.register(&ada, id).await.unwrap());
        assert_eq!(repo.registrations_for_user(&ada).await.unwrap(), vec![id]);
        assert!(repo.unregister(&ada, id).await.unwrap());
        assert!(!repo.unregister(&ada, id).await.unwrap());
        assert_eq!(
            repo.register(&ada, MeetingId::new(42)).await,
            Err(StorageError::NotFound)
        );
    }

    #[test]
    fn only_connection_errors_are_transient() {
        assert!(StorageError::Connection("busy".into()).is_transient());
        assert!(!StorageError::NotFound.is_transient());
        assert!(!StorageError::Serialization("bad".into()).is_transient());
    }
}
