use std::sync::Arc;

use epsilon_core::evaluator::{self, ProgressSummary, QuizStats};
use epsilon_core::model::{
    CurrentUser, ProgressRecord, Resource, ResourceId, ResourceType, UserEmail,
};
use serde::Serialize;
use storage::repository::{
    ProgressEntry, ProgressPatch, ProgressRepository, QuizAttemptRepository, StorageError,
};
use tracing::{debug, info};

use crate::error::ProgressServiceError;
use crate::retry::RetryPolicy;

/// Result of recording a completion.
///
/// `before` is `None` when the record was created by this completion, so a
/// notification trigger fed with it stays silent for a first activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    pub newly_completed: bool,
    pub xp_awarded: u32,
    pub before: Option<ProgressRecord>,
    pub after: ProgressRecord,
}

/// The learner's profile: evaluated progress, completions per kind and quiz
/// statistics over every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub user: CurrentUser,
    pub summary: ProgressSummary,
    pub lessons: usize,
    pub quizzes: usize,
    pub videos: usize,
    pub quiz_stats: QuizStats,
}

/// Reads and writes a user's progress record.
#[derive(Clone)]
pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    retry: RetryPolicy,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
    ) -> Self {
        Self {
            progress,
            attempts,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The stored record, or a default one when the user has none yet. Nothing
    /// is written.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be queried.
    pub async fn snapshot(&self, email: &UserEmail) -> Result<ProgressRecord, ProgressServiceError> {
        let entry = self.progress.find_by_email(email).await?;
        Ok(entry.map_or_else(|| ProgressRecord::new(email.clone()), |e| e.record))
    }

    /// The stored record, creating an empty one (no XP, no badges) if missing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be queried
    /// or written.
    pub async fn load_or_create(
        &self,
        email: &UserEmail,
    ) -> Result<ProgressEntry, ProgressServiceError> {
        if let Some(entry) = self.progress.find_by_email(email).await? {
            return Ok(entry);
        }

        let record = ProgressRecord::new(email.clone());
        let repo = self.progress.as_ref();
        let created = self
            .retry
            .run("progress.create", {
                let record = &record;
                move || repo.create(record)
            })
            .await;

        match created {
            Ok(id) => {
                debug!(%email, %id, "created empty progress record");
                Ok(ProgressEntry { id, record })
            }
            // created concurrently by another writer
            Err(StorageError::Conflict) => self
                .progress
                .find_by_email(email)
                .await?
                .ok_or(ProgressServiceError::Storage(StorageError::NotFound)),
            Err(e) => Err(e.into()),
        }
    }

    /// Evaluated progress for the user (see [`evaluator::evaluate`]).
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be queried.
    pub async fn summary(&self, email: &UserEmail) -> Result<ProgressSummary, ProgressServiceError> {
        let entry = self.progress.find_by_email(email).await?;
        Ok(evaluator::evaluate(entry.as_ref().map(|e| &e.record)))
    }

    /// Profile semantics: a user without a record is shown as new, and nothing
    /// is written.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be queried.
    pub async fn profile(&self, user: &CurrentUser) -> Result<ProfileView, ProgressServiceError> {
        let record = self.snapshot(&user.email).await?;
        let attempts = self.attempts.attempts_for_user(&user.email).await?;
        Ok(ProfileView {
            user: user.clone(),
            summary: evaluator::evaluate(Some(&record)),
            lessons: record.completed_lessons().len(),
            quizzes: record.completed_quizzes().len(),
            videos: record.completed_videos().len(),
            quiz_stats: evaluator::quiz_stats(&attempts),
        })
    }

    /// Mark a resource complete, awarding its XP the first time. Downloads
    /// always earn the flat download reward, whatever the resource configures.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be queried
    /// or written.
    pub async fn complete_resource(
        &self,
        email: &UserEmail,
        resource: &Resource,
    ) -> Result<CompletionOutcome, ProgressServiceError> {
        let kind = resource.resource_type();
        let reward = match kind {
            ResourceType::Download => kind.default_xp_reward(),
            _ => resource.xp_reward(),
        };
        self.record_completion(email, kind, resource.id(), reward)
            .await
    }

    /// Record a completion of `id` in the set for `kind`.
    ///
    /// A user without a record gets one holding this completion, its reward,
    /// the starter badge and a one-day streak. An already completed resource
    /// changes nothing and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be queried
    /// or written.
    pub async fn record_completion(
        &self,
        email: &UserEmail,
        kind: ResourceType,
        id: ResourceId,
        reward: u32,
    ) -> Result<CompletionOutcome, ProgressServiceError> {
        let repo = self.progress.as_ref();

        let Some(entry) = repo.find_by_email(email).await? else {
            let mut record = ProgressRecord::first_activity(email.clone());
            record.record_completion(kind, id, reward);
            record.refresh_badges();
            self.retry
                .run("progress.create", {
                    let record = &record;
                    move || repo.create(record)
                })
                .await?;
            info!(%email, %kind, resource = %id, xp = reward, "first completion recorded");
            return Ok(CompletionOutcome {
                newly_completed: true,
                xp_awarded: reward,
                before: None,
                after: record,
            });
        };

        let before = entry.record;
        let mut after = before.clone();
        if !after.record_completion(kind, id, reward) {
            debug!(%email, %kind, resource = %id, "already completed, no xp awarded");
            return Ok(CompletionOutcome {
                newly_completed: false,
                xp_awarded: 0,
                before: Some(before),
                after,
            });
        }
        after.refresh_badges();

        let patch = ProgressPatch::after_completion(kind, &after);
        self.retry
            .run("progress.update", {
                let patch = &patch;
                let progress_id = entry.id;
                move || repo.update(progress_id, patch)
            })
            .await?;
        info!(%email, %kind, resource = %id, xp = after.xp(), "completion recorded");

        Ok(CompletionOutcome {
            newly_completed: true,
            xp_awarded: after.xp() - before.xp(),
            before: Some(before),
            after,
        })
    }
}
