use std::sync::Arc;

use epsilon_core::model::{AttemptId, CurrentUser, QuizAttempt, ResourceId, ResourceType};
use epsilon_core::{QuizResult, QuizSession};
use storage::repository::{QuizAttemptRepository, StorageError};
use tracing::{info, warn};

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::{ProgressServiceError, QuizServiceError};
use crate::progress_service::{CompletionOutcome, ProgressService};
use crate::retry::RetryPolicy;

/// What happened to a submission in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    /// Nobody signed in; the result was scored but not stored.
    Anonymous,
    Saved {
        attempt_id: AttemptId,
        completion: CompletionOutcome,
    },
    /// The store rejected a write after retries. The session stays submitted.
    Failed(StorageError),
}

impl PersistenceStatus {
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistenceStatus::Saved { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSubmission {
    pub result: QuizResult,
    pub persistence: PersistenceStatus,
}

/// Runs quiz sessions against the catalog and records their outcome.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    catalog: CatalogService,
    attempts: Arc<dyn QuizAttemptRepository>,
    progress: ProgressService,
    retry: RetryPolicy,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: CatalogService,
        attempts: Arc<dyn QuizAttemptRepository>,
        progress: ProgressService,
    ) -> Self {
        Self {
            clock,
            catalog,
            attempts,
            progress,
            retry: RetryPolicy::default(),
        }
    }

    /// Retry policy for the attempt write and the progress update.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self.progress = self.progress.with_retry(retry);
        self
    }

    /// Open a fresh session for a quiz resource.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Catalog` for an unknown id or a resource
    /// that is not a quiz, and `QuizServiceError::Quiz` for an empty quiz.
    pub async fn start(&self, quiz_id: ResourceId) -> Result<QuizSession, QuizServiceError> {
        let resource = self.catalog.quiz(quiz_id).await?;
        Ok(QuizSession::from_resource(&resource)?)
    }

    /// Score the session and, for a signed-in user, store the attempt and then
    /// mark the quiz complete.
    ///
    /// Store failures do not undo the submission; they are reported through
    /// [`PersistenceStatus::Failed`].
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` if the session is incomplete or already
    /// submitted. No store call is made in that case.
    pub async fn submit(
        &self,
        session: &mut QuizSession,
        user: Option<&CurrentUser>,
    ) -> Result<QuizSubmission, QuizServiceError> {
        let result = session.submit()?;
        let Some(user) = user else {
            info!(quiz = %session.quiz_id(), score = result.score, "anonymous quiz submission");
            return Ok(QuizSubmission {
                result,
                persistence: PersistenceStatus::Anonymous,
            });
        };

        let attempt = QuizAttempt::from_answers(
            user.email.clone(),
            session.quiz_id(),
            result.total,
            session.attempt_answers(),
            self.clock.now(),
        )?;
        let persistence = self.persist(session, &attempt).await;

        Ok(QuizSubmission {
            result,
            persistence,
        })
    }

    async fn persist(&self, session: &QuizSession, attempt: &QuizAttempt) -> PersistenceStatus {
        let repo = self.attempts.as_ref();
        let saved = self
            .retry
            .run("attempt.append", move || repo.append_attempt(attempt))
            .await;
        let attempt_id = match saved {
            Ok(id) => id,
            Err(e) => {
                warn!(quiz = %attempt.quiz_id(), email = %attempt.user_email(), error = %e, "quiz attempt not saved");
                return PersistenceStatus::Failed(e);
            }
        };
        info!(
            quiz = %attempt.quiz_id(),
            email = %attempt.user_email(),
            score = %attempt.score_label(),
            "quiz attempt saved"
        );

        match self
            .progress
            .record_completion(
                attempt.user_email(),
                ResourceType::Quiz,
                session.quiz_id(),
                session.xp_reward(),
            )
            .await
        {
            Ok(completion) => PersistenceStatus::Saved {
                attempt_id,
                completion,
            },
            Err(ProgressServiceError::Storage(e)) => {
                warn!(
                    quiz = %attempt.quiz_id(),
                    %attempt_id,
                    error = %e,
                    "attempt saved but progress not updated"
                );
                PersistenceStatus::Failed(e)
            }
        }
    }
}
