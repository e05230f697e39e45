use epsilon_core::model::{AttemptId, QuizAttempt, UserEmail};

use super::SqliteRepository;
use super::mapping::{attempt_id_from_i64, db, id_to_i64, map_attempt_row, to_json};
use crate::repository::{QuizAttemptRepository, StorageError};

#[async_trait::async_trait]
impl QuizAttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<AttemptId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_attempts (
                    user_email, quiz_id, score, total_questions, answers, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(attempt.user_email().as_str())
        .bind(id_to_i64("quiz_id", attempt.quiz_id().value())?)
        .bind(i64::from(attempt.score()))
        .bind(i64::from(attempt.total_questions()))
        .bind(to_json(attempt.answers())?)
        .bind(attempt.completed_at())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        attempt_id_from_i64(res.last_insert_rowid())
    }

    async fn attempts_for_user(
        &self,
        email: &UserEmail,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_email, quiz_id, score, total_questions, answers, completed_at
                FROM quiz_attempts
                WHERE user_email = ?1
                ORDER BY completed_at ASC, id ASC
            ",
        )
        .bind(email.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter()
            .map(|row| map_attempt_row(row).map(|(_, attempt)| attempt))
            .collect()
    }
}
