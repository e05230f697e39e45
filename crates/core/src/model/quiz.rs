use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ResourceId, UserEmail};

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizQuestionError {
    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("a question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("correct answer {index} is out of range for {options} options")]
    CorrectAnswerOutOfRange { index: usize, options: usize },
}

/// Multiple-choice question. `correct_answer` indexes into `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuizQuestion")]
pub struct QuizQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: String,
}

#[derive(Deserialize)]
struct RawQuizQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    #[serde(default)]
    explanation: String,
}

impl TryFrom<RawQuizQuestion> for QuizQuestion {
    type Error = QuizQuestionError;

    fn try_from(raw: RawQuizQuestion) -> Result<Self, Self::Error> {
        Self::new(raw.question, raw.options, raw.correct_answer, raw.explanation)
    }
}

impl QuizQuestion {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuizQuestionError` if the text is blank, fewer than two options
    /// are given, or `correct_answer` does not index an option.
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, QuizQuestionError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(QuizQuestionError::EmptyQuestion);
        }
        if options.len() < 2 {
            return Err(QuizQuestionError::TooFewOptions(options.len()));
        }
        if correct_answer >= options.len() {
            return Err(QuizQuestionError::CorrectAnswerOutOfRange {
                index: correct_answer,
                options: options.len(),
            });
        }
        Ok(Self {
            question,
            options,
            correct_answer,
            explanation: explanation.into(),
        })
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> usize {
        self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_answer
    }
}

//
// ─── ATTEMPTS ──────────────────────────────────────────────────────────────────
//

/// One answered question inside a persisted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_index: usize,
    pub selected_answer: usize,
    pub correct: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("score ({score}) exceeds total questions ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("too many answers for a single attempt: {len}")]
    TooManyAnswers { len: usize },
}

/// Immutable record of a submitted quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizAttempt {
    user_email: UserEmail,
    quiz_id: ResourceId,
    score: u32,
    total_questions: u32,
    answers: Vec<AnswerRecord>,
    completed_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// Build an attempt, deriving the score from the per-question answers.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the answer count does not fit in `u32` or the
    /// derived score exceeds `total_questions`.
    pub fn from_answers(
        user_email: UserEmail,
        quiz_id: ResourceId,
        total_questions: u32,
        answers: Vec<AnswerRecord>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        let correct = answers.iter().filter(|a| a.correct).count();
        let score = u32::try_from(correct).map_err(|_| AttemptError::TooManyAnswers {
            len: answers.len(),
        })?;
        Self::from_persisted(
            user_email,
            quiz_id,
            score,
            total_questions,
            answers,
            completed_at,
        )
    }

    /// Rehydrate an attempt from storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::ScoreExceedsTotal` if the stored score is larger than
    /// the question count.
    pub fn from_persisted(
        user_email: UserEmail,
        quiz_id: ResourceId,
        score: u32,
        total_questions: u32,
        answers: Vec<AnswerRecord>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if score > total_questions {
            return Err(AttemptError::ScoreExceedsTotal {
                score,
                total: total_questions,
            });
        }
        Ok(Self {
            user_email,
            quiz_id,
            score,
            total_questions,
            answers,
            completed_at,
        })
    }

    #[must_use]
    pub fn user_email(&self) -> &UserEmail {
        &self.user_email
    }

    #[must_use]
    pub fn quiz_id(&self) -> ResourceId {
        self.quiz_id
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Compact "score/total" label shown next to a quiz in the catalog.
    #[must_use]
    pub fn score_label(&self) -> String {
        format!("{}/{}", self.score, self.total_questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("option {i}")).collect()
    }

    #[test]
    fn question_validates_correct_answer_index() {
        let err = QuizQuestion::new("2 + 2?", options(3), 3, "").unwrap_err();
        assert_eq!(
            err,
            QuizQuestionError::CorrectAnswerOutOfRange {
                index: 3,
                options: 3
            }
        );
        assert!(matches!(
            QuizQuestion::new("  ", options(2), 0, ""),
            Err(QuizQuestionError::EmptyQuestion)
        ));
        assert!(matches!(
            QuizQuestion::new("Only one?", options(1), 0, ""),
            Err(QuizQuestionError::TooFewOptions(1))
        ));
    }

    #[test]
    fn deserializing_a_question_runs_validation() {
        let bad = r#"{"question":"Q","options":["a","b"],"correct_answer":5}"#;
        assert!(serde_json::from_str::<QuizQuestion>(bad).is_err());

        let good = r#"{"question":"Q","options":["a","b"],"correct_answer":1}"#;
        let q: QuizQuestion = serde_json::from_str(good).unwrap();
        assert_eq!(q.correct_answer(), 1);
        assert_eq!(q.explanation(), "");
    }

    #[test]
    fn attempt_score_is_derived_from_answers() {
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
        let attempt = QuizAttempt::from_answers(
            UserEmail::new("ada@example.com").unwrap(),
            ResourceId::new(9),
            2,
            answers,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(attempt.score(), 1);
        assert_eq!(attempt.score_label(), "1/2");
    }

    #[test]
    fn persisted_score_cannot_exceed_total() {
        let err = QuizAttempt::from_persisted(
            UserEmail::new("ada@example.com").unwrap(),
            ResourceId::new(9),
            4,
            3,
            vec![],
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::ScoreExceedsTotal { score: 4, total: 3 });
    }
}
