use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::model::{AnswerRecord, QuizQuestion, Resource, ResourceId, ResourceKind};

/// Minimum percentage for a passing result.
pub const PASS_PERCENTAGE: u32 = 70;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no questions")]
    Empty,

    #[error("resource {0} is not a quiz")]
    NotAQuiz(ResourceId),

    #[error("option {option} is out of range for question {question} ({options} options)")]
    OptionOutOfRange {
        question: usize,
        option: usize,
        options: usize,
    },

    #[error("quiz already submitted")]
    AlreadySubmitted,

    #[error("quiz has not been submitted")]
    NotSubmitted,

    #[error("answer every question before submitting ({answered}/{total} answered)")]
    Incomplete { answered: usize, total: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    InProgress {
        current: usize,
        answers: BTreeMap<usize, usize>,
    },
    Submitted {
        score: u32,
        answers: BTreeMap<usize, usize>,
    },
}

/// One learner working through one quiz.
///
/// Navigation and answering are only possible while in progress; `submit`
/// freezes the answers and computes the score, `retry` starts over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    quiz_id: ResourceId,
    questions: Vec<QuizQuestion>,
    xp_reward: u32,
    state: State,
}

impl QuizSession {
    /// # Errors
    ///
    /// Returns `QuizError::Empty` if `questions` is empty.
    pub fn new(
        quiz_id: ResourceId,
        questions: Vec<QuizQuestion>,
        xp_reward: u32,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Empty);
        }
        Ok(Self {
            quiz_id,
            questions,
            xp_reward,
            state: State::InProgress {
                current: 0,
                answers: BTreeMap::new(),
            },
        })
    }

    /// Start a session for a quiz resource.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotAQuiz` for other resource kinds and
    /// `QuizError::Empty` for a quiz without questions.
    pub fn from_resource(resource: &Resource) -> Result<Self, QuizError> {
        match resource.kind() {
            ResourceKind::Quiz { questions } => {
                Self::new(resource.id(), questions.clone(), resource.xp_reward())
            }
            _ => Err(QuizError::NotAQuiz(resource.id())),
        }
    }

    #[must_use]
    pub fn quiz_id(&self) -> ResourceId {
        self.quiz_id
    }

    #[must_use]
    pub fn xp_reward(&self) -> u32 {
        self.xp_reward
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Index of the question on screen. A submitted session reports 0.
    #[must_use]
    pub fn current(&self) -> usize {
        match &self.state {
            State::InProgress { current, .. } => *current,
            State::Submitted { .. } => 0,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> &QuizQuestion {
        &self.questions[self.current()]
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self.state, State::Submitted { .. })
    }

    #[must_use]
    pub fn answer(&self, question: usize) -> Option<usize> {
        self.answers().get(&question).copied()
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.answers().len()
    }

    fn answers(&self) -> &BTreeMap<usize, usize> {
        match &self.state {
            State::InProgress { answers, .. } | State::Submitted { answers, .. } => answers,
        }
    }

    /// Record (or overwrite) the answer to the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadySubmitted` after submission and
    /// `QuizError::OptionOutOfRange` for an invalid option index.
    pub fn select_answer(&mut self, option: usize) -> Result<(), QuizError> {
        let State::InProgress { current, answers } = &mut self.state else {
            return Err(QuizError::AlreadySubmitted);
        };
        let options = self.questions[*current].options().len();
        if option >= options {
            return Err(QuizError::OptionOutOfRange {
                question: *current,
                option,
                options,
            });
        }
        answers.insert(*current, option);
        Ok(())
    }

    /// Move by `delta` questions, clamped to the quiz bounds.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadySubmitted` after submission.
    pub fn advance(&mut self, delta: isize) -> Result<usize, QuizError> {
        let target = self.current().saturating_add_signed(delta);
        self.go_to(target)
    }

    /// # Errors
    ///
    /// Returns `QuizError::AlreadySubmitted` after submission.
    pub fn next(&mut self) -> Result<usize, QuizError> {
        self.advance(1)
    }

    /// # Errors
    ///
    /// Returns `QuizError::AlreadySubmitted` after submission.
    pub fn previous(&mut self) -> Result<usize, QuizError> {
        self.advance(-1)
    }

    /// Jump straight to `index`, clamped to the last question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadySubmitted` after submission.
    pub fn go_to(&mut self, index: usize) -> Result<usize, QuizError> {
        let last = self.questions.len() - 1;
        let State::InProgress { current, .. } = &mut self.state else {
            return Err(QuizError::AlreadySubmitted);
        };
        *current = index.min(last);
        Ok(*current)
    }

    /// Score the session. Leaves the state untouched on error.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Incomplete` while any question is unanswered and
    /// `QuizError::AlreadySubmitted` if called twice.
    pub fn submit(&mut self) -> Result<QuizResult, QuizError> {
        let State::InProgress { answers, .. } = &self.state else {
            return Err(QuizError::AlreadySubmitted);
        };
        let total = self.questions.len();
        if (0..total).any(|i| !answers.contains_key(&i)) {
            return Err(QuizError::Incomplete {
                answered: answers.len(),
                total,
            });
        }

        let answers = answers.clone();
        let score = self
            .questions
            .iter()
            .enumerate()
            .filter(|(i, q)| answers.get(i).is_some_and(|a| q.is_correct(*a)))
            .count();
        self.state = State::Submitted {
            score: u32::try_from(score).unwrap_or(u32::MAX),
            answers,
        };
        self.result().ok_or(QuizError::NotSubmitted)
    }

    /// Discard the submission and start again from the first question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotSubmitted` while still in progress.
    pub fn retry(&mut self) -> Result<(), QuizError> {
        if !self.is_submitted() {
            return Err(QuizError::NotSubmitted);
        }
        self.state = State::InProgress {
            current: 0,
            answers: BTreeMap::new(),
        };
        Ok(())
    }

    /// Per-question answer records, in question order.
    #[must_use]
    pub fn attempt_answers(&self) -> Vec<AnswerRecord> {
        self.answers()
            .iter()
            .map(|(&question_index, &selected_answer)| AnswerRecord {
                question_index,
                selected_answer,
                correct: self
                    .questions
                    .get(question_index)
                    .is_some_and(|q| q.is_correct(selected_answer)),
            })
            .collect()
    }

    /// The scored view; `None` until submitted.
    #[must_use]
    pub fn result(&self) -> Option<QuizResult> {
        let State::Submitted { score, answers } = &self.state else {
            return None;
        };
        let total = self.questions.len();
        let review = self
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| QuestionReview {
                question: q.question().to_string(),
                selected: answers.get(&i).copied(),
                correct_answer: q.correct_answer(),
                explanation: q.explanation().to_string(),
            })
            .collect();
        Some(QuizResult::new(*score, u32::try_from(total).unwrap_or(u32::MAX), review))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionReview {
    pub question: String,
    pub selected: Option<usize>,
    pub correct_answer: usize,
    pub explanation: String,
}

impl QuestionReview {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.selected == Some(self.correct_answer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizResult {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub passed: bool,
    pub review: Vec<QuestionReview>,
}

impl QuizResult {
    fn new(score: u32, total: u32, review: Vec<QuestionReview>) -> Self {
        let percentage = percentage(score, total);
        Self {
            score,
            total,
            percentage,
            passed: percentage >= PASS_PERCENTAGE,
            review,
        }
    }
}

/// `score / total` as a percentage, rounded half up.
#[must_use]
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (score * 200 + total) / (2 * total)
}
