use thiserror::Error;

/// Error returned when a stored or user-supplied label does not name a variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// Fieldless enum with a stable snake_case label, `Display` and `FromStr`.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::model::UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| $crate::model::UnknownLabel {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

mod badge;
mod ids;
mod meeting;
mod progress;
mod quiz;
mod resource;
mod user;

pub use badge::{Badge, UnknownBadge};
pub use ids::{AttemptId, MeetingId, ParseIdError, ProgressId, ResourceId, UserEmail, UserEmailError};
pub use meeting::{
    Meeting, MeetingDraft, MeetingError, MeetingFilter, MeetingLink, MeetingType, Recurrence,
    ValidatedMeeting,
};
pub use progress::ProgressRecord;
pub use quiz::{AnswerRecord, AttemptError, QuizAttempt, QuizQuestion, QuizQuestionError};
pub use resource::{
    Category, Difficulty, LessonSection, Resource, ResourceError, ResourceKind, ResourceType,
};
pub use user::{CurrentUser, Theme, UserPatch};
