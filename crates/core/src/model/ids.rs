use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Declares a `u64`-backed identifier with the usual conversions.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

numeric_id!(
    /// Identifier of a catalog resource (lesson, quiz, video or download).
    ResourceId
);
numeric_id!(
    /// Identifier assigned by the progress store to a user's record.
    ProgressId
);
numeric_id!(
    /// Identifier of a persisted quiz attempt.
    AttemptId
);
numeric_id!(
    /// Identifier of a scheduled live meeting.
    MeetingId
);

/// Error type for parsing an ID from a string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse {kind} from string")]
pub struct ParseIdError {
    kind: &'static str,
}

// ─── User Email ────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserEmailError {
    #[error("email cannot be empty")]
    Empty,

    #[error("invalid email address: {0}")]
    Invalid(String),
}

/// Normalized (trimmed, lower-cased) email that keys a user's progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserEmail(String);

impl UserEmail {
    /// Parse and normalize an email address.
    ///
    /// # Errors
    ///
    /// Returns `UserEmailError::Empty` for blank input and
    /// `UserEmailError::Invalid` when the local part or domain is missing.
    pub fn new(value: impl Into<String>) -> Result<Self, UserEmailError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UserEmailError::Empty);
        }

        match trimmed.split_once('@') {
            Some((local, domain))
                if !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !trimmed.contains(char::is_whitespace) =>
            {
                Ok(Self(trimmed.to_lowercase()))
            }
            _ => Err(UserEmailError::Invalid(trimmed.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserEmail {
    type Err = UserEmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserEmail {
    type Error = UserEmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserEmail> for String {
    fn from(value: UserEmail) -> Self {
        value.0
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_display_and_parse() {
        let id = ResourceId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(" 42 ".parse::<ResourceId>().unwrap(), id);
    }

    #[test]
    fn id_parse_rejects_garbage() {
        let err = "quiz-1".parse::<MeetingId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse MeetingId from string");
    }

    #[test]
    fn debug_names_the_kind() {
        assert_eq!(format!("{:?}", AttemptId::new(7)), "AttemptId(7)");
    }

    #[test]
    fn email_is_normalized() {
        let email = UserEmail::new("  Ada@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "ada@example.com");
    }

    #[test]
    fn email_requires_local_part_and_domain() {
        assert_eq!(UserEmail::new("   "), Err(UserEmailError::Empty));
        assert!(matches!(
            UserEmail::new("no-at-sign"),
            Err(UserEmailError::Invalid(_))
        ));
        assert!(UserEmail::new("@example.com").is_err());
        assert!(UserEmail::new("ada@").is_err());
        assert!(UserEmail::new("a b@example.com").is_err());
    }
}
