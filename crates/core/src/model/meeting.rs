use chrono::{NaiveDate, NaiveTime};
use serde::{Serialize, Serializer};
use thiserror::Error;
use url::Url;

use crate::model::ids::MeetingId;
use crate::model::resource::Category;

labelled_enum! {
    pub enum MeetingType: "meeting type" {
        LiveTutoring => "live_tutoring",
        GroupStudy => "group_study",
    }
}

impl MeetingType {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            MeetingType::LiveTutoring => "Live Tutoring",
            MeetingType::GroupStudy => "Group Study",
        }
    }
}

labelled_enum! {
    pub enum Recurrence: "recurrence" {
        None => "none",
        Weekly => "weekly",
        Biweekly => "biweekly",
        Monthly => "monthly",
    }
}

//
// ─── LINK ──────────────────────────────────────────────────────────────────────
//

/// Join link for a meeting. Links typed without a scheme get `https://`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingLink(Url);

impl MeetingLink {
    /// Normalize and parse a meeting link.
    ///
    /// # Errors
    ///
    /// Returns `MeetingError::EmptyLink` for blank input and
    /// `MeetingError::InvalidLink` if the result is not a valid URL.
    pub fn parse(raw: &str) -> Result<Self, MeetingError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MeetingError::EmptyLink);
        }
        let candidate = if trimmed.starts_with("http") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        Url::parse(&candidate)
            .map(Self)
            .map_err(|e| MeetingError::InvalidLink(format!("{candidate}: {e}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl Serialize for MeetingLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MeetingError {
    #[error("meeting title cannot be empty")]
    EmptyTitle,

    #[error("teacher name cannot be empty")]
    EmptyTeacher,

    #[error("meeting duration must be > 0 minutes")]
    InvalidDuration,

    #[error("meeting link cannot be empty")]
    EmptyLink,

    #[error("invalid meeting link: {0}")]
    InvalidLink(String),
}

//
// ─── MEETING TYPES ─────────────────────────────────────────────────────────────
//

/// User-entered meeting data prior to validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingDraft {
    pub title: String,
    pub description: Option<String>,
    pub teacher_name: String,
    pub teacher_title: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub meeting_link: String,
    pub category: Category,
    pub meeting_type: MeetingType,
    pub recurring: Recurrence,
}

impl MeetingDraft {
    pub const DEFAULT_DURATION_MINUTES: u32 = 60;

    /// Draft with the form defaults: one hour, fundamentals, live tutoring,
    /// not recurring.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        teacher_name: impl Into<String>,
        date: NaiveDate,
        time: NaiveTime,
        meeting_link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            teacher_name: teacher_name.into(),
            teacher_title: None,
            date,
            time,
            duration_minutes: Self::DEFAULT_DURATION_MINUTES,
            meeting_link: meeting_link.into(),
            category: Category::Fundamentals,
            meeting_type: MeetingType::LiveTutoring,
            recurring: Recurrence::None,
        }
    }

    /// # Errors
    ///
    /// Returns `MeetingError` for a blank title or teacher, a zero duration, or
    /// an unusable link.
    pub fn validate(self) -> Result<ValidatedMeeting, MeetingError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(MeetingError::EmptyTitle);
        }
        let teacher_name = self.teacher_name.trim().to_string();
        if teacher_name.is_empty() {
            return Err(MeetingError::EmptyTeacher);
        }
        if self.duration_minutes == 0 {
            return Err(MeetingError::InvalidDuration);
        }
        let meeting_link = MeetingLink::parse(&self.meeting_link)?;

        Ok(ValidatedMeeting {
            title,
            description: self.description.filter(|d| !d.trim().is_empty()),
            teacher_name,
            teacher_title: self.teacher_title.filter(|t| !t.trim().is_empty()),
            date: self.date,
            time: self.time,
            duration_minutes: self.duration_minutes,
            meeting_link,
            category: self.category,
            meeting_type: self.meeting_type,
            recurring: self.recurring,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMeeting {
    pub title: String,
    pub description: Option<String>,
    pub teacher_name: String,
    pub teacher_title: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub meeting_link: MeetingLink,
    pub category: Category,
    pub meeting_type: MeetingType,
    pub recurring: Recurrence,
}

impl ValidatedMeeting {
    #[must_use]
    pub fn assign_id(self, id: MeetingId) -> Meeting {
        Meeting {
            id,
            title: self.title,
            description: self.description,
            teacher_name: self.teacher_name,
            teacher_title: self.teacher_title,
            date: self.date,
            time: self.time,
            duration_minutes: self.duration_minutes,
            meeting_link: self.meeting_link,
            category: self.category,
            meeting_type: self.meeting_type,
            recurring: self.recurring,
        }
    }
}

/// A scheduled live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub title: String,
    pub description: Option<String>,
    pub teacher_name: String,
    pub teacher_title: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub meeting_link: MeetingLink,
    pub category: Category,
    pub meeting_type: MeetingType,
    pub recurring: Recurrence,
}

impl Meeting {
    #[must_use]
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.date >= today
    }
}

/// Optional category / type constraints applied to meeting listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeetingFilter {
    pub category: Option<Category>,
    pub meeting_type: Option<MeetingType>,
}

impl MeetingFilter {
    #[must_use]
    pub fn matches(&self, meeting: &Meeting) -> bool {
        self.category.is_none_or(|c| c == meeting.category)
            && self.meeting_type.is_none_or(|t| t == meeting.meeting_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(link: &str) -> MeetingDraft {
        MeetingDraft::new(
            "Cash flow clinic",
            "Prof. Michael Chen",
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            link,
        )
    }

    #[test]
    fn link_without_scheme_gets_https() {
        let link = MeetingLink::parse("meet.example.com/abc").unwrap();
        assert_eq!(link.as_str(), "https://meet.example.com/abc");

        let kept = MeetingLink::parse("http://zoom.example.com/j/1").unwrap();
        assert_eq!(kept.url().scheme(), "http");
    }

    #[test]
    fn blank_link_is_rejected() {
        assert_eq!(MeetingLink::parse("  "), Err(MeetingError::EmptyLink));
    }

    #[test]
    fn validate_applies_defaults_and_checks_fields() {
        let meeting = draft("meet.example.com/x")
            .validate()
            .unwrap()
            .assign_id(MeetingId::new(3));
        assert_eq!(meeting.duration_minutes, 60);
        assert_eq!(meeting.meeting_type, MeetingType::LiveTutoring);
        assert_eq!(meeting.recurring, Recurrence::None);

        let mut no_teacher = draft("meet.example.com/x");
        no_teacher.teacher_name = " ".into();
        assert_eq!(no_teacher.validate(), Err(MeetingError::EmptyTeacher));

        let mut zero = draft("meet.example.com/x");
        zero.duration_minutes = 0;
        assert_eq!(zero.validate(), Err(MeetingError::InvalidDuration));
    }

    #[test]
    fn filter_is_conjunctive() {
        let meeting = draft("meet.example.com/x")
            .validate()
            .unwrap()
            .assign_id(MeetingId::new(1));
        assert!(MeetingFilter::default().matches(&meeting));
        let filter = MeetingFilter {
            category: Some(Category::Fundamentals),
            meeting_type: Some(MeetingType::GroupStudy),
        };
        assert!(!filter.matches(&meeting));
    }

    #[test]
    fn group_study_label_parses() {
        assert_eq!(
            "group_study".parse::<MeetingType>().unwrap(),
            MeetingType::GroupStudy
        );
        assert_eq!("monthly".parse::<Recurrence>().unwrap(), Recurrence::Monthly);
    }
}
