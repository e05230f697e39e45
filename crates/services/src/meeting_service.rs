use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use epsilon_core::calendar;
use epsilon_core::model::{Meeting, MeetingDraft, MeetingFilter, MeetingId, UserEmail};
use serde::Serialize;
use storage::repository::{MeetingRepository, RegistrationRepository, StorageError};
use tracing::{debug, info};

use crate::error::MeetingServiceError;

/// One calendar month: the cell layout plus the meetings on each day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    /// Leading `None` cells pad the first week (weeks start on Sunday).
    pub cells: Vec<Option<u32>>,
    pub meetings: BTreeMap<u32, Vec<Meeting>>,
}

impl MonthView {
    #[must_use]
    pub fn meetings_on(&self, day: u32) -> &[Meeting] {
        self.meetings.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Scheduling and registration for live sessions.
#[derive(Clone)]
pub struct MeetingService {
    meetings: Arc<dyn MeetingRepository>,
    registrations: Arc<dyn RegistrationRepository>,
}

impl MeetingService {
    #[must_use]
    pub fn new(
        meetings: Arc<dyn MeetingRepository>,
        registrations: Arc<dyn RegistrationRepository>,
    ) -> Self {
        Self {
            meetings,
            registrations,
        }
    }

    /// # Errors
    ///
    /// Returns `MeetingServiceError::Meeting` for an invalid draft and
    /// `MeetingServiceError::Storage` if the insert fails.
    pub async fn create_meeting(&self, draft: MeetingDraft) -> Result<Meeting, MeetingServiceError> {
        let validated = draft.validate()?;
        let id = self.meetings.insert_meeting(&validated).await?;
        let meeting = validated.assign_id(id);
        info!(%id, title = %meeting.title, date = %meeting.date, "meeting created");
        Ok(meeting)
    }

    /// # Errors
    ///
    /// Returns `MeetingServiceError::NotFound` for an unknown id.
    pub async fn get(&self, id: MeetingId) -> Result<Meeting, MeetingServiceError> {
        self.meetings.get_meeting(id).await.map_err(|e| not_found(e, id))
    }

    /// Meetings dated today or later, earliest first, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns `MeetingServiceError::Storage` if meetings cannot be read.
    pub async fn upcoming(
        &self,
        today: NaiveDate,
        filter: &MeetingFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Meeting>, MeetingServiceError> {
        let meetings = self
            .meetings
            .list_meetings()
            .await?
            .into_iter()
            .filter(|m| m.is_upcoming(today) && filter.matches(m))
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Ok(meetings)
    }

    /// # Errors
    ///
    /// Returns `MeetingServiceError::Storage` if meetings cannot be read.
    pub async fn on_date(
        &self,
        date: NaiveDate,
        filter: &MeetingFilter,
    ) -> Result<Vec<Meeting>, MeetingServiceError> {
        Ok(self
            .meetings
            .list_meetings()
            .await?
            .into_iter()
            .filter(|m| m.date == date && filter.matches(m))
            .collect())
    }

    /// Register the user. Returns `false` if they already were.
    ///
    /// # Errors
    ///
    /// Returns `MeetingServiceError::NotFound` for an unknown meeting.
    pub async fn register(
        &self,
        email: &UserEmail,
        id: MeetingId,
    ) -> Result<bool, MeetingServiceError> {
        let added = self
            .registrations
            .register(email, id)
            .await
            .map_err(|e| not_found(e, id))?;
        if added {
            info!(%email, meeting = %id, "registered for meeting");
        } else {
            debug!(%email, meeting = %id, "already registered");
        }
        Ok(added)
    }

    /// Returns `false` if the user was not registered.
    ///
    /// # Errors
    ///
    /// Returns `MeetingServiceError::Storage` if the store cannot be written.
    pub async fn unregister(
        &self,
        email: &UserEmail,
        id: MeetingId,
    ) -> Result<bool, MeetingServiceError> {
        let removed = self.registrations.unregister(email, id).await?;
        if removed {
            info!(%email, meeting = %id, "unregistered from meeting");
        }
        Ok(removed)
    }

    /// Upcoming meetings the user registered for, earliest first.
    ///
    /// # Errors
    ///
    /// Returns `MeetingServiceError::Storage` if the store cannot be read.
    pub async fn registered_upcoming(
        &self,
        email: &UserEmail,
        today: NaiveDate,
    ) -> Result<Vec<Meeting>, MeetingServiceError> {
        let ids: HashSet<MeetingId> = self
            .registrations
            .registrations_for_user(email)
            .await?
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.upcoming(today, &MeetingFilter::default(), None)
            .await
            .map(|all| all.into_iter().filter(|m| ids.contains(&m.id)).collect())
    }

    /// Calendar layout of a month with its (filtered) meetings grouped by day.
    ///
    /// # Errors
    ///
    /// Returns `MeetingServiceError::InvalidMonth` for a month outside 1..=12.
    pub async fn month_view(
        &self,
        year: i32,
        month: u32,
        filter: &MeetingFilter,
    ) -> Result<MonthView, MeetingServiceError> {
        let cells = calendar::month_days(year, month)
            .ok_or(MeetingServiceError::InvalidMonth { year, month })?;

        let mut meetings: BTreeMap<u32, Vec<Meeting>> = BTreeMap::new();
        for m in self.meetings.list_meetings().await? {
            if m.date.year() == year && m.date.month() == month && filter.matches(&m) {
                meetings.entry(m.date.day()).or_default().push(m);
            }
        }

        Ok(MonthView {
            year,
            month,
            cells,
            meetings,
        })
    }
}

fn not_found(e: StorageError, id: MeetingId) -> MeetingServiceError {
    match e {
        StorageError::NotFound => MeetingServiceError::NotFound(id),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use epsilon_core::model::{Category, MeetingError, MeetingType};
    use storage::repository::InMemoryRepository;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn draft(title: &str, date: NaiveDate, hour: u32) -> MeetingDraft {
        MeetingDraft::new(
            title,
            "Sarah Johnson",
            date,
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            "meet.example.com/room",
        )
    }

    fn service() -> MeetingService {
        let repo = Arc::new(InMemoryRepository::new());
        MeetingService::new(repo.clone(), repo)
    }

    fn ada() -> UserEmail {
        UserEmail::new("ada@example.com").unwrap()
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let svc = service();
        let err = svc.create_meeting(draft("  ", day(20), 9)).await.unwrap_err();
        assert!(matches!(
            err,
            MeetingServiceError::Meeting(MeetingError::EmptyTitle)
        ));
    }

    #[tokio::test]
    async fn upcoming_is_sorted_filtered_and_limited() {
        let svc = service();
        svc.create_meeting(draft("past", day(1), 9)).await.unwrap();
        svc.create_meeting(draft("late", day(20), 18)).await.unwrap();
        svc.create_meeting(draft("early", day(20), 8)).await.unwrap();
        let mut study = draft("study", day(25), 10);
        study.meeting_type = MeetingType::GroupStudy;
        study.category = Category::Finance;
        svc.create_meeting(study).await.unwrap();

        let all = svc
            .upcoming(day(16), &MeetingFilter::default(), None)
            .await
            .unwrap();
        let titles: Vec<_> = all.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["early", "late", "study"]);

        let limited = svc
            .upcoming(day(16), &MeetingFilter::default(), Some(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        let groups = svc
            .upcoming(
                day(16),
                &MeetingFilter {
                    meeting_type: Some(MeetingType::GroupStudy),
                    ..MeetingFilter::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].category, Category::Finance);

        let on_day = svc.on_date(day(20), &MeetingFilter::default()).await.unwrap();
        assert_eq!(on_day.len(), 2);
    }

    #[tokio::test]
    async fn registration_flow() {
        let svc = service();
        let past = svc.create_meeting(draft("past", day(1), 9)).await.unwrap();
        let next = svc.create_meeting(draft("next", day(21), 9)).await.unwrap();

        assert!(svc.register(&ada(), next.id).await.unwrap());
        assert!(!svc.register(&ada(), next.id).await.unwrap());
        assert!(svc.register(&ada(), past.id).await.unwrap());

        let mine = svc.registered_upcoming(&ada(), day(16)).await.unwrap();
        assert_eq!(mine.iter().map(|m| m.id).collect::<Vec<_>>(), vec![next.id]);

        assert!(svc.unregister(&ada(), next.id).await.unwrap());
        assert!(!svc.unregister(&ada(), next.id).await.unwrap());
        assert!(matches!(
            svc.register(&ada(), MeetingId::new(404)).await,
            Err(MeetingServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn month_view_groups_by_day() {
        let svc = service();
        svc.create_meeting(draft("a", day(20), 9)).await.unwrap();
        svc.create_meeting(draft("b", day(20), 11)).await.unwrap();
        svc.create_meeting(
            draft("november", NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(), 9),
        )
        .await
        .unwrap();

        let view = svc
            .month_view(2026, 10, &MeetingFilter::default())
            .await
            .unwrap();
        // October 2026 starts on a Thursday
        assert_eq!(view.cells.iter().take_while(|c| c.is_none()).count(), 4);
        assert_eq!(view.meetings_on(20).len(), 2);
        assert!(view.meetings_on(2).is_empty());
        assert_eq!(view.meetings.len(), 1);

        assert!(matches!(
            svc.month_view(2026, 13, &MeetingFilter::default()).await,
            Err(MeetingServiceError::InvalidMonth { month: 13, .. })
        ));
    }
}
