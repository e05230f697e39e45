//! Demo catalog and meeting schedule for local use.

use chrono::{Days, NaiveDate, NaiveTime};
use epsilon_core::model::{
    Category, Difficulty, MeetingDraft, MeetingError, MeetingType, Recurrence, Resource,
    ResourceError, ResourceId, ResourceKind,
};
use serde::Deserialize;
use storage::repository::{Storage, StorageError};
use thiserror::Error;
use tracing::info;

const DEMO_CATALOG: &str = include_str!("../data/demo_catalog.json");

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error("demo catalog is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Meeting(#[from] MeetingError),
    #[error("meeting date out of range: {0} days from {1}")]
    DateOutOfRange(u64, NaiveDate),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub resources: usize,
    pub meetings: usize,
}

#[derive(Deserialize)]
struct DemoCatalog {
    resources: Vec<SeedResource>,
    meetings: Vec<SeedMeeting>,
}

#[derive(Deserialize)]
struct SeedResource {
    id: u64,
    title: String,
    description: Option<String>,
    category: Category,
    difficulty: Difficulty,
    xp_reward: Option<u32>,
    duration_minutes: Option<u32>,
    #[serde(flatten)]
    kind: ResourceKind,
}

impl TryFrom<SeedResource> for Resource {
    type Error = ResourceError;

    fn try_from(s: SeedResource) -> Result<Self, Self::Error> {
        Ok(Resource::new(
            ResourceId::new(s.id),
            s.title,
            s.description,
            s.category,
            s.difficulty,
            s.kind,
        )?
        .with_xp_reward(s.xp_reward)
        .with_duration_minutes(s.duration_minutes))
    }
}

/// Meetings are dated relative to the seeding day so the demo always has
/// something upcoming.
#[derive(Deserialize)]
struct SeedMeeting {
    title: String,
    description: Option<String>,
    teacher_name: String,
    teacher_title: Option<String>,
    days_from_today: u64,
    time: NaiveTime,
    duration_minutes: u32,
    meeting_link: String,
    category: Category,
    meeting_type: MeetingType,
    recurring: Recurrence,
}

impl SeedMeeting {
    fn into_draft(self, today: NaiveDate) -> Result<MeetingDraft, SeedError> {
        let date = today
            .checked_add_days(Days::new(self.days_from_today))
            .ok_or(SeedError::DateOutOfRange(self.days_from_today, today))?;
        let mut draft = MeetingDraft::new(
            self.title,
            self.teacher_name,
            date,
            self.time,
            self.meeting_link,
        );
        draft.description = self.description;
        draft.teacher_title = self.teacher_title;
        draft.duration_minutes = self.duration_minutes;
        draft.category = self.category;
        draft.meeting_type = self.meeting_type;
        draft.recurring = self.recurring;
        Ok(draft)
    }
}

/// Upsert the demo catalog and, if no meetings exist yet, schedule the demo
/// meetings starting from `today`. Safe to run repeatedly.
///
/// # Errors
///
/// Returns `SeedError` if the embedded data is invalid or the store rejects a
/// write.
pub async fn seed_demo_content(storage: &Storage, today: NaiveDate) -> Result<SeedReport, SeedError> {
    let catalog: DemoCatalog = serde_json::from_str(DEMO_CATALOG)?;
    let mut report = SeedReport::default();

    for seed in catalog.resources {
        let resource = Resource::try_from(seed)?;
        storage.resources.upsert_resource(&resource).await?;
        report.resources += 1;
    }

    if storage.meetings.list_meetings().await?.is_empty() {
        for seed in catalog.meetings {
            let meeting = seed.into_draft(today)?.validate()?;
            storage.meetings.insert_meeting(&meeting).await?;
            report.meetings += 1;
        }
    }

    info!(
        resources = report.resources,
        meetings = report.meetings,
        "demo content seeded"
    );
    Ok(report)
}
