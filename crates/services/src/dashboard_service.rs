use chrono::NaiveDate;
use epsilon_core::evaluator::{self, ProgressSummary};
use epsilon_core::model::{CurrentUser, Meeting, Resource};
use serde::Serialize;

use crate::catalog_service::CatalogService;
use crate::error::DashboardError;
use crate::meeting_service::MeetingService;
use crate::progress_service::ProgressService;

/// Number of catalog entries shown on the dashboard.
pub const FEATURED_RESOURCES: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardOverview {
    pub greeting_name: String,
    pub summary: ProgressSummary,
    pub completion_percent: u32,
    pub featured: Vec<Resource>,
    pub upcoming_meetings: Vec<Meeting>,
}

/// Landing view for a signed-in user.
#[derive(Clone)]
pub struct DashboardService {
    progress: ProgressService,
    catalog: CatalogService,
    meetings: MeetingService,
}

impl DashboardService {
    #[must_use]
    pub fn new(progress: ProgressService, catalog: CatalogService, meetings: MeetingService) -> Self {
        Self {
            progress,
            catalog,
            meetings,
        }
    }

    /// Build the overview. A user without a progress record gets an empty one
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError` if progress, the catalog or meetings cannot be
    /// read, or the empty record cannot be created.
    pub async fn overview(
        &self,
        user: &CurrentUser,
        today: NaiveDate,
    ) -> Result<DashboardOverview, DashboardError> {
        let entry = self.progress.load_or_create(&user.email).await?;
        let summary = evaluator::evaluate(Some(&entry.record));

        let mut catalog = self.catalog.list().await?;
        let completion_percent =
            evaluator::completion_percent(summary.completed_count, catalog.len());
        catalog.truncate(FEATURED_RESOURCES);

        let upcoming_meetings = self
            .meetings
            .registered_upcoming(&user.email, today)
            .await?;

        Ok(DashboardOverview {
            greeting_name: user.display_name().to_string(),
            summary,
            completion_percent,
            featured: catalog,
            upcoming_meetings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use epsilon_core::model::{
        Category, Difficulty, ResourceId, ResourceKind, ResourceType, UserEmail,
    };
    use storage::repository::{InMemoryRepository, ProgressRepository, ResourceRepository};

    fn download(id: u64) -> Resource {
        Resource::new(
            ResourceId::new(id),
            format!("Worksheet {id}"),
            None,
            Category::Entrepreneurship,
            Difficulty::Beginner,
            ResourceKind::Download {
                file_name: format!("worksheet-{id}.pdf"),
            },
        )
        .unwrap()
    }

    async fn service(resources: u64) -> (DashboardService, ProgressService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        for id in 1..=resources {
            repo.upsert_resource(&download(id)).await.unwrap();
        }
        let shared = Arc::new(repo.clone());
        let progress = ProgressService::new(shared.clone(), shared.clone());
        let catalog = CatalogService::new(shared.clone(), shared.clone(), shared.clone());
        let meetings = MeetingService::new(shared.clone(), shared);
        (
            DashboardService::new(progress.clone(), catalog, meetings),
            progress,
            repo,
        )
    }

    fn ada() -> CurrentUser {
        CurrentUser::new(UserEmail::new("ada@example.com").unwrap()).with_full_name("Ada")
    }

    #[tokio::test]
    async fn new_user_gets_empty_record() {
        let (svc, _, repo) = service(8).await;
        let overview = svc
            .overview(&ada(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
            .await
            .unwrap();
        assert_eq!(overview.greeting_name, "Ada");
        assert_eq!(overview.summary.level, 1);
        assert_eq!(overview.completion_percent, 0);
        assert_eq!(overview.featured.len(), FEATURED_RESOURCES);
        assert!(overview.upcoming_meetings.is_empty());

        let stored = repo.find_by_email(&ada().email).await.unwrap().unwrap();
        assert_eq!(stored.record.xp(), 0);
    }

    #[tokio::test]
    async fn completion_percent_uses_catalog_size() {
        let (svc, progress, _) = service(8).await;
        progress
            .record_completion(&ada().email, ResourceType::Lesson, ResourceId::new(1), 150)
            .await
            .unwrap();
        let overview = svc
            .overview(&ada(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
            .await
            .unwrap();
        // 1 of 8, rounded half up
        assert_eq!(overview.completion_percent, 13);
        assert_eq!(overview.summary.completed_count, 1);
        assert_eq!(overview.summary.xp, 150);
    }
}
