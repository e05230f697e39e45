use std::collections::HashMap;
use std::sync::Arc;

use epsilon_core::catalog::ResourceFilter;
use epsilon_core::model::{ProgressRecord, QuizAttempt, Resource, ResourceId, ResourceType, UserEmail};
use serde::Serialize;
use storage::repository::{
    ProgressRepository, QuizAttemptRepository, ResourceRepository, StorageError,
};
use tracing::debug;

use crate::error::CatalogError;

/// What a user has done with one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceStatus {
    pub resource_id: ResourceId,
    pub completed: bool,
    /// Latest attempt as `"score/total"`, quizzes only.
    pub quiz_score: Option<String>,
}

/// Read access to lessons, videos, downloads and quizzes.
#[derive(Clone)]
pub struct CatalogService {
    resources: Arc<dyn ResourceRepository>,
    progress: Arc<dyn ProgressRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        resources: Arc<dyn ResourceRepository>,
        progress: Arc<dyn ProgressRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
    ) -> Self {
        Self {
            resources,
            progress,
            attempts,
        }
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the catalog cannot be read.
    pub async fn list(&self) -> Result<Vec<Resource>, CatalogError> {
        Ok(self.resources.list_resources().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    pub async fn get(&self, id: ResourceId) -> Result<Resource, CatalogError> {
        match self.resources.get_resource(id).await {
            Ok(resource) => Ok(resource),
            Err(StorageError::NotFound) => Err(CatalogError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Resources matching every constraint in `filter`, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the catalog cannot be read.
    pub async fn filter(&self, filter: &ResourceFilter) -> Result<Vec<Resource>, CatalogError> {
        let all = self.list().await?;
        let matched: Vec<Resource> = filter.apply(&all).cloned().collect();
        debug!(total = all.len(), matched = matched.len(), "filtered catalog");
        Ok(matched)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` or `CatalogError::WrongKind`.
    pub async fn lesson(&self, id: ResourceId) -> Result<Resource, CatalogError> {
        self.get_kind(id, ResourceType::Lesson).await
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` or `CatalogError::WrongKind`.
    pub async fn video(&self, id: ResourceId) -> Result<Resource, CatalogError> {
        self.get_kind(id, ResourceType::Video).await
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` or `CatalogError::WrongKind`.
    pub async fn download(&self, id: ResourceId) -> Result<Resource, CatalogError> {
        self.get_kind(id, ResourceType::Download).await
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` or `CatalogError::WrongKind`.
    pub async fn quiz(&self, id: ResourceId) -> Result<Resource, CatalogError> {
        self.get_kind(id, ResourceType::Quiz).await
    }

    async fn get_kind(
        &self,
        id: ResourceId,
        expected: ResourceType,
    ) -> Result<Resource, CatalogError> {
        let resource = self.get(id).await?;
        let found = resource.resource_type();
        if found != expected {
            return Err(CatalogError::WrongKind {
                id,
                expected,
                found,
            });
        }
        Ok(resource)
    }

    /// Status of every resource in `resources` for the given user.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if progress or attempts cannot be read.
    pub async fn statuses_for(
        &self,
        email: &UserEmail,
        resources: &[Resource],
    ) -> Result<Vec<ResourceStatus>, CatalogError> {
        let record = self.progress.find_by_email(email).await?.map(|e| e.record);
        let attempts = self.attempts.attempts_for_user(email).await?;
        let latest = latest_attempts(&attempts);

        Ok(resources
            .iter()
            .map(|r| status_of(r, record.as_ref(), &latest))
            .collect())
    }
}

// attempts come oldest first, so later entries win
fn latest_attempts(attempts: &[QuizAttempt]) -> HashMap<ResourceId, &QuizAttempt> {
    attempts.iter().map(|a| (a.quiz_id(), a)).collect()
}

fn status_of(
    resource: &Resource,
    record: Option<&ProgressRecord>,
    latest: &HashMap<ResourceId, &QuizAttempt>,
) -> ResourceStatus {
    let kind = resource.resource_type();
    ResourceStatus {
        resource_id: resource.id(),
        completed: record.is_some_and(|r| r.has_completed(kind, resource.id())),
        quiz_score: (kind == ResourceType::Quiz)
            .then(|| latest.get(&resource.id()).map(|a| a.score_label()))
            .flatten(),
    }
}
