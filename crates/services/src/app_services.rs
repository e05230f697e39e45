use std::sync::Arc;

use epsilon_core::model::CurrentUser;
use storage::repository::Storage;
use tracing::debug;

use crate::Clock;
use crate::auth::{AuthProvider, optional_user};
use crate::catalog_service::CatalogService;
use crate::dashboard_service::DashboardService;
use crate::error::{AppServicesError, AuthError};
use crate::meeting_service::MeetingService;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;
use crate::retry::RetryPolicy;
use crate::seed::{SeedError, SeedReport, seed_demo_content};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    auth: Arc<dyn AuthProvider>,
    progress: Arc<ProgressService>,
    catalog: Arc<CatalogService>,
    quizzes: Arc<QuizService>,
    meetings: Arc<MeetingService>,
    dashboard: Arc<DashboardService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        auth: Arc<dyn AuthProvider>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        debug!(db_url, "sqlite storage ready");
        Ok(Self::from_storage(storage, clock, auth, RetryPolicy::default()))
    }

    /// Build services over in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock, auth: Arc<dyn AuthProvider>) -> Self {
        Self::from_storage(Storage::in_memory(), clock, auth, RetryPolicy::default())
    }

    #[must_use]
    pub fn from_storage(
        storage: Storage,
        clock: Clock,
        auth: Arc<dyn AuthProvider>,
        retry: RetryPolicy,
    ) -> Self {
        let progress = ProgressService::new(
            Arc::clone(&storage.progress),
            Arc::clone(&storage.attempts),
        )
        .with_retry(retry);
        let catalog = CatalogService::new(
            Arc::clone(&storage.resources),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.attempts),
        );
        let meetings = MeetingService::new(
            Arc::clone(&storage.meetings),
            Arc::clone(&storage.registrations),
        );
        let quizzes = QuizService::new(
            clock,
            catalog.clone(),
            Arc::clone(&storage.attempts),
            progress.clone(),
        )
        .with_retry(retry);
        let dashboard = DashboardService::new(progress.clone(), catalog.clone(), meetings.clone());

        Self {
            clock,
            storage,
            auth,
            progress: Arc::new(progress),
            catalog: Arc::new(catalog),
            quizzes: Arc::new(quizzes),
            meetings: Arc::new(meetings),
            dashboard: Arc::new(dashboard),
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn auth(&self) -> Arc<dyn AuthProvider> {
        Arc::clone(&self.auth)
    }

    /// The signed-in user, or `None` when browsing anonymously.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the provider fails for a reason other than
    /// nobody being signed in.
    pub async fn current_user(&self) -> Result<Option<CurrentUser>, AuthError> {
        optional_user(self.auth.as_ref()).await
    }

    /// Load the demo catalog and meetings.
    ///
    /// # Errors
    ///
    /// Returns `SeedError` if the store rejects a write.
    pub async fn seed_demo(&self) -> Result<SeedReport, SeedError> {
        seed_demo_content(&self.storage, self.clock.today()).await
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn meetings(&self) -> Arc<MeetingService> {
        Arc::clone(&self.meetings)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }
}
