#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth;
pub mod catalog_service;
pub mod dashboard_service;
pub mod error;
pub mod meeting_service;
pub mod progress_service;
pub mod quiz_service;
pub mod retry;
pub mod seed;

pub use epsilon_core::Clock;

pub use app_services::AppServices;
pub use auth::{AuthProvider, LoginRequired, StaticAuth, StoredAuth, optional_user};
pub use catalog_service::{CatalogService, ResourceStatus};
pub use dashboard_service::{DashboardOverview, DashboardService};
pub use error::{
    AppServicesError, AuthError, CatalogError, DashboardError, MeetingServiceError,
    ProgressServiceError, QuizServiceError,
};
pub use meeting_service::{MeetingService, MonthView};
pub use progress_service::{CompletionOutcome, ProfileView, ProgressService};
pub use quiz_service::{PersistenceStatus, QuizService, QuizSubmission};
pub use retry::RetryPolicy;
pub use seed::{SeedError, SeedReport, seed_demo_content};
