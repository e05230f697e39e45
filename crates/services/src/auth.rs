use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use epsilon_core::model::{CurrentUser, UserEmail, UserPatch};
use storage::repository::ProfileRepository;
use tracing::{debug, info};

use crate::error::AuthError;

/// What the caller should do to obtain a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequired {
    pub message: String,
}

/// The external identity provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when nobody is signed in.
    async fn me(&self) -> Result<CurrentUser, AuthError>;

    /// Instructions for signing in.
    fn redirect_to_login(&self) -> LoginRequired;

    /// Update the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when nobody is signed in.
    async fn update_me(&self, patch: UserPatch) -> Result<CurrentUser, AuthError>;

    /// # Errors
    ///
    /// Returns `AuthError` if the provider cannot end the session.
    async fn logout(&self) -> Result<(), AuthError>;
}

/// The signed-in user, or `None` for anonymous use.
///
/// # Errors
///
/// Returns `AuthError` for failures other than "not signed in".
pub async fn optional_user(auth: &dyn AuthProvider) -> Result<Option<CurrentUser>, AuthError> {
    match auth.me().await {
        Ok(user) => Ok(Some(user)),
        Err(AuthError::NotAuthenticated) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Process-local provider whose user is fixed at startup (from CLI flags or
/// the environment).
#[derive(Clone, Default)]
pub struct StaticAuth {
    user: Arc<Mutex<Option<CurrentUser>>>,
}

impl StaticAuth {
    #[must_use]
    pub fn signed_in(user: CurrentUser) -> Self {
        Self {
            user: Arc::new(Mutex::new(Some(user))),
        }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    fn with_user<T>(
        &self,
        f: impl FnOnce(&mut Option<CurrentUser>) -> Result<T, AuthError>,
    ) -> Result<T, AuthError> {
        let mut guard = self
            .user
            .lock()
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        f(&mut guard)
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn me(&self) -> Result<CurrentUser, AuthError> {
        self.with_user(|u| u.clone().ok_or(AuthError::NotAuthenticated))
    }

    fn redirect_to_login(&self) -> LoginRequired {
        LoginRequired {
            message: LOGIN_HINT.into(),
        }
    }

    async fn update_me(&self, patch: UserPatch) -> Result<CurrentUser, AuthError> {
        self.with_user(|u| {
            let user = u.as_mut().ok_or(AuthError::NotAuthenticated)?;
            user.apply(patch);
            Ok(user.clone())
        })
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.with_user(|u| {
            if let Some(user) = u.take() {
                info!(email = %user.email, "signed out");
            }
            Ok(())
        })
    }
}

const LOGIN_HINT: &str = "sign in with --user <email> or EPSILON_USER_EMAIL";

/// Provider for a session named by email whose profile edits are kept in the
/// store, so a later session for the same email sees them.
#[derive(Clone)]
pub struct StoredAuth {
    session: Arc<Mutex<Option<UserEmail>>>,
    default_name: Option<String>,
    profiles: Arc<dyn ProfileRepository>,
}

impl StoredAuth {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>, session: Option<UserEmail>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            default_name: None,
            profiles,
        }
    }

    /// Name used until the user saves one of their own.
    #[must_use]
    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = Some(name.into());
        self
    }

    fn session(&self) -> Result<Option<UserEmail>, AuthError> {
        self.session
            .lock()
            .map(|s| s.clone())
            .map_err(|e| AuthError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl AuthProvider for StoredAuth {
    async fn me(&self) -> Result<CurrentUser, AuthError> {
        let email = self.session()?.ok_or(AuthError::NotAuthenticated)?;
        if let Some(user) = self.profiles.find_profile(&email).await? {
            return Ok(user);
        }
        debug!(%email, "no saved profile");
        let user = CurrentUser::new(email);
        Ok(match &self.default_name {
            Some(name) => user.with_full_name(name),
            None => user,
        })
    }

    fn redirect_to_login(&self) -> LoginRequired {
        LoginRequired {
            message: LOGIN_HINT.into(),
        }
    }

    async fn update_me(&self, patch: UserPatch) -> Result<CurrentUser, AuthError> {
        let mut user = self.me().await?;
        user.apply(patch);
        self.profiles.save_profile(&user).await?;
        info!(email = %user.email, theme = %user.theme, "profile updated");
        Ok(user)
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        if let Some(email) = session.take() {
            info!(%email, "signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epsilon_core::model::Theme;
    use storage::repository::InMemoryRepository;

    fn ada() -> CurrentUser {
        CurrentUser::new(UserEmail::new("ada@example.com").unwrap()).with_full_name("Ada")
    }

    #[tokio::test]
    async fn anonymous_has_no_user() {
        let auth = StaticAuth::anonymous();
        assert!(matches!(auth.me().await, Err(AuthError::NotAuthenticated)));
        assert!(optional_user(&auth).await.unwrap().is_none());
        assert!(auth.redirect_to_login().message.contains("--user"));
    }

    #[tokio::test]
    async fn update_and_logout() {
        let auth = StaticAuth::signed_in(ada());
        let updated = auth
            .update_me(UserPatch {
                full_name: None,
                theme: Some(Theme::Dark),
            })
            .await
            .unwrap();
        assert_eq!(updated.theme, Theme::Dark);
        assert_eq!(auth.me().await.unwrap().theme, Theme::Dark);

        auth.logout().await.unwrap();
        assert!(optional_user(&auth).await.unwrap().is_none());
        assert!(matches!(
            auth.update_me(UserPatch::default()).await,
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn stored_profile_outlives_the_session() {
        let repo = Arc::new(InMemoryRepository::new());
        let email = UserEmail::new("ada@example.com").unwrap();
        let auth = StoredAuth::new(repo.clone(), Some(email.clone())).with_default_name("Ada");
        assert_eq!(auth.me().await.unwrap().display_name(), "Ada");

        auth.update_me(UserPatch {
            full_name: Some("Ada Lovelace".into()),
            theme: Some(Theme::HighContrast),
        })
        .await
        .unwrap();
        auth.logout().await.unwrap();
        assert!(matches!(auth.me().await, Err(AuthError::NotAuthenticated)));

        // a later session ignores the default name once a profile is saved
        let later = StoredAuth::new(repo, Some(email)).with_default_name("Someone else");
        let me = later.me().await.unwrap();
        assert_eq!(me.display_name(), "Ada Lovelace");
        assert_eq!(me.theme, Theme::HighContrast);
    }
}
