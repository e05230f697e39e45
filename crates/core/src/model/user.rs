use serde::Serialize;

use crate::model::ids::UserEmail;

labelled_enum! {
    pub enum Theme: "theme" {
        Light => "light",
        Dark => "dark",
        #[serde(rename = "high-contrast")]
        HighContrast => "high-contrast",
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Light
    }
}

/// The signed-in user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub email: UserEmail,
    pub full_name: Option<String>,
    pub theme: Theme,
}

impl CurrentUser {
    #[must_use]
    pub fn new(email: UserEmail) -> Self {
        Self {
            email,
            full_name: None,
            theme: Theme::default(),
        }
    }

    #[must_use]
    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into()).filter(|n: &String| !n.trim().is_empty());
        self
    }

    /// Name used in greetings; falls back to "Learner".
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("Learner")
    }

    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.full_name {
            let trimmed = name.trim();
            self.full_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
    }
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub theme: Option<Theme>,
}
