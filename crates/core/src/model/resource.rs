use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ResourceId;
use crate::model::quiz::QuizQuestion;

//
// ─── LABELS ────────────────────────────────────────────────────────────────────
//

labelled_enum! {
    /// Kind of catalog entry, without its payload.
    pub enum ResourceType: "resource type" {
        Lesson => "lesson",
        Quiz => "quiz",
        Video => "video",
        Download => "download",
    }
}

impl ResourceType {
    /// XP granted on first completion when the resource does not override it.
    #[must_use]
    pub fn default_xp_reward(self) -> u32 {
        match self {
            ResourceType::Lesson => 150,
            ResourceType::Quiz => 100,
            ResourceType::Video => 75,
            ResourceType::Download => 50,
        }
    }
}

labelled_enum! {
    pub enum Category: "category" {
        Fundamentals => "fundamentals",
        Marketing => "marketing",
        Finance => "finance",
        Entrepreneurship => "entrepreneurship",
        Leadership => "leadership",
    }
}

impl Category {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::Fundamentals => "Business Fundamentals",
            Category::Marketing => "Marketing",
            Category::Finance => "Finance",
            Category::Entrepreneurship => "Entrepreneurship",
            Category::Leadership => "Leadership",
        }
    }
}

labelled_enum! {
    pub enum Difficulty: "difficulty" {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
    }
}

//
// ─── PAYLOAD ───────────────────────────────────────────────────────────────────
//

/// One page of lesson content. `content` is markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSection {
    pub title: String,
    pub content: String,
}

impl LessonSection {
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Type-specific payload of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceKind {
    Lesson {
        sections: Vec<LessonSection>,
        #[serde(default)]
        sources: Vec<String>,
    },
    Quiz {
        questions: Vec<QuizQuestion>,
    },
    Video {
        url: String,
    },
    Download {
        file_name: String,
    },
}

impl ResourceKind {
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceKind::Lesson { .. } => ResourceType::Lesson,
            ResourceKind::Quiz { .. } => ResourceType::Quiz,
            ResourceKind::Video { .. } => ResourceType::Video,
            ResourceKind::Download { .. } => ResourceType::Download,
        }
    }
}

//
// ─── RESOURCE ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResourceError {
    #[error("resource title cannot be empty")]
    EmptyTitle,

    #[error("lesson must contain at least one section")]
    EmptyLesson,

    #[error("video url cannot be empty")]
    EmptyVideoUrl,
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    id: ResourceId,
    title: String,
    description: Option<String>,
    category: Category,
    difficulty: Difficulty,
    xp_reward: Option<u32>,
    duration_minutes: Option<u32>,
    kind: ResourceKind,
}

impl Resource {
    /// Create a validated resource.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError` if the title is blank, a lesson has no
    /// sections, or a video has no URL.
    pub fn new(
        id: ResourceId,
        title: impl Into<String>,
        description: Option<String>,
        category: Category,
        difficulty: Difficulty,
        kind: ResourceKind,
    ) -> Result<Self, ResourceError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(ResourceError::EmptyTitle);
        }
        match &kind {
            ResourceKind::Lesson { sections, .. } if sections.is_empty() => {
                return Err(ResourceError::EmptyLesson);
            }
            ResourceKind::Video { url } if url.trim().is_empty() => {
                return Err(ResourceError::EmptyVideoUrl);
            }
            _ => {}
        }

        Ok(Self {
            id,
            title,
            description: description.filter(|d| !d.trim().is_empty()),
            category,
            difficulty,
            xp_reward: None,
            duration_minutes: None,
            kind,
        })
    }

    /// Override the per-kind default XP reward.
    #[must_use]
    pub fn with_xp_reward(mut self, xp_reward: Option<u32>) -> Self {
        self.xp_reward = xp_reward;
        self
    }

    #[must_use]
    pub fn with_duration_minutes(mut self, minutes: Option<u32>) -> Self {
        self.duration_minutes = minutes;
        self
    }

    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn duration_minutes(&self) -> Option<u32> {
        self.duration_minutes
    }

    #[must_use]
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.kind.resource_type()
    }

    /// The explicit reward if one was configured.
    #[must_use]
    pub fn configured_xp_reward(&self) -> Option<u32> {
        self.xp_reward
    }

    /// XP granted on first completion.
    #[must_use]
    pub fn xp_reward(&self) -> u32 {
        self.xp_reward
            .unwrap_or_else(|| self.resource_type().default_xp_reward())
    }

    #[must_use]
    pub fn quiz_questions(&self) -> Option<&[QuizQuestion]> {
        match &self.kind {
            ResourceKind::Quiz { questions } => Some(questions),
            _ => None,
        }
    }
}
