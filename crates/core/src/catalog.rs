use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Category, Difficulty, Resource, ResourceType};

/// Length of a YouTube video id.
pub const YOUTUBE_ID_LEN: usize = 11;

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .expect("youtube pattern should compile")
});

/// Extract the video id from the common YouTube URL shapes.
#[must_use]
pub fn youtube_id(url: &str) -> Option<&str> {
    let id = YOUTUBE_URL.captures(url)?.get(2)?.as_str();
    (id.len() == YOUTUBE_ID_LEN).then_some(id)
}

/// Conjunctive catalog filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    pub search: Option<String>,
    pub kind: Option<ResourceType>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
}

impl ResourceFilter {
    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = (!term.trim().is_empty()).then_some(term);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: ResourceType) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// Search is a case-insensitive substring match on title or description.
    #[must_use]
    pub fn matches(&self, resource: &Resource) -> bool {
        let search_ok = self.search.as_deref().is_none_or(|term| {
            let needle = term.trim().to_lowercase();
            resource.title().to_lowercase().contains(&needle)
                || resource
                    .description()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        });
        search_ok
            && self.kind.is_none_or(|k| k == resource.resource_type())
            && self.category.is_none_or(|c| c == resource.category())
            && self.difficulty.is_none_or(|d| d == resource.difficulty())
    }

    pub fn apply<'a>(&'a self, resources: &'a [Resource]) -> impl Iterator<Item = &'a Resource> {
        resources.iter().filter(|r| self.matches(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LessonSection, ResourceId, ResourceKind};

    fn catalog() -> Vec<Resource> {
        vec![
            Resource::new(
                ResourceId::new(1),
                "Budgeting Basics",
                Some("Plan your monthly cash flow".into()),
                Category::Finance,
                Difficulty::Beginner,
                ResourceKind::Lesson {
                    sections: vec![LessonSection::new("Intro", "# Budgets")],
                    sources: vec![],
                },
            )
            .unwrap(),
            Resource::new(
                ResourceId::new(2),
                "Brand Storytelling",
                None,
                Category::Marketing,
                Difficulty::Intermediate,
                ResourceKind::Video {
                    url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
                },
            )
            .unwrap(),
        ]
    }

    #[test]
    fn search_covers_title_and_description() {
        let resources = catalog();
        let by_desc = ResourceFilter::default().search("CASH");
        assert_eq!(by_desc.apply(&resources).count(), 1);
        let by_title = ResourceFilter::default().search("brand");
        assert_eq!(
            by_title.apply(&resources).next().map(Resource::id),
            Some(ResourceId::new(2))
        );
    }

    #[test]
    fn filters_are_conjunctive() {
        let resources = catalog();
        let filter = ResourceFilter::default()
            .kind(ResourceType::Video)
            .category(Category::Finance);
        assert_eq!(filter.apply(&resources).count(), 0);
        assert_eq!(ResourceFilter::default().apply(&resources).count(), 2);
        let blank = ResourceFilter::default().search("   ");
        assert!(blank.search.is_none());
    }

    #[test]
    fn youtube_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ?start=10",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
        ] {
            assert_eq!(youtube_id(url), Some("dQw4w9WgXcQ"), "{url}");
        }
    }

    #[test]
    fn non_youtube_has_no_id() {
        assert_eq!(youtube_id("https://vimeo.com/12345"), None);
        assert_eq!(youtube_id("https://youtu.be/short"), None);
    }
}
