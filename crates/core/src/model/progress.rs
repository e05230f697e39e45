use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::evaluator;
use crate::model::badge::Badge;
use crate::model::ids::{ResourceId, UserEmail};
use crate::model::resource::ResourceType;

/// Per-user aggregate of completions, XP and streak data.
///
/// Missing fields in stored documents deserialize to empty sets and zero
/// counters, so read sites never need absence checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    user_email: UserEmail,
    #[serde(default)]
    xp: u32,
    #[serde(default)]
    completed_lessons: BTreeSet<ResourceId>,
    #[serde(default)]
    completed_quizzes: BTreeSet<ResourceId>,
    #[serde(default)]
    completed_videos: BTreeSet<ResourceId>,
    #[serde(default)]
    downloaded_resources: BTreeSet<ResourceId>,
    #[serde(default)]
    badges: BTreeSet<Badge>,
    #[serde(default)]
    streak_days: u32,
}

impl ProgressRecord {
    /// Empty record: no XP, no completions, no stored badges.
    #[must_use]
    pub fn new(user_email: UserEmail) -> Self {
        Self {
            user_email,
            xp: 0,
            completed_lessons: BTreeSet::new(),
            completed_quizzes: BTreeSet::new(),
            completed_videos: BTreeSet::new(),
            downloaded_resources: BTreeSet::new(),
            badges: BTreeSet::new(),
            streak_days: 0,
        }
    }

    /// Record created lazily by a user's first completion: starter badge and a
    /// one-day streak.
    #[must_use]
    pub fn first_activity(user_email: UserEmail) -> Self {
        let mut record = Self::new(user_email);
        record.badges.insert(Badge::Starter);
        record.streak_days = 1;
        record
    }

    /// Rehydrate a record from storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        user_email: UserEmail,
        xp: u32,
        completed_lessons: BTreeSet<ResourceId>,
        completed_quizzes: BTreeSet<ResourceId>,
        completed_videos: BTreeSet<ResourceId>,
        downloaded_resources: BTreeSet<ResourceId>,
        badges: BTreeSet<Badge>,
        streak_days: u32,
    ) -> Self {
        Self {
            user_email,
            xp,
            completed_lessons,
            completed_quizzes,
            completed_videos,
            downloaded_resources,
            badges,
            streak_days,
        }
    }

    #[must_use]
    pub fn user_email(&self) -> &UserEmail {
        &self.user_email
    }

    #[must_use]
    pub fn xp(&self) -> u32 {
        self.xp
    }

    #[must_use]
    pub fn completed_lessons(&self) -> &BTreeSet<ResourceId> {
        &self.completed_lessons
    }

    #[must_use]
    pub fn completed_quizzes(&self) -> &BTreeSet<ResourceId> {
        &self.completed_quizzes
    }

    #[must_use]
    pub fn completed_videos(&self) -> &BTreeSet<ResourceId> {
        &self.completed_videos
    }

    #[must_use]
    pub fn downloaded_resources(&self) -> &BTreeSet<ResourceId> {
        &self.downloaded_resources
    }

    /// Badges as last written to the store. Informational only; use
    /// [`evaluator::earned_badges`] for the authoritative set.
    #[must_use]
    pub fn stored_badges(&self) -> &BTreeSet<Badge> {
        &self.badges
    }

    #[must_use]
    pub fn streak_days(&self) -> u32 {
        self.streak_days
    }

    pub fn set_streak_days(&mut self, days: u32) {
        self.streak_days = days;
    }

    /// The completion set that tracks resources of `kind`.
    #[must_use]
    pub fn completions(&self, kind: ResourceType) -> &BTreeSet<ResourceId> {
        match kind {
            ResourceType::Lesson => &self.completed_lessons,
            ResourceType::Quiz => &self.completed_quizzes,
            ResourceType::Video => &self.completed_videos,
            ResourceType::Download => &self.downloaded_resources,
        }
    }

    fn completions_mut(&mut self, kind: ResourceType) -> &mut BTreeSet<ResourceId> {
        match kind {
            ResourceType::Lesson => &mut self.completed_lessons,
            ResourceType::Quiz => &mut self.completed_quizzes,
            ResourceType::Video => &mut self.completed_videos,
            ResourceType::Download => &mut self.downloaded_resources,
        }
    }

    #[must_use]
    pub fn has_completed(&self, kind: ResourceType, id: ResourceId) -> bool {
        self.completions(kind).contains(&id)
    }

    /// Record a completion and award `reward` XP, but only the first time `id`
    /// is completed. Returns whether the completion was new.
    pub fn record_completion(&mut self, kind: ResourceType, id: ResourceId, reward: u32) -> bool {
        if !self.completions_mut(kind).insert(id) {
            return false;
        }
        self.xp = self.xp.saturating_add(reward);
        true
    }

    /// Replace the stored badge list with the set derived from current counters.
    pub fn refresh_badges(&mut self) {
        self.badges = evaluator::earned_badges(Some(self));
    }
}
