//! Before/after progress comparison that produces user-facing events.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::evaluator;
use crate::model::{Badge, ProgressRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    LevelUp { level: u32 },
    BadgeUnlocked { badge: Badge },
    XpGained { amount: u32 },
}

impl ProgressEvent {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            ProgressEvent::LevelUp { level } => format!("Level up! You reached level {level}"),
            ProgressEvent::BadgeUnlocked { badge } => {
                format!("Badge unlocked: {} ({})", badge.title(), badge.description())
            }
            ProgressEvent::XpGained { amount } => format!("+{amount} XP"),
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Session-scoped event source. Level-ups and badge unlocks are reported at
/// most once per trigger; XP gains are reported every time.
#[derive(Debug, Clone, Default)]
pub struct NotificationTrigger {
    notified_levels: HashSet<u32>,
    notified_badges: HashSet<Badge>,
}

impl NotificationTrigger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare two snapshots. Either side missing yields no events.
    ///
    /// Events are ordered level-up, badges (in badge order), then XP.
    pub fn observe(
        &mut self,
        previous: Option<&ProgressRecord>,
        current: Option<&ProgressRecord>,
    ) -> Vec<ProgressEvent> {
        let (Some(prev), Some(cur)) = (previous, current) else {
            return Vec::new();
        };
        let mut events = Vec::new();

        let prev_level = evaluator::level(prev.xp());
        let cur_level = evaluator::level(cur.xp());
        if cur_level > prev_level && self.notified_levels.insert(cur_level) {
            events.push(ProgressEvent::LevelUp { level: cur_level });
        }

        let prev_badges = evaluator::earned_badges(Some(prev));
        for badge in evaluator::earned_badges(Some(cur)).difference(&prev_badges) {
            if self.notified_badges.insert(*badge) {
                events.push(ProgressEvent::BadgeUnlocked { badge: *badge });
            }
        }

        if cur.xp() > prev.xp() {
            events.push(ProgressEvent::XpGained {
                amount: cur.xp() - prev.xp(),
            });
        }
        events
    }
}
