use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Achievements a learner can earn.
///
/// Declaration order is display order; `Ord` follows it so badge sets
/// iterate from the entry badge up to the rarest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    Starter,
    Learner,
    QuizMaster,
    VideoWatcher,
    XpHunter,
    StreakMaster,
    Champion,
    Diamond,
}

impl Badge {
    pub const ALL: [Badge; 8] = [
        Badge::Starter,
        Badge::Learner,
        Badge::QuizMaster,
        Badge::VideoWatcher,
        Badge::XpHunter,
        Badge::StreakMaster,
        Badge::Champion,
        Badge::Diamond,
    ];

    /// Stable identifier used in storage and on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Badge::Starter => "starter",
            Badge::Learner => "learner",
            Badge::QuizMaster => "quiz_master",
            Badge::VideoWatcher => "video_watcher",
            Badge::XpHunter => "xp_hunter",
            Badge::StreakMaster => "streak_master",
            Badge::Champion => "champion",
            Badge::Diamond => "diamond",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Badge::Starter => "Getting Started",
            Badge::Learner => "Eager Learner",
            Badge::QuizMaster => "Quiz Master",
            Badge::VideoWatcher => "Video Scholar",
            Badge::XpHunter => "XP Hunter",
            Badge::StreakMaster => "On Fire",
            Badge::Champion => "Champion",
            Badge::Diamond => "Diamond Status",
        }
    }

    /// How the badge is earned, phrased for the learner.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Badge::Starter => "Welcome to Epsilon!",
            Badge::Learner => "Complete 5 lessons",
            Badge::QuizMaster => "Pass 5 quizzes",
            Badge::VideoWatcher => "Watch 5 videos",
            Badge::XpHunter => "Earn 1000 XP",
            Badge::StreakMaster => "7-day streak",
            Badge::Champion => "Complete 10 resources",
            Badge::Diamond => "Earn 5000 XP",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown badge: {0}")]
pub struct UnknownBadge(pub String);

impl FromStr for Badge {
    type Err = UnknownBadge;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Badge::ALL
            .into_iter()
            .find(|badge| badge.as_str() == s)
            .ok_or_else(|| UnknownBadge(s.to_string()))
    }
}
