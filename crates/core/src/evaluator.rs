//! Pure derivations over a [`ProgressRecord`]: level, XP to the next level,
//! completion counts and earned badges.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{Badge, ProgressRecord, QuizAttempt};

/// XP needed per level.
pub const XP_PER_LEVEL: u32 = 500;

/// Catalog size assumed when the catalog is empty.
pub const FALLBACK_CATALOG_SIZE: usize = 20;

const LEARNER_LESSONS: usize = 5;
const QUIZ_MASTER_QUIZZES: usize = 5;
const VIDEO_WATCHER_VIDEOS: usize = 5;
const XP_HUNTER_XP: u32 = 1_000;
const STREAK_MASTER_DAYS: u32 = 7;
const CHAMPION_COMPLETIONS: usize = 10;
const DIAMOND_XP: u32 = 5_000;

#[must_use]
pub fn level(xp: u32) -> u32 {
    xp / XP_PER_LEVEL + 1
}

/// Always in `1..=XP_PER_LEVEL`; a user exactly on a boundary needs a full level.
#[must_use]
pub fn xp_to_next_level(xp: u32) -> u32 {
    XP_PER_LEVEL - xp % XP_PER_LEVEL
}

/// Share of the current level already earned, `0..=99`.
#[must_use]
pub fn level_progress_percent(xp: u32) -> u32 {
    (xp % XP_PER_LEVEL) * 100 / XP_PER_LEVEL
}

/// Lessons, quizzes and videos completed. Downloads do not count.
#[must_use]
pub fn completed_count(record: Option<&ProgressRecord>) -> usize {
    record.map_or(0, |r| {
        r.completed_lessons().len() + r.completed_quizzes().len() + r.completed_videos().len()
    })
}

/// Rounded percentage of the catalog completed.
#[must_use]
pub fn completion_percent(completed: usize, total_resources: usize) -> u32 {
    let total = if total_resources == 0 {
        FALLBACK_CATALOG_SIZE
    } else {
        total_resources
    };
    // round-half-up of completed / total * 100
    let pct = (completed.saturating_mul(200) + total) / (2 * total);
    u32::try_from(pct).unwrap_or(u32::MAX)
}

/// Every badge whose threshold the record meets. `starter` is unconditional.
#[must_use]
pub fn earned_badges(record: Option<&ProgressRecord>) -> BTreeSet<Badge> {
    let mut badges = BTreeSet::from([Badge::Starter]);
    let Some(r) = record else {
        return badges;
    };

    let rules = [
        (r.completed_lessons().len() >= LEARNER_LESSONS, Badge::Learner),
        (r.completed_quizzes().len() >= QUIZ_MASTER_QUIZZES, Badge::QuizMaster),
        (r.completed_videos().len() >= VIDEO_WATCHER_VIDEOS, Badge::VideoWatcher),
        (r.xp() >= XP_HUNTER_XP, Badge::XpHunter),
        (r.streak_days() >= STREAK_MASTER_DAYS, Badge::StreakMaster),
        (completed_count(record) >= CHAMPION_COMPLETIONS, Badge::Champion),
        (r.xp() >= DIAMOND_XP, Badge::Diamond),
    ];
    badges.extend(
        rules
            .into_iter()
            .filter_map(|(earned, badge)| earned.then_some(badge)),
    );
    badges
}

/// Everything the profile and dashboard show about a user's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub xp: u32,
    pub level: u32,
    pub xp_to_next_level: u32,
    pub level_progress_percent: u32,
    pub completed_count: usize,
    pub downloads: usize,
    pub streak_days: u32,
    pub badges: BTreeSet<Badge>,
}

/// Evaluate a record. An absent record is a brand-new learner.
#[must_use]
pub fn evaluate(record: Option<&ProgressRecord>) -> ProgressSummary {
    let xp = record.map_or(0, ProgressRecord::xp);
    ProgressSummary {
        xp,
        level: level(xp),
        xp_to_next_level: xp_to_next_level(xp),
        level_progress_percent: level_progress_percent(xp),
        completed_count: completed_count(record),
        downloads: record.map_or(0, |r| r.downloaded_resources().len()),
        streak_days: record.map_or(0, ProgressRecord::streak_days),
        badges: earned_badges(record),
    }
}

/// How many quizzes a learner has taken and how well they did on average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuizStats {
    pub attempts: usize,
    /// Rounded mean of each attempt's percentage; `0` with no attempts.
    pub average_percent: u32,
}

#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn quiz_stats(attempts: &[QuizAttempt]) -> QuizStats {
    if attempts.is_empty() {
        return QuizStats::default();
    }
    let total: f64 = attempts
        .iter()
        .map(|a| match a.total_questions() {
            0 => 0.0,
            n => f64::from(a.score()) / f64::from(n) * 100.0,
        })
        .sum();
    // each term is within 0..=100, so the mean is too
    let average = (total / attempts.len() as f64).round();
    QuizStats {
        attempts: attempts.len(),
        average_percent: average as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResourceId, ResourceType, UserEmail};
    use crate::time::fixed_now;

    fn record() -> ProgressRecord {
        ProgressRecord::new(UserEmail::new("ada@example.com").unwrap())
    }

    fn complete(record: &mut ProgressRecord, kind: ResourceType, ids: std::ops::RangeInclusive<u64>, xp: u32) {
        for id in ids {
            record.record_completion(kind, ResourceId::new(id), xp);
        }
    }

    #[test]
    fn level_boundaries() {
        assert_eq!((level(0), xp_to_next_level(0)), (1, 500));
        assert_eq!((level(499), xp_to_next_level(499)), (1, 1));
        assert_eq!((level(500), xp_to_next_level(500)), (2, 500));
        assert_eq!((level(750), xp_to_next_level(750)), (2, 250));
        assert_eq!(level_progress_percent(750), 50);
    }

    #[test]
    fn new_learner_only_has_starter() {
        let summary = evaluate(None);
        assert_eq!(summary.level, 1);
        assert_eq!(summary.completed_count, 0);
        assert_eq!(summary.badges, BTreeSet::from([Badge::Starter]));

        let empty = record();
        assert_eq!(evaluate(Some(&empty)).badges, BTreeSet::from([Badge::Starter]));
    }

    #[test]
    fn thresholds_are_independent() {
        let mut r = record();
        complete(&mut r, ResourceType::Lesson, 1..=5, 0);
        complete(&mut r, ResourceType::Video, 6..=10, 0);
        let badges = earned_badges(Some(&r));
        assert!(badges.contains(&Badge::Learner));
        assert!(badges.contains(&Badge::VideoWatcher));
        assert!(badges.contains(&Badge::Champion));
        assert!(!badges.contains(&Badge::QuizMaster));
        assert!(!badges.contains(&Badge::XpHunter));
    }

    #[test]
    fn downloads_do_not_count_towards_champion() {
        let mut r = record();
        complete(&mut r, ResourceType::Download, 1..=20, 0);
        assert_eq!(completed_count(Some(&r)), 0);
        assert!(!earned_badges(Some(&r)).contains(&Badge::Champion));
    }

    #[test]
    fn xp_and_streak_badges() {
        let mut r = record();
        complete(&mut r, ResourceType::Quiz, 1..=1, 5_000);
        r.set_streak_days(7);
        let badges = earned_badges(Some(&r));
        assert!(badges.contains(&Badge::XpHunter));
        assert!(badges.contains(&Badge::Diamond));
        assert!(badges.contains(&Badge::StreakMaster));
    }

    #[test]
    fn badges_are_monotonic_in_counters() {
        let mut r = record();
        let mut previous = earned_badges(Some(&r));
        for id in 1..=12 {
            let kind = match id % 3 {
                0 => ResourceType::Lesson,
                1 => ResourceType::Quiz,
                _ => ResourceType::Video,
            };
            r.record_completion(kind, ResourceId::new(id), 450);
            r.set_streak_days(r.streak_days() + 1);
            let current = earned_badges(Some(&r));
            assert!(current.is_superset(&previous), "lost a badge at step {id}");
            previous = current;
        }
    }

    #[test]
    fn completion_percent_rounds_and_falls_back() {
        assert_eq!(completion_percent(1, 3), 33);
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(5, 0), 25);
        assert_eq!(completion_percent(0, 7), 0);
    }

    fn attempt(score: u32, total: u32) -> QuizAttempt {
        QuizAttempt::from_persisted(
            UserEmail::new("ada@example.com").unwrap(),
            ResourceId::new(12),
            score,
            total,
            Vec::new(),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn quiz_stats_average_each_attempt_percentage() {
        assert_eq!(quiz_stats(&[]), QuizStats::default());

        // 66.7% and 100% average to 83.3%
        let stats = quiz_stats(&[attempt(2, 3), attempt(3, 3)]);
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.average_percent, 83);

        // per-attempt percentages, not pooled questions: (50 + 0) / 2, not 1/3
        assert_eq!(quiz_stats(&[attempt(1, 2), attempt(0, 1)]).average_percent, 25);
        assert_eq!(quiz_stats(&[attempt(1, 2), attempt(1, 1)]).average_percent, 75);
    }
}
