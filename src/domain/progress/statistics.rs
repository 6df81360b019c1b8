//! Read models aggregated across all of a learner's progress.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{round_to_two_decimals, Percentage, UserId};

use super::Progress;

/// Learning statistics for one user, across every module they started.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    pub total_modules_started: u32,
    pub total_modules_completed: u32,
    pub total_lessons_completed: u32,
    /// Seconds across every tracked lesson.
    pub total_time_spent: i64,
    /// Mean seconds per completed lesson.
    pub average_time_per_lesson: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Share of started modules that are completed.
    pub completion_rate: Percentage,
}

impl UserStatistics {
    /// Statistics of a user with no recorded progress.
    pub fn empty() -> Self {
        Self {
            total_modules_started: 0,
            total_modules_completed: 0,
            total_lessons_completed: 0,
            total_time_spent: 0,
            average_time_per_lesson: 0.0,
            current_streak: 0,
            longest_streak: 0,
            completion_rate: Percentage::ZERO,
        }
    }

    /// Builds statistics from pre-aggregated counts and activity days.
    pub fn from_totals(
        modules_started: u32,
        modules_completed: u32,
        lessons_completed: u32,
        total_time_spent: i64,
        activity_days: &BTreeSet<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        let streaks = Streaks::from_activity_days(activity_days, today);
        let average_time_per_lesson = if lessons_completed == 0 {
            0.0
        } else {
            round_to_two_decimals(total_time_spent as f64 / f64::from(lessons_completed))
        };

        Self {
            total_modules_started: modules_started,
            total_modules_completed: modules_completed,
            total_lessons_completed: lessons_completed,
            total_time_spent,
            average_time_per_lesson,
            current_streak: streaks.current,
            longest_streak: streaks.longest,
            completion_rate: Percentage::of(modules_completed.min(modules_started), modules_started)
                .unwrap_or_default(),
        }
    }

    /// Aggregates statistics from a user's loaded progress aggregates.
    pub fn from_progress(progress: &[Progress], today: NaiveDate) -> Self {
        let modules_completed = progress.iter().filter(|p| p.is_completed()).count() as u32;
        let lessons_completed = progress.iter().map(Progress::completed_lesson_count).sum();
        let total_time_spent = progress.iter().map(Progress::total_time_spent).sum();

        Self::from_totals(
            progress.len() as u32,
            modules_completed,
            lessons_completed,
            total_time_spent,
            &activity_days(progress),
            today,
        )
    }
}

impl Default for UserStatistics {
    fn default() -> Self {
        Self::empty()
    }
}

/// Leaderboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub user_id: UserId,
    pub lessons_completed: u32,
    pub modules_completed: u32,
    pub total_time_spent: i64,
}

impl TopUser {
    /// Ranks users by lessons completed, then time spent, both descending.
    ///
    /// Ties on both are ordered by user id so results are stable.
    pub fn rank(mut users: Vec<TopUser>, limit: usize) -> Vec<TopUser> {
        users.sort_by(|a, b| {
            b.lessons_completed
                .cmp(&a.lessons_completed)
                .then(b.total_time_spent.cmp(&a.total_time_spent))
                .then(a.user_id.cmp(&b.user_id))
        });
        users.truncate(limit);
        users
    }
}

/// Consecutive-day activity runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

impl Streaks {
    /// Computes streaks from the set of days with activity.
    ///
    /// The current streak must end today, or yesterday when the learner has
    /// not been active yet today.
    pub fn from_activity_days(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> Self {
        let mut longest = 0u32;
        let mut run = 0u32;
        let mut previous: Option<NaiveDate> = None;

        for day in days.iter().filter(|d| **d <= today) {
            run = match previous {
                Some(prev) if prev.succ_opt() == Some(*day) => run + 1,
                _ => 1,
            };
            longest = longest.max(run);
            previous = Some(*day);
        }

        let yesterday = today.pred_opt();
        let current = match previous {
            Some(last) if last == today || Some(last) == yesterday => run,
            _ => 0,
        };

        Self { current, longest }
    }
}

/// UTC days on which any lesson was started, attempted or completed.
pub fn activity_days(progress: &[Progress]) -> BTreeSet<NaiveDate> {
    progress
        .iter()
        .flat_map(|p| p.lessons())
        .flat_map(|lp| {
            [
                Some(lp.started_at()),
                lp.last_attempt_at(),
                lp.completed_at(),
            ]
        })
        .flatten()
        .map(|ts| ts.date())
        .collect()
}
