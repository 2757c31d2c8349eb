//! Time-boxed challenges
//!
//! Progress is always recomputed from the snapshot, never incremented. Two
//! ways to anchor the window:
//!
//! - [`build_fresh`] anchors at evaluation time, so the window moves with
//!   every call.
//! - [`ChallengeEnrollment`] carries a stored id and start date created once
//!   by the caller; [`build_enrolled`] measures against that fixed window and
//!   the end date stays put across calls.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::models::{MetricKind, WellnessMetrics};
use crate::streaks::SLEEP_STREAK_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    Daily,
    Weekly,
    Monthly,
}

impl ChallengeType {
    /// Length of the challenge window
    pub fn window(&self) -> Duration {
        match self {
            ChallengeType::Daily | ChallengeType::Weekly => Duration::days(7),
            ChallengeType::Monthly => Duration::days(30),
        }
    }
}

/// The fixed challenges the engine knows how to score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    SleepStreak,
    WeeklyImprovement,
    MonthlyConsistency,
}

impl ChallengeKind {
    pub const ALL: [ChallengeKind; 3] = [
        ChallengeKind::SleepStreak,
        ChallengeKind::WeeklyImprovement,
        ChallengeKind::MonthlyConsistency,
    ];

    /// Id used when the challenge is generated fresh
    pub fn default_id(&self) -> &'static str {
        match self {
            ChallengeKind::SleepStreak => "sleep-streak-7",
            ChallengeKind::WeeklyImprovement => "weekly-improvement",
            ChallengeKind::MonthlyConsistency => "monthly-consistency",
        }
    }

    pub fn challenge_type(&self) -> ChallengeType {
        match self {
            ChallengeKind::SleepStreak => ChallengeType::Daily,
            ChallengeKind::WeeklyImprovement => ChallengeType::Weekly,
            ChallengeKind::MonthlyConsistency => ChallengeType::Monthly,
        }
    }

    pub fn target(&self) -> f64 {
        match self {
            ChallengeKind::SleepStreak => 7.0,
            ChallengeKind::WeeklyImprovement => 10.0,
            ChallengeKind::MonthlyConsistency => 80.0,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ChallengeKind::SleepStreak => "7-Day Sleep Streak",
            ChallengeKind::WeeklyImprovement => "Weekly Improvement",
            ChallengeKind::MonthlyConsistency => "Monthly Consistency",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ChallengeKind::SleepStreak => "Score 75 or better on sleep seven nights in a row.",
            ChallengeKind::WeeklyImprovement => "Improve sleep or readiness by 10% this week.",
            ChallengeKind::MonthlyConsistency => "Hit your sleep target on 80% of days this month.",
        }
    }

    fn reward(&self) -> &'static str {
        match self {
            ChallengeKind::SleepStreak => "Sleep Streak badge",
            ChallengeKind::WeeklyImprovement => "Momentum badge",
            ChallengeKind::MonthlyConsistency => "Consistency trophy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: String,

    #[serde(rename = "type")]
    pub challenge_type: ChallengeType,

    pub target: f64,

    /// Recomputed in full on every call
    pub current: f64,

    pub reward: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub completed: bool,
}

impl Challenge {
    /// True while `now` falls inside `[start_date, end_date]`
    pub fn is_active(&self, now: DateTime<FixedOffset>) -> bool {
        now >= self.start_date && now <= self.end_date
    }

    /// Progress toward the target, 0-100
    pub fn percent_complete(&self) -> f64 {
        if self.target <= 0.0 {
            return 100.0;
        }
        (self.current / self.target * 100.0).clamp(0.0, 100.0)
    }
}

/// A challenge the user joined, with its window fixed at enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeEnrollment {
    pub id: String,
    pub kind: ChallengeKind,
    pub start_date: DateTime<FixedOffset>,
}

/// Live progress values for every challenge kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    /// Current sleep streak in days
    pub sleep_streak: u32,

    /// `max(sleep.change, readiness.change)`
    pub weekly_improvement: f64,

    /// Share of visible days meeting the sleep target, 0-100
    pub monthly_consistency: f64,
}

impl ChallengeProgress {
    pub fn from_metrics(metrics: &WellnessMetrics, sleep_streak: u32) -> Self {
        Self {
            sleep_streak,
            weekly_improvement: metrics
                .change(MetricKind::Sleep)
                .max(metrics.change(MetricKind::Readiness)),
            monthly_consistency: monthly_consistency_score(metrics),
        }
    }

    pub fn value(&self, kind: ChallengeKind) -> f64 {
        match kind {
            ChallengeKind::SleepStreak => f64::from(self.sleep_streak),
            ChallengeKind::WeeklyImprovement => self.weekly_improvement,
            ChallengeKind::MonthlyConsistency => self.monthly_consistency,
        }
    }
}

/// Percentage of sleep samples at or above the streak threshold
///
/// 0 when there is no sleep series.
pub fn monthly_consistency_score(metrics: &WellnessMetrics) -> f64 {
    let samples = metrics.samples(MetricKind::Sleep);
    if samples.is_empty() {
        return 0.0;
    }
    let hits = samples
        .iter()
        .filter(|v| **v >= SLEEP_STREAK_THRESHOLD)
        .count();
    hits as f64 / samples.len() as f64 * 100.0
}

fn build(
    kind: ChallengeKind,
    id: String,
    progress: &ChallengeProgress,
    start_date: DateTime<FixedOffset>,
) -> Challenge {
    let challenge_type = kind.challenge_type();
    let target = kind.target();
    let current = progress.value(kind);

    Challenge {
        id,
        title: kind.title().to_string(),
        description: kind.description().to_string(),
        challenge_type,
        target,
        current,
        reward: kind.reward().to_string(),
        start_date,
        end_date: start_date + challenge_type.window(),
        completed: current >= target,
    }
}

/// Challenge anchored at `now`
pub fn build_fresh(
    kind: ChallengeKind,
    progress: &ChallengeProgress,
    now: DateTime<FixedOffset>,
) -> Challenge {
    build(kind, kind.default_id().to_string(), progress, now)
}

/// Challenge measured against an enrollment's stored window
pub fn build_enrolled(enrollment: &ChallengeEnrollment, progress: &ChallengeProgress) -> Challenge {
    build(
        enrollment.kind,
        enrollment.id.clone(),
        progress,
        enrollment.start_date,
    )
}
