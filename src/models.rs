//! Shared data model: metric series, behavior patterns and the historical ledger
//!
//! Everything in here is input to the engines. Output artifacts live next to
//! the code that derives them (`insights`, `notifications`, `motivation`,
//! `streaks`, `achievements`, `challenges`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidationError;

/// Default sleep score when no sleep series is available
pub const DEFAULT_SLEEP_SCORE: f64 = 75.0;

/// Default readiness score when no readiness series is available
pub const DEFAULT_READINESS_SCORE: f64 = 70.0;

/// Tracked wellness metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Sleep,
    Readiness,
    Weight,
}

impl MetricKind {
    /// Declaration order, also the tie-break order when ranking metrics
    pub const ALL: [MetricKind; 3] = [MetricKind::Sleep, MetricKind::Readiness, MetricKind::Weight];

    /// Percentage change beyond which the trend leaves `Stable`
    ///
    /// Weight moves slowly, so half a percent is already meaningful.
    pub fn trend_threshold(&self) -> f64 {
        match self {
            MetricKind::Sleep | MetricKind::Readiness => 1.0,
            MetricKind::Weight => 0.5,
        }
    }

    /// Value assumed for `current` when the series is absent
    pub fn default_current(&self) -> f64 {
        match self {
            MetricKind::Sleep => DEFAULT_SLEEP_SCORE,
            MetricKind::Readiness => DEFAULT_READINESS_SCORE,
            MetricKind::Weight => 0.0,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Sleep => write!(f, "sleep"),
            MetricKind::Readiness => write!(f, "readiness"),
            MetricKind::Weight => write!(f, "weight"),
        }
    }
}

/// Coarse direction of a metric over its window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}

impl Trend {
    /// Classify a percentage change; both boundaries are exclusive
    pub fn from_change(change: f64, threshold: f64) -> Self {
        if change > threshold {
            Trend::Up
        } else if change < -threshold {
            Trend::Down
        } else {
            Trend::Stable
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Percentage change of `last` relative to `first`
///
/// Returns 0 when `first` is zero.
pub fn percent_change(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        return 0.0;
    }
    (last - first) / first * 100.0
}

/// One metric's recent daily samples plus the values derived from them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyMetricSeries {
    /// Latest value (last daily sample)
    pub current: f64,

    /// Direction derived from `change`
    pub trend: Trend,

    /// Daily samples, oldest first, no gaps
    pub weekly_data: Vec<f64>,

    /// Percentage change of `current` relative to the first sample
    pub change: f64,
}

impl WeeklyMetricSeries {
    /// Build a series from raw daily samples, deriving current, change and trend
    pub fn from_samples(kind: MetricKind, samples: Vec<f64>) -> Result<Self, ValidationError> {
        let (first, latest) = match (samples.first(), samples.last()) {
            (Some(first), Some(latest)) => (*first, *latest),
            _ => return Err(ValidationError::EmptySeries { metric: kind }),
        };

        if let Some(index) = samples.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::NonFiniteSample { metric: kind, index });
        }

        let change = percent_change(first, latest);

        Ok(Self {
            current: latest,
            trend: Trend::from_change(change, kind.trend_threshold()),
            weekly_data: samples,
            change,
        })
    }

    /// Highest sample in the visible window
    pub fn peak(&self) -> f64 {
        self.weekly_data
            .iter()
            .copied()
            .fold(self.current, f64::max)
    }
}

/// The three tracked metric series; any of them may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellnessMetrics {
    #[serde(default)]
    pub sleep: Option<WeeklyMetricSeries>,

    #[serde(default)]
    pub readiness: Option<WeeklyMetricSeries>,

    #[serde(default)]
    pub weight: Option<WeeklyMetricSeries>,
}

impl WellnessMetrics {
    pub fn series(&self, kind: MetricKind) -> Option<&WeeklyMetricSeries> {
        match kind {
            MetricKind::Sleep => self.sleep.as_ref(),
            MetricKind::Readiness => self.readiness.as_ref(),
            MetricKind::Weight => self.weight.as_ref(),
        }
    }

    /// Latest value, or the documented default when the series is absent
    pub fn current(&self, kind: MetricKind) -> f64 {
        self.series(kind)
            .map(|s| s.current)
            .unwrap_or_else(|| kind.default_current())
    }

    /// Weekly percentage change, 0 when the series is absent
    pub fn change(&self, kind: MetricKind) -> f64 {
        self.series(kind).map(|s| s.change).unwrap_or(0.0)
    }

    pub fn trend(&self, kind: MetricKind) -> Trend {
        self.series(kind).map(|s| s.trend).unwrap_or_default()
    }

    /// Daily samples, empty when the series is absent
    pub fn samples(&self, kind: MetricKind) -> &[f64] {
        self.series(kind)
            .map(|s| s.weekly_data.as_slice())
            .unwrap_or(&[])
    }

    /// Sum of absolute weekly changes across all three metrics
    pub fn total_absolute_change(&self) -> f64 {
        MetricKind::ALL.iter().map(|k| self.change(*k).abs()).sum()
    }
}

/// Sleep-related behavior correlations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepPatterns {
    /// Sleep improves on days with an evening walk
    #[serde(default)]
    pub evening_walks: bool,
}

/// Behavior/outcome correlations supplied by the pattern service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorPatterns {
    #[serde(default)]
    pub sleep: SleepPatterns,
}

/// Kinds of streaks the engine reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakType {
    Sleep,
    Exercise,
    GoalCompletion,
}

impl fmt::Display for StreakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreakType::Sleep => write!(f, "sleep"),
            StreakType::Exercise => write!(f, "exercise"),
            StreakType::GoalCompletion => write!(f, "goal_completion"),
        }
    }
}

/// Ledger write the caller should persist after accepting engine output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum LedgerUpdate {
    /// Record that an achievement was awarded so it is not emitted again
    MarkAwarded { achievement_id: String },

    /// Raise the stored best run for a streak type
    RaiseBestStreak { streak_type: StreakType, best: u32 },
}

/// Caller-owned record of awarded achievements and best streaks
///
/// The engines only read it. Updates travel back as [`LedgerUpdate`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalLedger {
    /// Achievement id -> already unlocked
    #[serde(default)]
    pub achievements: BTreeMap<String, bool>,

    /// Best run ever recorded per streak type
    #[serde(default)]
    pub best_streaks: BTreeMap<StreakType, u32>,
}

impl HistoricalLedger {
    pub fn is_awarded(&self, achievement_id: &str) -> bool {
        self.achievements
            .get(achievement_id)
            .copied()
            .unwrap_or(false)
    }

    /// Best-streak floor, 0 when nothing was recorded
    pub fn best_streak(&self, streak_type: StreakType) -> u32 {
        self.best_streaks.get(&streak_type).copied().unwrap_or(0)
    }

    /// Apply an update returned by the engine; best streaks never decrease
    pub fn apply(&mut self, update: &LedgerUpdate) {
        match update {
            LedgerUpdate::MarkAwarded { achievement_id } => {
                self.achievements.insert(achievement_id.clone(), true);
            }
            LedgerUpdate::RaiseBestStreak { streak_type, best } => {
                let entry = self.best_streaks.entry(*streak_type).or_insert(0);
                *entry = (*entry).max(*best);
            }
        }
    }
}
