//! Input boundary: coaching snapshots and ledger files
//!
//! The engines assume well-typed, finite series. This module is where that is
//! enforced. A snapshot is parsed from JSON, every series is checked, and
//! only then are the engines constructed.
//!
//! Series may be given either as a bare array of daily samples (current,
//! change and trend are derived) or as a full object from the aggregator.
//!
//! ```json
//! {
//!   "metrics": {
//!     "sleep": [78, 80, 82, 85, 83, 82, 84],
//!     "readiness": {"current": 75, "trend": "up", "weekly_data": [73, 75], "change": 2.7}
//!   },
//!   "patterns": {"sleep": {"evening_walks": true}},
//!   "ledger": {"achievements": {"sleep_champion": true}, "best_streaks": {"sleep": 9}}
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::challenges::ChallengeEnrollment;
use crate::error::{CoachError, Result, ValidationError};
use crate::insights::InsightGenerator;
use crate::models::{
    percent_change, BehaviorPatterns, HistoricalLedger, MetricKind, Trend, WeeklyMetricSeries,
    WellnessMetrics,
};
use crate::motivation::MotivationEngine;
use crate::notifications::SeenNotifications;
use crate::streaks::{CompletionStreak, ThresholdStreak};

/// Allowed gap between a reported `current` and the latest sample
const CURRENT_TOLERANCE: f64 = 1e-6;

/// Allowed gap, in percentage points, between a reported `change` and the
/// samples; aggregators round to one decimal
const CHANGE_TOLERANCE: f64 = 0.05;

/// A series as it may appear in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesInput {
    /// Raw daily samples, oldest first
    Samples(Vec<f64>),
    /// Fully derived series from the aggregator
    Series(WeeklyMetricSeries),
}

impl SeriesInput {
    fn resolve(self, kind: MetricKind) -> std::result::Result<WeeklyMetricSeries, ValidationError> {
        match self {
            SeriesInput::Samples(samples) => WeeklyMetricSeries::from_samples(kind, samples),
            SeriesInput::Series(series) => {
                validate_series(kind, &series)?;
                Ok(series)
            }
        }
    }
}

fn validate_series(
    kind: MetricKind,
    series: &WeeklyMetricSeries,
) -> std::result::Result<(), ValidationError> {
    let (first, latest) = match (series.weekly_data.first(), series.weekly_data.last()) {
        (Some(first), Some(latest)) => (*first, *latest),
        _ => return Err(ValidationError::EmptySeries { metric: kind }),
    };

    if let Some(index) = series.weekly_data.iter().position(|v| !v.is_finite()) {
        return Err(ValidationError::NonFiniteSample { metric: kind, index });
    }

    if !series.current.is_finite() || !series.change.is_finite() {
        return Err(ValidationError::NonFiniteSample {
            metric: kind,
            index: series.weekly_data.len() - 1,
        });
    }

    if (series.current - latest).abs() > CURRENT_TOLERANCE {
        return Err(ValidationError::CurrentMismatch {
            metric: kind,
            current: series.current,
            latest,
        });
    }

    let derived = percent_change(first, latest);
    if (series.change - derived).abs() > CHANGE_TOLERANCE {
        return Err(ValidationError::ChangeMismatch {
            metric: kind,
            change: series.change,
            derived,
        });
    }

    let derived_trend = Trend::from_change(derived, kind.trend_threshold());
    if series.trend != derived_trend {
        return Err(ValidationError::TrendMismatch {
            metric: kind,
            trend: series.trend,
            derived: derived_trend,
        });
    }

    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsInput {
    #[serde(default)]
    pub sleep: Option<SeriesInput>,
    #[serde(default)]
    pub readiness: Option<SeriesInput>,
    #[serde(default)]
    pub weight: Option<SeriesInput>,
}

/// Optional daily logs that feed the non-sleep streaks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    /// Active minutes per day, oldest first
    #[serde(default)]
    pub exercise_minutes: Option<Vec<f64>>,

    /// Whether all daily goals were completed, oldest first
    #[serde(default)]
    pub goals_completed: Option<Vec<bool>>,
}

impl ActivityLog {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if let Some(minutes) = &self.exercise_minutes {
            if let Some(index) = minutes.iter().position(|m| !m.is_finite() || *m < 0.0) {
                return Err(ValidationError::InvalidActivity {
                    field: "exercise_minutes".to_string(),
                    reason: format!("entry {} must be a non-negative number", index),
                });
            }
        }
        Ok(())
    }
}

/// Snapshot exactly as read from JSON, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub metrics: MetricsInput,
    #[serde(default)]
    pub patterns: BehaviorPatterns,
    #[serde(default)]
    pub ledger: HistoricalLedger,
    #[serde(default)]
    pub activity: ActivityLog,
    #[serde(default)]
    pub enrollments: Vec<ChallengeEnrollment>,
    #[serde(default)]
    pub seen_notifications: SeenNotifications,
}

/// A validated snapshot, ready to drive both engines
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoachingSnapshot {
    pub metrics: WellnessMetrics,
    pub patterns: BehaviorPatterns,
    pub ledger: HistoricalLedger,
    pub activity: ActivityLog,
    pub enrollments: Vec<ChallengeEnrollment>,
    pub seen_notifications: SeenNotifications,
}

impl CoachingSnapshot {
    /// Validate a raw snapshot
    pub fn from_raw(raw: RawSnapshot) -> Result<Self> {
        match Self::validate(raw) {
            Ok(snapshot) => {
                debug!(
                    sleep = snapshot.metrics.sleep.is_some(),
                    readiness = snapshot.metrics.readiness.is_some(),
                    weight = snapshot.metrics.weight.is_some(),
                    "snapshot validated"
                );
                Ok(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "snapshot rejected");
                Err(err.into())
            }
        }
    }

    fn validate(raw: RawSnapshot) -> std::result::Result<Self, ValidationError> {
        let resolve = |input: Option<SeriesInput>, kind: MetricKind| {
            input.map(|series| series.resolve(kind)).transpose()
        };

        let metrics = WellnessMetrics {
            sleep: resolve(raw.metrics.sleep, MetricKind::Sleep)?,
            readiness: resolve(raw.metrics.readiness, MetricKind::Readiness)?,
            weight: resolve(raw.metrics.weight, MetricKind::Weight)?,
        };
        raw.activity.validate()?;

        Ok(Self {
            metrics,
            patterns: raw.patterns,
            ledger: raw.ledger,
            activity: raw.activity,
            enrollments: raw.enrollments,
            seen_notifications: raw.seen_notifications,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoachError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn insight_generator(&self) -> InsightGenerator {
        InsightGenerator::new(self.metrics.clone(), self.patterns)
    }

    /// Motivation engine with every streak source the snapshot carries
    pub fn motivation_engine(&self) -> MotivationEngine {
        let mut engine = MotivationEngine::new(self.metrics.clone(), self.ledger.clone());

        if let Some(minutes) = &self.activity.exercise_minutes {
            engine =
                engine.with_streak_provider(ThresholdStreak::exercise_minutes(minutes.clone()));
        }
        if let Some(days) = &self.activity.goals_completed {
            engine = engine.with_streak_provider(CompletionStreak::goals(days.clone()));
        }

        engine
    }
}

/// Read a ledger file
pub fn load_ledger<P: AsRef<Path>>(path: P) -> Result<HistoricalLedger> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CoachError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a ledger file, creating parent directories as needed
pub fn save_ledger<P: AsRef<Path>>(path: P, ledger: &HistoricalLedger) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(ledger)?;
    fs::write(path, json)?;
    debug!(path = %path.display(), "ledger saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreakType;
    use tempfile::tempdir;

    #[test]
    fn test_parse_mixed_series_forms() {
        let json = r#"{
            "metrics": {
                "sleep": [78, 80, 82, 85, 83, 82, 84],
                "readiness": {"current": 75, "trend": "up", "weekly_data": [73, 75], "change": 2.74}
            },
            "patterns": {"sleep": {"evening_walks": true}}
        }"#;
        let snapshot = CoachingSnapshot::from_json_str(json).unwrap();

        let sleep = snapshot.metrics.sleep.as_ref().unwrap();
        assert_eq!(sleep.current, 84.0);
        assert_eq!(sleep.trend, Trend::Up);
        assert_eq!(snapshot.metrics.readiness.as_ref().unwrap().change, 2.74);
        assert!(snapshot.metrics.weight.is_none());
        assert!(snapshot.patterns.sleep.evening_walks);
    }

    #[test]
    fn test_empty_object_is_valid() {
        let snapshot = CoachingSnapshot::from_json_str("{}").unwrap();
        assert_eq!(snapshot.metrics, WellnessMetrics::default());
        assert!(snapshot.enrollments.is_empty());
    }

    #[test]
    fn test_rejects_empty_series() {
        let err = CoachingSnapshot::from_json_str(r#"{"metrics": {"sleep": []}}"#).unwrap_err();
        assert!(matches!(
            err,
            CoachError::Validation(ValidationError::EmptySeries {
                metric: MetricKind::Sleep
            })
        ));
    }

    #[test]
    fn test_rejects_current_mismatch() {
        let json = r#"{"metrics": {"weight": {
            "current": 170, "trend": "up", "weekly_data": [165, 166], "change": 0.6
        }}}"#;
        let err = CoachingSnapshot::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            CoachError::Validation(ValidationError::CurrentMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_change_mismatch() {
        // 78 -> 84 is +7.7%, not -40%
        let json = r#"{"metrics": {"sleep": {
            "current": 84, "trend": "down", "weekly_data": [78, 84], "change": -40.0
        }}}"#;
        let err = CoachingSnapshot::from_json_str(json).unwrap_err();
        match err {
            CoachError::Validation(ValidationError::ChangeMismatch {
                metric,
                change,
                derived,
            }) => {
                assert_eq!(metric, MetricKind::Sleep);
                assert_eq!(change, -40.0);
                assert!((derived - 600.0 / 78.0).abs() < 1e-9);
            }
            other => panic!("expected change mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_trend_mismatch() {
        let json = r#"{"metrics": {"sleep": {
            "current": 84, "trend": "down", "weekly_data": [78, 84], "change": 7.69
        }}}"#;
        let err = CoachingSnapshot::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            CoachError::Validation(ValidationError::TrendMismatch {
                metric: MetricKind::Sleep,
                trend: Trend::Down,
                derived: Trend::Up,
            })
        ));

        // Within the weight band a small move is stable
        let json = r#"{"metrics": {"weight": {
            "current": 165.5, "trend": "stable", "weekly_data": [165.0, 165.5], "change": 0.3
        }}}"#;
        assert!(CoachingSnapshot::from_json_str(json).is_ok());
    }

    #[test]
    fn test_rejects_non_numeric_samples() {
        let err =
            CoachingSnapshot::from_json_str(r#"{"metrics": {"sleep": ["eighty"]}}"#).unwrap_err();
        assert!(matches!(err, CoachError::Json(_)));
    }

    #[test]
    fn test_rejects_negative_exercise_minutes() {
        let json = r#"{"activity": {"exercise_minutes": [30, -5]}}"#;
        let err = CoachingSnapshot::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            CoachError::Validation(ValidationError::InvalidActivity { .. })
        ));
    }

    #[test]
    fn test_activity_feeds_streaks() {
        let json = r#"{
            "metrics": {"sleep": [80, 81]},
            "activity": {"exercise_minutes": [45, 50, 31], "goals_completed": [true, true]}
        }"#;
        let snapshot = CoachingSnapshot::from_json_str(json).unwrap();
        let now = chrono::DateTime::parse_from_rfc3339("2024-09-23T08:00:00+00:00").unwrap();

        let streaks = snapshot.motivation_engine().generate_streaks(now);
        let types: Vec<StreakType> = streaks.iter().map(|s| s.streak_type).collect();
        assert_eq!(
            types,
            vec![StreakType::Sleep, StreakType::Exercise, StreakType::GoalCompletion]
        );
    }

    #[test]
    fn test_ledger_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");

        let mut ledger = HistoricalLedger::default();
        ledger.achievements.insert("sleep_champion".to_string(), true);
        ledger.best_streaks.insert(StreakType::Sleep, 8);

        save_ledger(&path, &ledger).unwrap();
        assert_eq!(load_ledger(&path).unwrap(), ledger);
    }

    #[test]
    fn test_missing_files() {
        let dir = tempdir().unwrap();
        let err = load_ledger(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CoachError::FileNotFound { .. }));

        let err = CoachingSnapshot::load_from_file(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CoachError::FileNotFound { .. }));
    }
}
