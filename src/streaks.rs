//! Streak detection
//!
//! A streak is the number of consecutive most-recent daily samples that meet
//! a qualifying threshold, counted from the latest sample backward. The scan
//! stops at the first miss or at the start of the series.
//!
//! Each streak type gets its data from a [`StreakDataProvider`]. Sleep is
//! always derived from the sleep series; exercise and goal-completion streaks
//! only exist when the caller supplies the matching activity log.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::models::{HistoricalLedger, MetricKind, StreakType, WellnessMetrics};

/// Minimum nightly sleep score that keeps a sleep streak alive
pub const SLEEP_STREAK_THRESHOLD: f64 = 75.0;

/// Minimum active minutes that count as an exercise day
pub const EXERCISE_MINUTES_THRESHOLD: f64 = 30.0;

/// Count consecutive samples `>= threshold`, scanning from the latest backward
pub fn count_streak(samples: &[f64], threshold: f64) -> u32 {
    samples
        .iter()
        .rev()
        .take_while(|value| **value >= threshold)
        .count() as u32
}

/// Live sleep streak for a metrics snapshot, 0 without a sleep series
pub fn sleep_streak(metrics: &WellnessMetrics) -> u32 {
    count_streak(metrics.samples(MetricKind::Sleep), SLEEP_STREAK_THRESHOLD)
}

/// Source of daily data for one streak type
pub trait StreakDataProvider: Send + Sync {
    /// Streak type this provider reports
    fn streak_type(&self) -> StreakType;

    /// Current run length in days
    fn current_streak(&self) -> u32;
}

/// Streak over numeric daily samples compared against a threshold
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdStreak {
    streak_type: StreakType,
    samples: Vec<f64>,
    threshold: f64,
}

impl ThresholdStreak {
    pub fn new(streak_type: StreakType, samples: Vec<f64>, threshold: f64) -> Self {
        Self {
            streak_type,
            samples,
            threshold,
        }
    }

    /// Sleep streak over the sleep series
    pub fn sleep(metrics: &WellnessMetrics) -> Self {
        Self::new(
            StreakType::Sleep,
            metrics.samples(MetricKind::Sleep).to_vec(),
            SLEEP_STREAK_THRESHOLD,
        )
    }

    /// Exercise streak over daily active minutes
    pub fn exercise_minutes(minutes: Vec<f64>) -> Self {
        Self::new(StreakType::Exercise, minutes, EXERCISE_MINUTES_THRESHOLD)
    }
}

impl StreakDataProvider for ThresholdStreak {
    fn streak_type(&self) -> StreakType {
        self.streak_type
    }

    fn current_streak(&self) -> u32 {
        count_streak(&self.samples, self.threshold)
    }
}

/// Streak over daily yes/no completion flags, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionStreak {
    streak_type: StreakType,
    days: Vec<bool>,
}

impl CompletionStreak {
    pub fn new(streak_type: StreakType, days: Vec<bool>) -> Self {
        Self { streak_type, days }
    }

    /// Days on which every daily goal was completed
    pub fn goals(days: Vec<bool>) -> Self {
        Self::new(StreakType::GoalCompletion, days)
    }
}

impl StreakDataProvider for CompletionStreak {
    fn streak_type(&self) -> StreakType {
        self.streak_type
    }

    fn current_streak(&self) -> u32 {
        self.days.iter().rev().take_while(|done| **done).count() as u32
    }
}

/// A streak as reported to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub streak_type: StreakType,

    /// Consecutive qualifying days up to today
    pub current: u32,

    /// Longest run seen, never below the ledger floor
    pub best: u32,

    /// `now - current` days
    pub start_date: DateTime<FixedOffset>,

    pub last_update: DateTime<FixedOffset>,
}

impl StreakRecord {
    pub fn new(
        streak_type: StreakType,
        current: u32,
        ledger: &HistoricalLedger,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            streak_type,
            current,
            best: current.max(ledger.best_streak(streak_type)),
            start_date: now - Duration::days(i64::from(current)),
            last_update: now,
        }
    }

    /// True when this run beats what the ledger has stored
    pub fn is_new_best(&self, ledger: &HistoricalLedger) -> bool {
        self.current > ledger.best_streak(self.streak_type)
    }
}
