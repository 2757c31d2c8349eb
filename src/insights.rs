//! Insight generation: morning briefing, weekly summary and smart notifications
//!
//! # Rule evaluation
//!
//! Each briefing field is decided by a fixed priority ladder. Rules are
//! checked top to bottom and the first match wins, even when a later rule
//! would describe the day better. All thresholds are constants so the same
//! snapshot always yields the same briefing.
//!
//! # Missing data
//!
//! Absent series fall back to sleep 75, readiness 70 and a weight change of
//! 0. A snapshot with no data at all produces a "maintain routine" briefing.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::models::{BehaviorPatterns, MetricKind, Trend, WellnessMetrics};
use crate::motivation::{self, IMPROVEMENT_THRESHOLD, WEIGHT_LOSS_THRESHOLD};
use crate::notifications::{self, Notification};
use crate::streaks;

/// Sleep below this makes sleep tonight's focus
pub const LOW_SLEEP_FOCUS: f64 = 70.0;

/// Readiness below this makes recovery today's focus
pub const LOW_READINESS_FOCUS: f64 = 70.0;

/// Sleep above this (with high readiness) clears the day for hard work
pub const PEAK_SLEEP_FOCUS: f64 = 85.0;

/// Readiness above this (with high sleep) clears the day for hard work
pub const PEAK_READINESS_FOCUS: f64 = 80.0;

/// Sleep level above which an upward trend is worth citing
pub const SLEEP_INSIGHT_FLOOR: f64 = 80.0;

/// Readiness below this calls for rest
pub const REST_READINESS: f64 = 60.0;

/// Readiness band (inclusive) for moderate activity
pub const MODERATE_READINESS_MIN: f64 = 70.0;
pub const MODERATE_READINESS_MAX: f64 = 80.0;

/// Minimum sleep streak worth mentioning in the motivation line
pub const MOTIVATION_STREAK_DAYS: u32 = 3;

/// Weekly change that earns a celebration line when no personal best exists
pub const CELEBRATION_CHANGE: f64 = 10.0;

/// What the day should revolve around
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BriefingFocus {
    PrioritizeSleep,
    PrioritizeRecovery,
    TackleHardestTasks,
    MaintainRoutine,
}

impl BriefingFocus {
    pub fn message(&self) -> &'static str {
        match self {
            BriefingFocus::PrioritizeSleep => "Prioritize sleep tonight",
            BriefingFocus::PrioritizeRecovery => "Prioritize recovery today",
            BriefingFocus::TackleHardestTasks => "Tackle your hardest tasks today",
            BriefingFocus::MaintainRoutine => "Maintain your routine",
        }
    }
}

impl fmt::Display for BriefingFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorningBriefing {
    pub focus: BriefingFocus,
    pub insight: String,
    pub recommendation: String,
    pub motivation: String,
    pub timestamp: DateTime<FixedOffset>,
}

/// Metric that moved the most this week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPerformer {
    pub metric: MetricKind,
    pub change: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyInsights {
    pub top_performer: TopPerformer,
    pub improvement: String,
    pub recommendation: String,
    pub celebration: String,
    pub week_start: DateTime<FixedOffset>,
    pub week_end: DateTime<FixedOffset>,
}

pub struct InsightGenerator {
    metrics: WellnessMetrics,
    patterns: BehaviorPatterns,
}

impl InsightGenerator {
    pub fn new(metrics: WellnessMetrics, patterns: BehaviorPatterns) -> Self {
        Self { metrics, patterns }
    }

    pub fn metrics(&self) -> &WellnessMetrics {
        &self.metrics
    }

    pub fn generate_morning_briefing(&self, now: DateTime<FixedOffset>) -> MorningBriefing {
        let focus = self.briefing_focus();
        debug!(?focus, "morning briefing focus selected");

        MorningBriefing {
            focus,
            insight: self.briefing_insight(),
            recommendation: self.briefing_recommendation(),
            motivation: self.briefing_motivation(),
            timestamp: now,
        }
    }

    fn briefing_focus(&self) -> BriefingFocus {
        let sleep = self.metrics.current(MetricKind::Sleep);
        let readiness = self.metrics.current(MetricKind::Readiness);

        if sleep < LOW_SLEEP_FOCUS {
            BriefingFocus::PrioritizeSleep
        } else if readiness < LOW_READINESS_FOCUS {
            BriefingFocus::PrioritizeRecovery
        } else if sleep > PEAK_SLEEP_FOCUS && readiness > PEAK_READINESS_FOCUS {
            BriefingFocus::TackleHardestTasks
        } else {
            BriefingFocus::MaintainRoutine
        }
    }

    fn briefing_insight(&self) -> String {
        let sleep_trend = self.metrics.trend(MetricKind::Sleep);
        let sleep = self.metrics.current(MetricKind::Sleep);

        if sleep_trend == Trend::Up && sleep > SLEEP_INSIGHT_FLOOR {
            format!(
                "Your sleep has improved {:.0}% this week and it shows.",
                self.metrics.change(MetricKind::Sleep)
            )
        } else if self.metrics.trend(MetricKind::Readiness) == Trend::Up {
            format!(
                "Readiness is building momentum, up {:.0}% this week.",
                self.metrics.change(MetricKind::Readiness)
            )
        } else if sleep_trend == Trend::Down {
            "Sleep dipped this week, so today leans toward recovery.".to_string()
        } else {
            "Your metrics are stable. Consistency is paying off.".to_string()
        }
    }

    fn briefing_recommendation(&self) -> String {
        let readiness = self.metrics.current(MetricKind::Readiness);

        if readiness < REST_READINESS {
            "Take it easy: rest, stretch, or go for a gentle walk.".to_string()
        } else if (MODERATE_READINESS_MIN..=MODERATE_READINESS_MAX).contains(&readiness) {
            "Moderate activity fits today, like a steady run or a strength session.".to_string()
        } else if readiness > MODERATE_READINESS_MAX {
            "You're cleared for high intensity training today.".to_string()
        } else {
            "Continue your usual routine.".to_string()
        }
    }

    fn briefing_motivation(&self) -> String {
        let streak = streaks::sleep_streak(&self.metrics);
        let sleep_change = self.metrics.change(MetricKind::Sleep);

        if streak >= MOTIVATION_STREAK_DAYS {
            format!("You're on a {}-day sleep streak. Keep it going tonight.", streak)
        } else if sleep_change > IMPROVEMENT_THRESHOLD {
            format!("Sleep is up {:.0}% this week. Your effort is showing.", sleep_change)
        } else {
            "Every healthy choice today adds up.".to_string()
        }
    }

    pub fn generate_weekly_insights(&self, now: DateTime<FixedOffset>) -> WeeklyInsights {
        let top_performer = self.top_performer();
        debug!(
            metric = %top_performer.metric,
            change = top_performer.change,
            "top performer selected"
        );

        WeeklyInsights {
            top_performer,
            improvement: self.weekly_improvement(),
            recommendation: self.weekly_recommendation(),
            celebration: self.weekly_celebration(),
            week_start: now - Duration::days(7),
            week_end: now,
        }
    }

    /// Largest absolute change wins; ties keep the earlier metric
    fn top_performer(&self) -> TopPerformer {
        let mut best = MetricKind::Sleep;
        for kind in &MetricKind::ALL[1..] {
            if self.metrics.change(*kind).abs() > self.metrics.change(best).abs() {
                best = *kind;
            }
        }

        let change = self.metrics.change(best);
        TopPerformer {
            metric: best,
            change,
            label: performer_label(best, change).to_string(),
        }
    }

    fn weekly_improvement(&self) -> String {
        let sleep = self.metrics.change(MetricKind::Sleep);
        let readiness = self.metrics.change(MetricKind::Readiness);
        let weight = self.metrics.change(MetricKind::Weight);

        if sleep > IMPROVEMENT_THRESHOLD {
            format!("Sleep improved {:.1}% this week", sleep)
        } else if readiness > IMPROVEMENT_THRESHOLD {
            format!("Readiness improved {:.1}% this week", readiness)
        } else if weight < WEIGHT_LOSS_THRESHOLD {
            format!("Weight down {:.1}% this week", weight.abs())
        } else {
            "Overall wellness held steady".to_string()
        }
    }

    fn weekly_recommendation(&self) -> String {
        if self.metrics.change(MetricKind::Sleep) > IMPROVEMENT_THRESHOLD {
            "Keep the bedtime routine that is working for you".to_string()
        } else if self.metrics.change(MetricKind::Readiness) > IMPROVEMENT_THRESHOLD {
            "Your body is adapting well, try adding one harder session".to_string()
        } else if self.metrics.change(MetricKind::Weight) < WEIGHT_LOSS_THRESHOLD {
            "Stay consistent with your nutrition habits".to_string()
        } else {
            "Maintain your routine".to_string()
        }
    }

    fn weekly_celebration(&self) -> String {
        let bests = motivation::personal_bests(&self.metrics).len();
        let sleep = self.metrics.change(MetricKind::Sleep);
        let readiness = self.metrics.change(MetricKind::Readiness);

        if bests > 0 {
            format!(
                "{} personal best{} this week!",
                bests,
                if bests == 1 { "" } else { "s" }
            )
        } else if sleep > CELEBRATION_CHANGE {
            format!("Sleep jumped {:.0}% this week!", sleep)
        } else if readiness > CELEBRATION_CHANGE {
            format!("Readiness jumped {:.0}% this week!", readiness)
        } else {
            "You showed up all week. That counts.".to_string()
        }
    }

    /// Every notification rule that matches right now, unfiltered
    pub fn generate_smart_notifications(&self, now: DateTime<FixedOffset>) -> Vec<Notification> {
        notifications::evaluate_rules(&self.metrics, &self.patterns, now)
    }
}

fn performer_label(metric: MetricKind, change: f64) -> &'static str {
    match metric {
        MetricKind::Sleep if change > 0.0 => "Sleep improving",
        MetricKind::Sleep if change < 0.0 => "Sleep recovering",
        MetricKind::Sleep => "Sleep holding steady",
        MetricKind::Readiness if change > 0.0 => "Readiness climbing",
        MetricKind::Readiness if change < 0.0 => "Readiness rebuilding",
        MetricKind::Readiness => "Readiness holding steady",
        MetricKind::Weight if change < 0.0 => "Weight trending down",
        MetricKind::Weight if change > 0.0 => "Weight trending up",
        MetricKind::Weight => "Weight holding steady",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeeklyMetricSeries;
    use chrono::TimeZone;

    fn test_now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 9, 10, 7, 30, 0)
            .unwrap()
    }

    fn series(kind: MetricKind, samples: Vec<f64>) -> Option<WeeklyMetricSeries> {
        Some(WeeklyMetricSeries::from_samples(kind, samples).unwrap())
    }

    fn generator(sleep: Vec<f64>, readiness: Vec<f64>) -> InsightGenerator {
        InsightGenerator::new(
            WellnessMetrics {
                sleep: series(MetricKind::Sleep, sleep),
                readiness: series(MetricKind::Readiness, readiness),
                weight: None,
            },
            BehaviorPatterns::default(),
        )
    }

    #[test]
    fn test_focus_ladder() {
        let focus = |sleep: f64, readiness: f64| {
            generator(vec![sleep], vec![readiness]).briefing_focus()
        };

        assert_eq!(focus(65.0, 50.0), BriefingFocus::PrioritizeSleep);
        assert_eq!(focus(75.0, 65.0), BriefingFocus::PrioritizeRecovery);
        assert_eq!(focus(90.0, 85.0), BriefingFocus::TackleHardestTasks);
        assert_eq!(focus(85.0, 85.0), BriefingFocus::MaintainRoutine);
        assert_eq!(focus(90.0, 80.0), BriefingFocus::MaintainRoutine);
    }

    #[test]
    fn test_missing_data_maintains_routine() {
        let generator =
            InsightGenerator::new(WellnessMetrics::default(), BehaviorPatterns::default());
        let briefing = generator.generate_morning_briefing(test_now());

        assert_eq!(briefing.focus, BriefingFocus::MaintainRoutine);
        assert_eq!(briefing.insight, "Your metrics are stable. Consistency is paying off.");
        // readiness defaults to 70, inside the moderate band
        assert!(briefing.recommendation.starts_with("Moderate activity"));
        assert_eq!(briefing.motivation, "Every healthy choice today adds up.");
        assert_eq!(briefing.timestamp, test_now());
    }

    #[test]
    fn test_insight_ladder() {
        let g = generator(vec![75.0, 82.0], vec![70.0, 80.0]);
        assert!(g.briefing_insight().starts_with("Your sleep has improved 9%"));

        // Sleep trend up but not above 80 falls through to readiness
        let g = generator(vec![70.0, 78.0], vec![70.0, 80.0]);
        assert!(g.briefing_insight().starts_with("Readiness is building momentum, up 14%"));

        let g = generator(vec![85.0, 78.0], vec![70.0, 70.0]);
        assert!(g.briefing_insight().starts_with("Sleep dipped"));
    }

    #[test]
    fn test_recommendation_bands() {
        let rec = |r: f64| generator(vec![80.0], vec![r]).briefing_recommendation();

        assert!(rec(59.0).starts_with("Take it easy"));
        assert_eq!(rec(65.0), "Continue your usual routine.");
        assert!(rec(70.0).starts_with("Moderate activity"));
        assert!(rec(80.0).starts_with("Moderate activity"));
        assert!(rec(81.0).contains("high intensity"));
    }

    #[test]
    fn test_motivation_prefers_streak() {
        let g = generator(vec![60.0, 76.0, 77.0, 78.0], vec![70.0]);
        assert_eq!(
            g.briefing_motivation(),
            "You're on a 3-day sleep streak. Keep it going tonight."
        );

        let g = generator(vec![60.0, 70.0, 66.0], vec![70.0]);
        assert!(g.briefing_motivation().starts_with("Sleep is up 10%"));
    }

    #[test]
    fn test_top_performer_tie_keeps_declaration_order() {
        let generator = InsightGenerator::new(
            WellnessMetrics {
                sleep: series(MetricKind::Sleep, vec![80.0, 88.0]),
                readiness: series(MetricKind::Readiness, vec![70.0, 63.0]),
                weight: series(MetricKind::Weight, vec![100.0, 90.0]),
            },
            BehaviorPatterns::default(),
        );

        let top = generator.top_performer();
        assert_eq!(top.metric, MetricKind::Sleep);
        assert_eq!(top.label, "Sleep improving");
    }

    #[test]
    fn test_top_performer_sign_label() {
        let generator = InsightGenerator::new(
            WellnessMetrics {
                sleep: series(MetricKind::Sleep, vec![80.0, 78.0]),
                readiness: series(MetricKind::Readiness, vec![70.0, 70.0]),
                weight: series(MetricKind::Weight, vec![200.0, 190.0]),
            },
            BehaviorPatterns::default(),
        );

        let top = generator.top_performer();
        assert_eq!(top.metric, MetricKind::Weight);
        assert_eq!(top.label, "Weight trending down");
    }

    #[test]
    fn test_weekly_defaults_and_window() {
        let generator =
            InsightGenerator::new(WellnessMetrics::default(), BehaviorPatterns::default());
        let weekly = generator.generate_weekly_insights(test_now());

        assert_eq!(weekly.top_performer.metric, MetricKind::Sleep);
        assert_eq!(weekly.top_performer.label, "Sleep holding steady");
        assert_eq!(weekly.improvement, "Overall wellness held steady");
        assert_eq!(weekly.recommendation, "Maintain your routine");
        assert_eq!(weekly.week_start, test_now() - Duration::days(7));
        assert_eq!(weekly.week_end, test_now());
    }

    #[test]
    fn test_weekly_celebration_prefers_personal_bests() {
        let g = generator(vec![70.0, 92.0], vec![70.0, 86.0]);
        assert_eq!(g.weekly_celebration(), "2 personal bests this week!");

        let g = generator(vec![70.0, 80.0], vec![70.0, 70.0]);
        assert_eq!(g.weekly_celebration(), "Sleep jumped 14% this week!");
    }

    #[test]
    fn test_weekly_improvement_order() {
        let g = InsightGenerator::new(
            WellnessMetrics {
                sleep: series(MetricKind::Sleep, vec![80.0, 80.0]),
                readiness: series(MetricKind::Readiness, vec![70.0, 70.0]),
                weight: series(MetricKind::Weight, vec![200.0, 196.0]),
            },
            BehaviorPatterns::default(),
        );
        assert_eq!(g.weekly_improvement(), "Weight down 2.0% this week");
        assert_eq!(g.weekly_recommendation(), "Stay consistent with your nutrition habits");
    }
}
