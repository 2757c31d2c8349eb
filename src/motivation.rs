//! Motivation engine: celebrations, streaks, achievements and challenges
//!
//! A `MotivationEngine` is bound to one metrics snapshot and one read-only
//! ledger. Every artifact is a pure projection of `(metrics, ledger, now)`;
//! nothing carries over between calls except what the caller writes back
//! into its ledger.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::achievements::{self, AchievementBadge, AchievementUnlock};
use crate::challenges::{self, Challenge, ChallengeEnrollment, ChallengeKind, ChallengeProgress};
use crate::models::{HistoricalLedger, LedgerUpdate, MetricKind, StreakType, WellnessMetrics};
use crate::streaks::{self, StreakDataProvider, StreakRecord};

/// Streak length that earns a celebration
pub const STREAK_CELEBRATION_DAYS: u32 = 3;

/// Weekly change in percent that counts as an improvement for sleep/readiness
pub const IMPROVEMENT_THRESHOLD: f64 = 5.0;

/// Weekly weight change in percent that counts as progress
pub const WEIGHT_LOSS_THRESHOLD: f64 = -1.0;

/// Sleep score that counts as a personal best
pub const SLEEP_PERSONAL_BEST: f64 = 90.0;

/// Readiness score that counts as a personal best
pub const READINESS_PERSONAL_BEST: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CelebrationType {
    Streak,
    Improvement,
    PersonalBest,
    Achievement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressCelebration {
    #[serde(rename = "type")]
    pub celebration_type: CelebrationType,
    pub title: String,
    pub description: String,
    pub value: f64,
    pub icon: String,
    pub color: String,
}

impl ProgressCelebration {
    fn new(
        celebration_type: CelebrationType,
        title: String,
        description: String,
        value: f64,
        icon: &str,
        color: &str,
    ) -> Self {
        Self {
            celebration_type,
            title,
            description,
            value,
            icon: icon.to_string(),
            color: color.to_string(),
        }
    }

    /// Celebrate a freshly unlocked badge
    pub fn from_badge(badge: &AchievementBadge) -> Self {
        Self::new(
            CelebrationType::Achievement,
            format!("Unlocked: {}", badge.name),
            badge.description.clone(),
            1.0,
            &badge.icon,
            &badge.color,
        )
    }
}

/// Peaks within the visible window that clear the personal-best thresholds
///
/// Only the supplied samples are considered; there is no long-horizon store.
pub fn personal_bests(metrics: &WellnessMetrics) -> Vec<ProgressCelebration> {
    let mut bests = Vec::new();

    if let Some(sleep) = metrics.series(MetricKind::Sleep) {
        let peak = sleep.peak();
        if peak >= SLEEP_PERSONAL_BEST {
            bests.push(ProgressCelebration::new(
                CelebrationType::PersonalBest,
                "Sleep personal best".to_string(),
                format!("You reached a sleep score of {:.0} this week.", peak),
                peak,
                "trophy",
                "#EAB308",
            ));
        }
    }

    if let Some(readiness) = metrics.series(MetricKind::Readiness) {
        let peak = readiness.peak();
        if peak >= READINESS_PERSONAL_BEST {
            bests.push(ProgressCelebration::new(
                CelebrationType::PersonalBest,
                "Readiness personal best".to_string(),
                format!("You reached a readiness score of {:.0} this week.", peak),
                peak,
                "trophy",
                "#EAB308",
            ));
        }
    }

    bests
}

pub struct MotivationEngine {
    metrics: WellnessMetrics,
    ledger: HistoricalLedger,
    providers: Vec<Box<dyn StreakDataProvider>>,
}

impl MotivationEngine {
    pub fn new(metrics: WellnessMetrics, ledger: HistoricalLedger) -> Self {
        Self {
            metrics,
            ledger,
            providers: Vec::new(),
        }
    }

    /// Attach a data source for an additional streak type
    ///
    /// The sleep streak always comes from the sleep series; sleep providers
    /// are ignored.
    pub fn with_streak_provider(mut self, provider: impl StreakDataProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn metrics(&self) -> &WellnessMetrics {
        &self.metrics
    }

    pub fn ledger(&self) -> &HistoricalLedger {
        &self.ledger
    }

    /// Live sleep streak (threshold 75)
    pub fn sleep_streak(&self) -> u32 {
        streaks::sleep_streak(&self.metrics)
    }

    pub fn generate_progress_celebrations(&self) -> Vec<ProgressCelebration> {
        let mut celebrations = Vec::new();

        let streak = self.sleep_streak();
        if streak >= STREAK_CELEBRATION_DAYS {
            celebrations.push(ProgressCelebration::new(
                CelebrationType::Streak,
                format!("{}-day sleep streak", streak),
                format!("You've hit your sleep target {} nights in a row.", streak),
                f64::from(streak),
                "flame",
                "#F97316",
            ));
        }

        let sleep_change = self.metrics.change(MetricKind::Sleep);
        if sleep_change > IMPROVEMENT_THRESHOLD {
            celebrations.push(ProgressCelebration::new(
                CelebrationType::Improvement,
                "Sleep is improving".to_string(),
                format!("Your sleep score is up {:.1}% this week.", sleep_change),
                sleep_change,
                "moon",
                "#6366F1",
            ));
        }

        let readiness_change = self.metrics.change(MetricKind::Readiness);
        if readiness_change > IMPROVEMENT_THRESHOLD {
            celebrations.push(ProgressCelebration::new(
                CelebrationType::Improvement,
                "Readiness is climbing".to_string(),
                format!("Your readiness is up {:.1}% this week.", readiness_change),
                readiness_change,
                "zap",
                "#10B981",
            ));
        }

        let weight_change = self.metrics.change(MetricKind::Weight);
        if weight_change < WEIGHT_LOSS_THRESHOLD {
            celebrations.push(ProgressCelebration::new(
                CelebrationType::Improvement,
                "Weight is trending down".to_string(),
                format!("You're down {:.1}% this week. Steady progress.", weight_change.abs()),
                weight_change.abs(),
                "scale",
                "#0EA5E9",
            ));
        }

        celebrations.extend(self.identify_personal_bests());

        debug!(count = celebrations.len(), "progress celebrations generated");
        celebrations
    }

    pub fn identify_personal_bests(&self) -> Vec<ProgressCelebration> {
        personal_bests(&self.metrics)
    }

    /// One record per streak type with a live run
    pub fn generate_streaks(&self, now: DateTime<FixedOffset>) -> Vec<StreakRecord> {
        let mut records = Vec::new();

        let sleep = self.sleep_streak();
        if sleep > 0 {
            records.push(StreakRecord::new(StreakType::Sleep, sleep, &self.ledger, now));
        }

        for provider in &self.providers {
            let streak_type = provider.streak_type();
            if streak_type == StreakType::Sleep {
                continue;
            }
            let current = provider.current_streak();
            if current > 0 {
                records.push(StreakRecord::new(streak_type, current, &self.ledger, now));
            }
        }

        debug!(count = records.len(), "streaks generated");
        records
    }

    /// Best-streak raises the caller should persist
    pub fn streak_updates(&self, now: DateTime<FixedOffset>) -> Vec<LedgerUpdate> {
        self.generate_streaks(now)
            .into_iter()
            .filter(|record| record.is_new_best(&self.ledger))
            .map(|record| LedgerUpdate::RaiseBestStreak {
                streak_type: record.streak_type,
                best: record.current,
            })
            .collect()
    }

    /// New badges paired with the ledger write that records them
    pub fn achievement_unlocks(&self, now: DateTime<FixedOffset>) -> Vec<AchievementUnlock> {
        achievements::evaluate(&self.metrics, &self.ledger, self.sleep_streak(), now)
    }

    /// Badges whose condition holds and whose ledger flag is not set
    ///
    /// The ledger is not touched, so a second call with the same ledger
    /// returns the same badges.
    pub fn generate_achievements(&self, now: DateTime<FixedOffset>) -> Vec<AchievementBadge> {
        self.achievement_unlocks(now)
            .into_iter()
            .map(|unlock| unlock.badge)
            .collect()
    }

    pub fn challenge_progress(&self) -> ChallengeProgress {
        ChallengeProgress::from_metrics(&self.metrics, self.sleep_streak())
    }

    /// The three standard challenges, anchored at `now`
    pub fn generate_challenges(&self, now: DateTime<FixedOffset>) -> Vec<Challenge> {
        let progress = self.challenge_progress();
        ChallengeKind::ALL
            .iter()
            .map(|kind| challenges::build_fresh(*kind, &progress, now))
            .collect()
    }

    /// Score caller-stored enrollments against their fixed windows
    pub fn evaluate_enrollments(&self, enrollments: &[ChallengeEnrollment]) -> Vec<Challenge> {
        let progress = self.challenge_progress();
        enrollments
            .iter()
            .map(|enrollment| challenges::build_enrolled(enrollment, &progress))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::SLEEP_CHAMPION;
    use crate::models::WeeklyMetricSeries;
    use crate::streaks::{CompletionStreak, ThresholdStreak};
    use chrono::{Duration, TimeZone};

    fn test_now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 9, 23, 8, 0, 0)
            .unwrap()
    }

    fn series(kind: MetricKind, samples: Vec<f64>) -> Option<WeeklyMetricSeries> {
        Some(WeeklyMetricSeries::from_samples(kind, samples).unwrap())
    }

    fn strong_week() -> WellnessMetrics {
        WellnessMetrics {
            sleep: series(
                MetricKind::Sleep,
                vec![78.0, 80.0, 82.0, 85.0, 83.0, 82.0, 84.0],
            ),
            readiness: series(
                MetricKind::Readiness,
                vec![73.0, 75.0, 74.0, 76.0, 75.0, 75.0, 75.0],
            ),
            weight: series(
                MetricKind::Weight,
                vec![166.1, 165.8, 165.5, 165.3, 165.4, 165.2, 165.2],
            ),
        }
    }

    #[test]
    fn test_celebrations_for_strong_week() {
        let engine = MotivationEngine::new(strong_week(), HistoricalLedger::default());
        let celebrations = engine.generate_progress_celebrations();

        let types: Vec<CelebrationType> = celebrations.iter().map(|c| c.celebration_type).collect();
        // 7-day streak, sleep +7.7%; readiness +2.7% and weight -0.54% are below their thresholds
        assert_eq!(types, vec![CelebrationType::Streak, CelebrationType::Improvement]);
        assert_eq!(celebrations[0].value, 7.0);
        assert_eq!(celebrations[0].title, "7-day sleep streak");
    }

    #[test]
    fn test_weight_loss_celebration_is_positive() {
        let metrics = WellnessMetrics {
            weight: series(MetricKind::Weight, vec![180.0, 176.4]),
            ..Default::default()
        };
        let engine = MotivationEngine::new(metrics, HistoricalLedger::default());
        let celebrations = engine.generate_progress_celebrations();

        assert_eq!(celebrations.len(), 1);
        assert!(celebrations[0].value > 0.0);
        assert!(celebrations[0].description.contains("down 2.0%"));
    }

    #[test]
    fn test_personal_bests_within_window() {
        let metrics = WellnessMetrics {
            sleep: series(MetricKind::Sleep, vec![80.0, 91.0, 70.0]),
            readiness: series(MetricKind::Readiness, vec![84.0, 84.9]),
            ..Default::default()
        };
        let bests = personal_bests(&metrics);

        assert_eq!(bests.len(), 1);
        assert_eq!(bests[0].celebration_type, CelebrationType::PersonalBest);
        assert_eq!(bests[0].value, 91.0);

        assert!(personal_bests(&WellnessMetrics::default()).is_empty());
    }

    #[test]
    fn test_streaks_include_providers() {
        let engine = MotivationEngine::new(strong_week(), HistoricalLedger::default())
            .with_streak_provider(ThresholdStreak::exercise_minutes(vec![40.0, 35.0]))
            .with_streak_provider(CompletionStreak::goals(vec![true, false]))
            .with_streak_provider(ThresholdStreak::new(StreakType::Sleep, vec![99.0; 20], 75.0));

        let streaks = engine.generate_streaks(test_now());
        let types: Vec<StreakType> = streaks.iter().map(|s| s.streak_type).collect();

        assert_eq!(types, vec![StreakType::Sleep, StreakType::Exercise]);
        assert_eq!(streaks[0].current, 7);
        assert_eq!(streaks[0].start_date, test_now() - Duration::days(7));
        assert_eq!(streaks[1].current, 2);
    }

    #[test]
    fn test_no_streaks_without_data() {
        let engine = MotivationEngine::new(WellnessMetrics::default(), HistoricalLedger::default());
        assert!(engine.generate_streaks(test_now()).is_empty());
        assert!(engine.streak_updates(test_now()).is_empty());
    }

    #[test]
    fn test_streak_updates_only_when_floor_beaten() {
        let mut ledger = HistoricalLedger::default();
        ledger.best_streaks.insert(StreakType::Sleep, 10);
        let engine = MotivationEngine::new(strong_week(), ledger);
        assert!(engine.streak_updates(test_now()).is_empty());
        assert_eq!(engine.generate_streaks(test_now())[0].best, 10);

        let engine = MotivationEngine::new(strong_week(), HistoricalLedger::default());
        assert_eq!(
            engine.streak_updates(test_now()),
            vec![LedgerUpdate::RaiseBestStreak {
                streak_type: StreakType::Sleep,
                best: 7
            }]
        );
    }

    #[test]
    fn test_achievements_not_suppressed_without_ledger_write() {
        let engine = MotivationEngine::new(strong_week(), HistoricalLedger::default());

        let first = engine.generate_achievements(test_now());
        let second = engine.generate_achievements(test_now());

        assert_eq!(first, second);
        let ids: Vec<&str> = first.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec![SLEEP_CHAMPION]);
    }

    #[test]
    fn test_no_achievements_without_metrics() {
        let engine = MotivationEngine::new(WellnessMetrics::default(), HistoricalLedger::default());

        assert!(engine.generate_achievements(test_now()).is_empty());
        assert!(engine.achievement_unlocks(test_now()).is_empty());
    }

    #[test]
    fn test_applying_unlocks_suppresses_next_call() {
        let engine = MotivationEngine::new(strong_week(), HistoricalLedger::default());
        let mut ledger = engine.ledger().clone();
        for unlock in engine.achievement_unlocks(test_now()) {
            ledger.apply(&unlock.update);
        }

        let engine = MotivationEngine::new(strong_week(), ledger);
        assert!(engine.generate_achievements(test_now()).is_empty());
    }

    #[test]
    fn test_challenges_recomputed_per_call() {
        let engine = MotivationEngine::new(strong_week(), HistoricalLedger::default());

        let first = engine.generate_challenges(test_now());
        let second = engine.generate_challenges(test_now());
        assert_eq!(first, second);

        assert_eq!(first.len(), 3);
        assert_eq!(first[0].id, "sleep-streak-7");
        assert_eq!(first[0].current, 7.0);
        assert!(first[0].completed);

        let sleep_change = engine.metrics().change(MetricKind::Sleep);
        let readiness_change = engine.metrics().change(MetricKind::Readiness);
        assert_eq!(first[1].current, sleep_change.max(readiness_change));
        assert!(!first[1].completed);

        assert_eq!(first[2].current, 100.0);
        assert_eq!(first[2].end_date, test_now() + Duration::days(30));
    }

    #[test]
    fn test_enrollments_keep_their_start() {
        let engine = MotivationEngine::new(strong_week(), HistoricalLedger::default());
        let enrollment = ChallengeEnrollment {
            id: "enr-1".to_string(),
            kind: ChallengeKind::WeeklyImprovement,
            start_date: test_now() - Duration::days(2),
        };

        let challenges = engine.evaluate_enrollments(&[enrollment.clone()]);
        assert_eq!(challenges[0].start_date, enrollment.start_date);
        assert_eq!(challenges[0].end_date, enrollment.start_date + Duration::days(7));
    }

    #[test]
    fn test_badge_celebration() {
        let engine = MotivationEngine::new(strong_week(), HistoricalLedger::default());
        let badge = &engine.generate_achievements(test_now())[0];
        let celebration = ProgressCelebration::from_badge(badge);

        assert_eq!(celebration.celebration_type, CelebrationType::Achievement);
        assert!(celebration.title.contains(&badge.name));
    }
}
