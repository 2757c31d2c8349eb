//! Achievement catalogue and unlock evaluation
//!
//! Every achievement is gated twice: its condition must hold and the ledger
//! must not already carry its flag. The engine never sets the flag. Each new
//! badge comes back with a [`LedgerUpdate::MarkAwarded`] that the caller
//! persists together with its own ledger write. Without that write the same
//! badge is emitted again on the next call.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{HistoricalLedger, LedgerUpdate, MetricKind, WellnessMetrics};

pub const SLEEP_CHAMPION: &str = "sleep_champion";
pub const SLEEP_MASTER: &str = "sleep_master";
pub const CONSISTENCY_MASTER: &str = "consistency_master";
pub const IMPROVEMENT_EXPERT: &str = "improvement_expert";

pub const SLEEP_CHAMPION_STREAK: u32 = 7;
pub const SLEEP_MASTER_STREAK: u32 = 30;
pub const CONSISTENCY_MASTER_SCORE: f64 = 80.0;
pub const IMPROVEMENT_EXPERT_TOTAL: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Sleep,
    Consistency,
    Improvement,
}

/// Static description of an achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub category: AchievementCategory,
}

/// The full catalogue, in evaluation order
pub const DEFINITIONS: [AchievementDefinition; 4] = [
    AchievementDefinition {
        id: SLEEP_CHAMPION,
        name: "Sleep Champion",
        description: "Hit your sleep target 7 nights in a row.",
        icon: "moon",
        color: "#6366F1",
        category: AchievementCategory::Sleep,
    },
    AchievementDefinition {
        id: SLEEP_MASTER,
        name: "Sleep Master",
        description: "Hit your sleep target 30 nights in a row.",
        icon: "crown",
        color: "#8B5CF6",
        category: AchievementCategory::Sleep,
    },
    AchievementDefinition {
        id: CONSISTENCY_MASTER,
        name: "Consistency Master",
        description: "Moved sleep and readiness a combined 80% in one week.",
        icon: "target",
        color: "#10B981",
        category: AchievementCategory::Consistency,
    },
    AchievementDefinition {
        id: IMPROVEMENT_EXPERT,
        name: "Improvement Expert",
        description: "Moved your metrics a combined 20% in one week.",
        icon: "trending-up",
        color: "#F59E0B",
        category: AchievementCategory::Improvement,
    },
];

impl AchievementDefinition {
    pub fn unlock(&self, now: DateTime<FixedOffset>) -> AchievementBadge {
        AchievementBadge {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            icon: self.icon.to_string(),
            color: self.color.to_string(),
            unlocked_at: now,
            category: self.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementBadge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub unlocked_at: DateTime<FixedOffset>,
    pub category: AchievementCategory,
}

/// A newly unlocked badge and the ledger write that records it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    pub badge: AchievementBadge,
    pub update: LedgerUpdate,
}

/// Combined absolute weekly change of sleep and readiness, capped at 100
///
/// Absent series contribute 0, so a snapshot without data scores 0.
pub fn consistency_score(metrics: &WellnessMetrics) -> f64 {
    let sleep = metrics.change(MetricKind::Sleep).abs();
    let readiness = metrics.change(MetricKind::Readiness).abs();
    (sleep + readiness).min(100.0)
}

fn condition_holds(id: &str, metrics: &WellnessMetrics, sleep_streak: u32) -> bool {
    match id {
        SLEEP_CHAMPION => sleep_streak >= SLEEP_CHAMPION_STREAK,
        SLEEP_MASTER => sleep_streak >= SLEEP_MASTER_STREAK,
        CONSISTENCY_MASTER => consistency_score(metrics) >= CONSISTENCY_MASTER_SCORE,
        IMPROVEMENT_EXPERT => metrics.total_absolute_change() >= IMPROVEMENT_EXPERT_TOTAL,
        _ => false,
    }
}

/// Evaluate the catalogue against a snapshot and the ledger
pub fn evaluate(
    metrics: &WellnessMetrics,
    ledger: &HistoricalLedger,
    sleep_streak: u32,
    now: DateTime<FixedOffset>,
) -> Vec<AchievementUnlock> {
    DEFINITIONS
        .iter()
        .filter(|def| condition_holds(def.id, metrics, sleep_streak))
        .filter(|def| {
            let awarded = ledger.is_awarded(def.id);
            if awarded {
                debug!(achievement = def.id, "condition met but already awarded");
            }
            !awarded
        })
        .map(|def| {
            debug!(achievement = def.id, "achievement unlocked");
            AchievementUnlock {
                badge: def.unlock(now),
                update: LedgerUpdate::MarkAwarded {
                    achievement_id: def.id.to_string(),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeeklyMetricSeries;
    use chrono::TimeZone;

    fn test_now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 9, 23, 8, 0, 0)
            .unwrap()
    }

    fn metrics(sleep: Vec<f64>, readiness: Vec<f64>, weight: Vec<f64>) -> WellnessMetrics {
        WellnessMetrics {
            sleep: Some(WeeklyMetricSeries::from_samples(MetricKind::Sleep, sleep).unwrap()),
            readiness: Some(
                WeeklyMetricSeries::from_samples(MetricKind::Readiness, readiness).unwrap(),
            ),
            weight: Some(WeeklyMetricSeries::from_samples(MetricKind::Weight, weight).unwrap()),
        }
    }

    #[test]
    fn test_catalogue_lookup() {
        assert_eq!(DEFINITIONS.len(), 4);
        let ids: Vec<&str> = DEFINITIONS.iter().map(|d| d.id).collect();
        assert_eq!(
            ids,
            vec![SLEEP_CHAMPION, SLEEP_MASTER, CONSISTENCY_MASTER, IMPROVEMENT_EXPERT]
        );
    }

    #[test]
    fn test_consistency_score() {
        let steady = metrics(vec![80.0, 80.0], vec![70.0, 70.0], vec![160.0, 160.0]);
        assert_eq!(consistency_score(&steady), 0.0);

        // sleep +25%, readiness -10% -> 35
        let moving = metrics(vec![80.0, 100.0], vec![80.0, 72.0], vec![160.0, 160.0]);
        assert!((consistency_score(&moving) - 35.0).abs() < 1e-9);

        // +100% and -80% is capped
        let wild = metrics(vec![50.0, 100.0], vec![100.0, 20.0], vec![160.0, 160.0]);
        assert_eq!(consistency_score(&wild), 100.0);

        assert_eq!(consistency_score(&WellnessMetrics::default()), 0.0);
    }

    #[test]
    fn test_no_badges_without_data() {
        let ledger = HistoricalLedger::default();
        let unlocks = evaluate(&WellnessMetrics::default(), &ledger, 0, test_now());
        assert!(unlocks.is_empty());
    }

    #[test]
    fn test_streak_achievements() {
        let m = metrics(vec![80.0; 7], vec![70.0; 7], vec![160.0; 7]);
        let ledger = HistoricalLedger::default();

        let ids: Vec<String> = evaluate(&m, &ledger, 7, test_now())
            .into_iter()
            .map(|u| u.badge.id)
            .collect();
        assert_eq!(ids, vec![SLEEP_CHAMPION]);

        let ids: Vec<String> = evaluate(&m, &ledger, 30, test_now())
            .into_iter()
            .map(|u| u.badge.id)
            .collect();
        assert_eq!(ids, vec![SLEEP_CHAMPION, SLEEP_MASTER]);
    }

    #[test]
    fn test_ledger_gate() {
        // sleep +100% alone reaches the consistency cap
        let m = metrics(vec![50.0, 100.0], vec![70.0, 70.0], vec![160.0, 160.0]);
        let mut ledger = HistoricalLedger::default();
        ledger.achievements.insert(SLEEP_CHAMPION.to_string(), true);
        ledger.achievements.insert(IMPROVEMENT_EXPERT.to_string(), true);
        ledger.achievements.insert(CONSISTENCY_MASTER.to_string(), false);

        let unlocks = evaluate(&m, &ledger, 7, test_now());
        assert_eq!(unlocks.len(), 1);
        assert_eq!(unlocks[0].badge.id, CONSISTENCY_MASTER);
        assert_eq!(
            unlocks[0].update,
            LedgerUpdate::MarkAwarded {
                achievement_id: CONSISTENCY_MASTER.to_string()
            }
        );
        assert_eq!(unlocks[0].badge.unlocked_at, test_now());
    }

    #[test]
    fn test_improvement_expert_threshold() {
        // sleep +10, readiness +5, weight -5 => total 20, consistency only 15
        let m = metrics(vec![70.0, 77.0], vec![80.0, 84.0], vec![200.0, 190.0]);
        assert!((m.total_absolute_change() - 20.0).abs() < 1e-9);

        let unlocks = evaluate(&m, &HistoricalLedger::default(), 1, test_now());
        assert_eq!(unlocks.len(), 1);
        assert_eq!(unlocks[0].badge.id, IMPROVEMENT_EXPERT);
        assert_eq!(unlocks[0].badge.category, AchievementCategory::Improvement);
    }
}
