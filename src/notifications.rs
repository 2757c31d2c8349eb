//! Smart notification rules
//!
//! Four independent rules run on every call and every match is emitted. Rule
//! ids are stable per rule, not per occurrence, so two calls inside the same
//! qualifying window produce two notifications with the same id. Callers that
//! want one notification per rule per day keep a [`SeenNotifications`] set and
//! pass the output through [`suppress_seen`].

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use tracing::debug;

use crate::models::{BehaviorPatterns, MetricKind, WellnessMetrics};

pub const LOW_READINESS_ID: &str = "low-readiness";
pub const WIND_DOWN_ID: &str = "wind-down";
pub const EVENING_WALK_ID: &str = "evening-walk";
pub const GOAL_DEADLINE_ID: &str = "goal-deadline";

/// Readiness below this triggers the context-aware alert
pub const LOW_READINESS_THRESHOLD: f64 = 60.0;

/// Local hours in which the wind-down reminder fires
pub const WIND_DOWN_HOURS: RangeInclusive<u32> = 21..=23;

/// Sleep below this makes the evening-walk pattern worth mentioning
pub const EVENING_WALK_SLEEP_THRESHOLD: f64 = 75.0;

/// Days before month end at which the goal reminder starts
pub const GOAL_DEADLINE_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ContextAware,
    TimingBased,
    PatternBased,
    GoalBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Stable rule id
    pub id: String,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    pub title: String,

    pub message: String,

    /// Optional call-to-action label
    pub action: Option<String>,

    pub priority: Priority,

    pub timestamp: DateTime<FixedOffset>,

    /// Always false on creation; read state belongs to the caller
    pub read: bool,
}

impl Notification {
    fn new(
        id: &str,
        notification_type: NotificationType,
        priority: Priority,
        title: &str,
        message: String,
        action: Option<&str>,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.to_string(),
            notification_type,
            title: title.to_string(),
            message,
            action: action.map(str::to_string),
            priority,
            timestamp: now,
            read: false,
        }
    }

    /// Local calendar day used for deduplication
    pub fn day_bucket(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Days from the local date of `now` to the last day of its month
///
/// 0 on the last day of the month.
pub fn days_until_month_end(now: DateTime<FixedOffset>) -> i64 {
    let today = now.date_naive();
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last_day| (last_day - today).num_days())
        .unwrap_or(0)
}

/// Run every notification rule against a snapshot
pub fn evaluate_rules(
    metrics: &WellnessMetrics,
    patterns: &BehaviorPatterns,
    now: DateTime<FixedOffset>,
) -> Vec<Notification> {
    let mut notifications = Vec::new();

    let readiness = metrics.current(MetricKind::Readiness);
    if readiness < LOW_READINESS_THRESHOLD {
        debug!(rule = LOW_READINESS_ID, readiness, "notification rule matched");
        notifications.push(Notification::new(
            LOW_READINESS_ID,
            NotificationType::ContextAware,
            Priority::High,
            "Low readiness today",
            format!(
                "Your readiness is {:.0}. Consider swapping intense training \
                 for light movement and extra rest.",
                readiness
            ),
            Some("View recovery tips"),
            now,
        ));
    }

    if WIND_DOWN_HOURS.contains(&now.hour()) {
        debug!(rule = WIND_DOWN_ID, hour = now.hour(), "notification rule matched");
        notifications.push(Notification::new(
            WIND_DOWN_ID,
            NotificationType::TimingBased,
            Priority::Medium,
            "Time to wind down",
            "Dim the lights and put screens away to set up a good night's sleep.".to_string(),
            Some("Start wind-down"),
            now,
        ));
    }

    let sleep = metrics.current(MetricKind::Sleep);
    if patterns.sleep.evening_walks && sleep < EVENING_WALK_SLEEP_THRESHOLD {
        debug!(rule = EVENING_WALK_ID, sleep, "notification rule matched");
        notifications.push(Notification::new(
            EVENING_WALK_ID,
            NotificationType::PatternBased,
            Priority::Medium,
            "An evening walk could help",
            format!(
                "Your sleep score is {:.0}. You tend to sleep better after an evening walk.",
                sleep
            ),
            Some("Plan a walk"),
            now,
        ));
    }

    let days_left = days_until_month_end(now);
    if days_left > 0 && days_left <= GOAL_DEADLINE_WINDOW_DAYS {
        debug!(rule = GOAL_DEADLINE_ID, days_left, "notification rule matched");
        notifications.push(Notification::new(
            GOAL_DEADLINE_ID,
            NotificationType::GoalBased,
            Priority::High,
            "Monthly goals closing soon",
            format!(
                "{} day{} left to wrap up this month's goals.",
                days_left,
                if days_left == 1 { "" } else { "s" }
            ),
            Some("Review goals"),
            now,
        ));
    }

    notifications
}

/// A rule that has already been shown on a given local day
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeenNotification {
    pub id: String,
    pub day: NaiveDate,
}

/// Caller-kept record of notifications already delivered, keyed by `(id, day)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenNotifications {
    seen: BTreeSet<SeenNotification>,
}

impl SeenNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, notification: &Notification) {
        self.seen.insert(SeenNotification {
            id: notification.id.clone(),
            day: notification.day_bucket(),
        });
    }

    pub fn contains(&self, notification: &Notification) -> bool {
        self.seen.contains(&SeenNotification {
            id: notification.id.clone(),
            day: notification.day_bucket(),
        })
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Drop notifications whose `(id, day)` pair was already delivered
pub fn suppress_seen(
    notifications: Vec<Notification>,
    seen: &SeenNotifications,
) -> Vec<Notification> {
    notifications
        .into_iter()
        .filter(|n| !seen.contains(n))
        .collect()
}
