// Library interface for coachrs modules
// This allows integration tests and benches to access the engine

pub mod achievements;
pub mod challenges;
pub mod config;
pub mod error;
pub mod insights;
pub mod logging;
pub mod models;
pub mod motivation;
pub mod notifications;
pub mod snapshot;
pub mod streaks;

// Re-export commonly used types for convenience
pub use models::*;
pub use achievements::{AchievementBadge, AchievementCategory, AchievementUnlock};
pub use challenges::{
    Challenge, ChallengeEnrollment, ChallengeKind, ChallengeProgress, ChallengeType,
};
pub use config::{AppConfig, OutputFormat, OutputSettings};
pub use error::{CoachError, ErrorSeverity, Result, ValidationError};
pub use insights::{BriefingFocus, InsightGenerator, MorningBriefing, TopPerformer, WeeklyInsights};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use motivation::{CelebrationType, MotivationEngine, ProgressCelebration};
pub use notifications::{Notification, NotificationType, Priority, SeenNotifications};
pub use snapshot::{ActivityLog, CoachingSnapshot};
pub use streaks::{StreakDataProvider, StreakRecord};
