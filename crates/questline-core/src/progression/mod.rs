//! Gamified progression: XP and levels, skills, streaks, badges.
//!
//! The leaf modules are pure; [`service`] ties them to a [`ProgressStore`].
//!
//! [`ProgressStore`]: crate::storage::ProgressStore

pub mod activity;
pub mod badges;
pub mod catalog;
pub mod level;
pub mod service;
pub mod skills;
pub mod streak;

pub use activity::{Activity, ActivityCounters, ActivityLog, ActivityType};
pub use badges::{BadgeContext, BadgeDefinition, EarnedBadge, EarnedBadges, Rarity, Requirement};
pub use level::{LevelModel, LevelProgress, ThresholdTable, TierPosition};
pub use service::{ProgressSnapshot, ProgressionService, Snapshot, SubmissionStage, XpRecord};
pub use skills::{dual_progress, GlobalProgress, SkillProgress, SkillView};
pub use streak::{DailyStreak, StreakClock, StreakTouch};
