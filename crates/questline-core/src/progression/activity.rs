//! XP-earning activities, the bounded activity log and per-type counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Kind of learner activity that earns XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    ChatMessage,
    FirstChat,
    DailyLogin,
    BadgeEarned,
    AchievementCompleted,
    LevelUp,
    StreakBonus,
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        ActivityType::ChatMessage,
        ActivityType::FirstChat,
        ActivityType::DailyLogin,
        ActivityType::BadgeEarned,
        ActivityType::AchievementCompleted,
        ActivityType::LevelUp,
        ActivityType::StreakBonus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::ChatMessage => "chat_message",
            ActivityType::FirstChat => "first_chat",
            ActivityType::DailyLogin => "daily_login",
            ActivityType::BadgeEarned => "badge_earned",
            ActivityType::AchievementCompleted => "achievement_completed",
            ActivityType::LevelUp => "level_up",
            ActivityType::StreakBonus => "streak_bonus",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownActivityType(s.to_string()))
    }
}

/// One XP grant as shown in the recent-activity history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub account_id: String,
    pub activity_type: ActivityType,
    pub xp_earned: u64,
    /// Skill domain credited alongside the overall pool, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        account_id: &str,
        activity_type: ActivityType,
        xp_earned: u64,
        skill: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            activity_type,
            xp_earned,
            skill,
            created_at,
        }
    }
}

/// Newest-first history holding at most `capacity` entries.
///
/// This is a display aid. Totals and badge counts never read from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLog {
    entries: Vec<Activity>,
}

impl ActivityLog {
    pub fn push(&mut self, activity: Activity, capacity: usize) {
        self.entries.insert(0, activity);
        self.entries.truncate(capacity);
    }

    pub fn entries(&self) -> &[Activity] {
        &self.entries
    }

    pub fn recent(&self, n: usize) -> Vec<Activity> {
        self.entries.iter().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Monotonic count of activities per type, never trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityCounters {
    counts: BTreeMap<ActivityType, u64>,
}

impl ActivityCounters {
    pub fn record(&mut self, activity_type: ActivityType) -> u64 {
        let count = self.counts.entry(activity_type).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, activity_type: ActivityType) -> u64 {
        self.counts.get(&activity_type).copied().unwrap_or(0)
    }
}
