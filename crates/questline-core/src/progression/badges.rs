//! Badge catalog types and the unlock evaluator.
//!
//! The evaluator is a pure scan: it never reads the store and never looks at
//! other badges, so a badge can't be its own prerequisite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::activity::{ActivityCounters, ActivityType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

fn default_counted_activity() -> ActivityType {
    ActivityType::ChatMessage
}

/// Condition that unlocks a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    XpTotal {
        value: u64,
    },
    ActivityCount {
        #[serde(default = "default_counted_activity")]
        activity: ActivityType,
        value: u64,
    },
    Streak {
        value: u32,
    },
    SkillLevel {
        skill: String,
        value: u32,
    },
    GlobalLevel {
        value: u32,
    },
}

impl Requirement {
    /// Numeric target, used to order locked badges by how far away they are.
    pub fn value(&self) -> u64 {
        match self {
            Requirement::XpTotal { value } | Requirement::ActivityCount { value, .. } => *value,
            Requirement::Streak { value }
            | Requirement::SkillLevel { value, .. }
            | Requirement::GlobalLevel { value } => u64::from(*value),
        }
    }

    pub fn is_met(&self, ctx: &BadgeContext) -> bool {
        match self {
            Requirement::XpTotal { value } => ctx.total_xp >= *value,
            Requirement::ActivityCount { activity, value } => {
                ctx.activity_counts.get(*activity) >= *value
            }
            Requirement::Streak { value } => ctx.current_streak >= *value,
            Requirement::SkillLevel { skill, value } => {
                ctx.skill_levels.get(skill).copied().unwrap_or(0) >= *value
            }
            Requirement::GlobalLevel { value } => ctx.global_level >= *value,
        }
    }
}

/// Static catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rarity: Rarity,
    pub requirement: Requirement,
}

/// A catalog entry recorded for an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub badge_id: String,
    pub earned_at: DateTime<Utc>,
}

/// Aggregate account state the requirements are checked against.
#[derive(Debug, Clone, Default)]
pub struct BadgeContext {
    pub total_xp: u64,
    pub activity_counts: ActivityCounters,
    pub current_streak: u32,
    pub skill_levels: BTreeMap<String, u32>,
    pub global_level: u32,
}

/// Earned set for one account. Ids are unique and never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EarnedBadges {
    badges: Vec<EarnedBadge>,
}

impl EarnedBadges {
    pub fn contains(&self, badge_id: &str) -> bool {
        self.badges.iter().any(|b| b.badge_id == badge_id)
    }

    pub fn list(&self) -> &[EarnedBadge] {
        &self.badges
    }

    pub fn len(&self) -> usize {
        self.badges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }

    /// Drop duplicate ids a hand-edited record might carry, keeping the first.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.badges.retain(|b| seen.insert(b.badge_id.clone()));
    }

    /// Record every unearned catalog entry whose requirement holds.
    ///
    /// Returns the newly earned definitions; running it again on the same
    /// context returns nothing.
    pub fn evaluate<'a>(
        &mut self,
        catalog: &'a [BadgeDefinition],
        ctx: &BadgeContext,
        now: DateTime<Utc>,
    ) -> Vec<&'a BadgeDefinition> {
        let mut unlocked = Vec::new();
        for badge in catalog {
            if self.contains(&badge.id) || !badge.requirement.is_met(ctx) {
                continue;
            }
            self.badges.push(EarnedBadge {
                badge_id: badge.id.clone(),
                earned_at: now,
            });
            unlocked.push(badge);
        }
        unlocked
    }

    /// Catalog entries not yet earned, in catalog order.
    pub fn locked<'a>(&self, catalog: &'a [BadgeDefinition]) -> Vec<&'a BadgeDefinition> {
        catalog.iter().filter(|b| !self.contains(&b.id)).collect()
    }

    /// The `n` closest locked badges by requirement value.
    pub fn next<'a>(&self, catalog: &'a [BadgeDefinition], n: usize) -> Vec<&'a BadgeDefinition> {
        let mut locked = self.locked(catalog);
        locked.sort_by_key(|b| b.requirement.value());
        locked.truncate(n);
        locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn badge(id: &str, requirement: Requirement) -> BadgeDefinition {
        BadgeDefinition {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            rarity: Rarity::Common,
            requirement,
        }
    }

    fn catalog() -> Vec<BadgeDefinition> {
        vec![
            badge("xp_100", Requirement::XpTotal { value: 100 }),
            badge(
                "chat_1",
                Requirement::ActivityCount {
                    activity: ActivityType::ChatMessage,
                    value: 1,
                },
            ),
            badge("streak_7", Requirement::Streak { value: 7 }),
            badge(
                "comm_3",
                Requirement::SkillLevel {
                    skill: "communication".into(),
                    value: 3,
                },
            ),
            badge("global_2", Requirement::GlobalLevel { value: 2 }),
        ]
    }

    #[test]
    fn each_requirement_kind_unlocks() {
        let mut ctx = BadgeContext {
            total_xp: 150,
            current_streak: 7,
            global_level: 2,
            ..Default::default()
        };
        ctx.activity_counts.record(ActivityType::ChatMessage);
        ctx.skill_levels.insert("communication".into(), 3);

        let mut earned = EarnedBadges::default();
        let catalog = catalog();
        let unlocked = earned.evaluate(&catalog, &ctx, Utc::now());
        assert_eq!(unlocked.len(), 5);
        assert_eq!(earned.len(), 5);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let mut ctx = BadgeContext::default();
        ctx.activity_counts.record(ActivityType::ChatMessage);
        let catalog = catalog();
        let mut earned = EarnedBadges::default();

        let first = earned.evaluate(&catalog, &ctx, Utc::now());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, "chat_1");

        let second = earned.evaluate(&catalog, &ctx, Utc::now());
        assert!(second.is_empty());
        assert_eq!(earned.len(), 1);
    }

    #[test]
    fn counts_other_activity_type_only_when_asked() {
        let mut ctx = BadgeContext::default();
        ctx.activity_counts.record(ActivityType::DailyLogin);
        let catalog = vec![
            badge(
                "login_1",
                Requirement::ActivityCount {
                    activity: ActivityType::DailyLogin,
                    value: 1,
                },
            ),
            badge(
                "chat_1",
                Requirement::ActivityCount {
                    activity: ActivityType::ChatMessage,
                    value: 1,
                },
            ),
        ];
        let mut earned = EarnedBadges::default();
        let unlocked = earned.evaluate(&catalog, &ctx, Utc::now());
        assert_eq!(unlocked.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), ["login_1"]);
    }

    #[test]
    fn unknown_skill_counts_as_level_zero() {
        let ctx = BadgeContext::default();
        let req = Requirement::SkillLevel {
            skill: "juggling".into(),
            value: 1,
        };
        assert!(!req.is_met(&ctx));
    }

    #[test]
    fn next_badges_sorted_by_requirement_value() {
        let catalog = catalog();
        let earned = EarnedBadges::default();
        let next: Vec<_> = earned.next(&catalog, 3).iter().map(|b| b.id.as_str()).collect();
        assert_eq!(next, ["chat_1", "global_2", "comm_3"]);
        assert_eq!(earned.locked(&catalog).len(), 5);
    }

    #[test]
    fn requirement_defaults_counted_activity_to_chat() {
        let req: Requirement =
            serde_json::from_value(serde_json::json!({ "type": "activity_count", "value": 10 }))
                .unwrap();
        assert_eq!(
            req,
            Requirement::ActivityCount {
                activity: ActivityType::ChatMessage,
                value: 10
            }
        );
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let now = Utc::now();
        let mut earned: EarnedBadges = serde_json::from_value(serde_json::json!([
            { "badge_id": "a", "earned_at": now },
            { "badge_id": "a", "earned_at": now },
            { "badge_id": "b", "earned_at": now },
        ]))
        .unwrap();
        earned.dedup();
        assert_eq!(earned.len(), 2);
    }
}
