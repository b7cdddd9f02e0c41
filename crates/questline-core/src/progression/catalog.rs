//! Built-in threshold tables, XP amounts and badge catalog.

use std::collections::BTreeMap;

use super::activity::ActivityType;
use super::badges::{BadgeDefinition, Rarity, Requirement};
use super::level::ThresholdTable;

pub const COMMUNICATION: &str = "communication";
pub const PROBLEM_SOLVING: &str = "problem_solving";
pub const LEADERSHIP: &str = "leadership";

pub fn default_skills() -> Vec<String> {
    vec![
        COMMUNICATION.to_string(),
        PROBLEM_SOLVING.to_string(),
        LEADERSHIP.to_string(),
    ]
}

/// XP needed for each skill level (doubling).
pub fn default_skill_thresholds() -> ThresholdTable {
    ThresholdTable::new(vec![20, 40, 80, 160, 320, 640, 1280])
}

/// XP needed for each global level.
pub fn default_global_thresholds() -> ThresholdTable {
    ThresholdTable::new(vec![50, 120, 250, 500, 1000, 2000, 4000, 8000])
}

pub fn default_xp_amounts() -> BTreeMap<String, u64> {
    [
        (ActivityType::ChatMessage, 2),
        (ActivityType::FirstChat, 10),
        (ActivityType::DailyLogin, 5),
        (ActivityType::BadgeEarned, 15),
        (ActivityType::AchievementCompleted, 25),
        (ActivityType::LevelUp, 50),
        (ActivityType::StreakBonus, 3),
    ]
    .into_iter()
    .map(|(t, xp)| (t.as_str().to_string(), xp))
    .collect()
}

/// Activities that also credit a skill domain.
pub fn default_skill_credit() -> BTreeMap<String, String> {
    [ActivityType::ChatMessage, ActivityType::FirstChat]
        .into_iter()
        .map(|t| (t.as_str().to_string(), COMMUNICATION.to_string()))
        .collect()
}

fn badge(id: &str, name: &str, description: &str, rarity: Rarity, requirement: Requirement) -> BadgeDefinition {
    BadgeDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        rarity,
        requirement,
    }
}

fn chats(value: u64) -> Requirement {
    Requirement::ActivityCount {
        activity: ActivityType::ChatMessage,
        value,
    }
}

fn skill(skill: &str, value: u32) -> Requirement {
    Requirement::SkillLevel {
        skill: skill.to_string(),
        value,
    }
}

pub fn default_badges() -> Vec<BadgeDefinition> {
    use Rarity::*;
    use Requirement::*;

    vec![
        badge("first_steps", "First Steps", "Welcome to your learning journey!", Common, XpTotal { value: 0 }),
        badge("chatterbox", "Chatterbox", "Sent your first message!", Common, chats(1)),
        badge("curious_mind", "Curious Mind", "Asked 10 questions!", Common, chats(10)),
        badge("rising_star", "Rising Star", "Earned your first 100 XP!", Common, XpTotal { value: 100 }),
        badge("bright_spark", "Bright Spark", "Reached 500 XP!", Rare, XpTotal { value: 500 }),
        badge("knowledge_seeker", "Knowledge Seeker", "Earned 1000 XP!", Rare, XpTotal { value: 1000 }),
        badge("learning_champion", "Learning Champion", "Reached 2500 XP!", Epic, XpTotal { value: 2500 }),
        badge("conversation_master", "Conversation Master", "Had 50 conversations!", Rare, chats(50)),
        badge("daily_dedication", "Daily Dedication", "Active 7 days in a row!", Rare, Streak { value: 7 }),
        badge("wisdom_warrior", "Wisdom Warrior", "Earned 5000 XP!", Epic, XpTotal { value: 5000 }),
        badge("master_learner", "Master Learner", "Earned 10000 XP!", Legendary, XpTotal { value: 10000 }),
        badge("streak_superstar", "Streak Superstar", "Maintained a 30-day streak!", Legendary, Streak { value: 30 }),
        badge("level_climber", "Level Climber", "Reached global level 2!", Common, GlobalLevel { value: 2 }),
        badge("power_player", "Power Player", "Reached global level 5!", Rare, GlobalLevel { value: 5 }),
        badge("legend", "Legend", "Reached global level 10!", Legendary, GlobalLevel { value: 10 }),
        badge("great_communicator", "Great Communicator", "Communication level 3!", Rare, skill(COMMUNICATION, 3)),
        badge("master_speaker", "Master Speaker", "Communication level 5!", Epic, skill(COMMUNICATION, 5)),
        badge("problem_solver", "Problem Solver", "Problem solving level 3!", Rare, skill(PROBLEM_SOLVING, 3)),
        badge("puzzle_master", "Puzzle Master", "Problem solving level 5!", Epic, skill(PROBLEM_SOLVING, 5)),
        badge("natural_leader", "Natural Leader", "Leadership level 3!", Rare, skill(LEADERSHIP, 3)),
        badge("true_leader", "True Leader", "Leadership level 5!", Epic, skill(LEADERSHIP, 5)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_activity_type_has_an_amount() {
        let amounts = default_xp_amounts();
        for t in ActivityType::ALL {
            assert!(amounts.contains_key(t.as_str()), "missing {t}");
        }
        assert_eq!(amounts["chat_message"], 2);
        assert_eq!(amounts["level_up"], 50);
    }

    #[test]
    fn badge_ids_are_unique_and_skills_known() {
        let skills: HashSet<_> = default_skills().into_iter().collect();
        let badges = default_badges();
        let ids: HashSet<_> = badges.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids.len(), badges.len());
        for b in &badges {
            if let Requirement::SkillLevel { skill, .. } = &b.requirement {
                assert!(skills.contains(skill), "{} references {}", b.id, skill);
            }
        }
    }

    #[test]
    fn default_tables_are_valid() {
        assert!(default_skill_thresholds().validate("skill").is_ok());
        assert!(default_global_thresholds().validate("global").is_ok());
    }
}
