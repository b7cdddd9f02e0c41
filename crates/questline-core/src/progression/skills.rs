//! Per-skill progress and the global level derived from it.
//!
//! Skills store `(level, xp_within_level)`; everything else is re-derived
//! through the tiered model so the dashboard view and the badge evaluator
//! always agree.

use serde::{Deserialize, Serialize};

use super::level::ThresholdTable;

/// Stored progress for one skill domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillProgress {
    pub level: u32,
    pub current_xp_within_level: u64,
}

impl SkillProgress {
    pub fn from_total(table: &ThresholdTable, total_xp: u64) -> Self {
        let pos = table.position(total_xp);
        Self {
            level: pos.tiers_completed,
            current_xp_within_level: pos.xp_within_level,
        }
    }

    pub fn total_xp(&self, table: &ThresholdTable) -> u64 {
        table.total_xp(self.level, self.current_xp_within_level)
    }

    /// Credit `amount` XP, carrying overflow into as many levels as it fills.
    pub fn add_xp(&mut self, table: &ThresholdTable, amount: u64) -> bool {
        let before = self.level;
        *self = Self::from_total(table, self.total_xp(table).saturating_add(amount));
        self.level > before
    }

    /// Normalise a stored pair whose `within` exceeds its band.
    pub fn normalized(self, table: &ThresholdTable) -> Self {
        Self::from_total(table, self.total_xp(table))
    }
}

/// Display view of one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillView {
    pub skill: String,
    pub level: u32,
    pub current_xp: u64,
    pub max_xp: u64,
    pub total_xp: u64,
}

/// Global level folded over the sum of all skill totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalProgress {
    pub global_level: u32,
    pub current_xp: u64,
    pub max_xp: u64,
    pub total_xp: u64,
}

impl GlobalProgress {
    pub fn from_total(table: &ThresholdTable, total_xp: u64) -> Self {
        let pos = table.position(total_xp);
        Self {
            global_level: pos.tiers_completed,
            current_xp: pos.xp_within_level,
            max_xp: pos.band,
            total_xp,
        }
    }
}

/// Build the per-skill views and the global progress. Performs no writes.
pub fn dual_progress<'a, I>(
    skill_table: &ThresholdTable,
    global_table: &ThresholdTable,
    skills: I,
) -> (Vec<SkillView>, GlobalProgress)
where
    I: IntoIterator<Item = (&'a str, SkillProgress)>,
{
    let mut views = Vec::new();
    let mut combined = 0u64;

    for (name, progress) in skills {
        let progress = progress.normalized(skill_table);
        let total_xp = progress.total_xp(skill_table);
        combined = combined.saturating_add(total_xp);
        views.push(SkillView {
            skill: name.to_string(),
            level: progress.level,
            current_xp: progress.current_xp_within_level,
            max_xp: skill_table.band(progress.level),
            total_xp,
        });
    }

    (views, GlobalProgress::from_total(global_table, combined))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill_table() -> ThresholdTable {
        ThresholdTable::new(vec![20, 40, 80, 160, 320, 640, 1280])
    }

    fn global_table() -> ThresholdTable {
        ThresholdTable::new(vec![50, 120, 250, 500, 1000, 2000, 4000, 8000])
    }

    #[test]
    fn level_two_with_seventy_shows_eighty_max() {
        let table = skill_table();
        let mut skill = SkillProgress {
            level: 2,
            current_xp_within_level: 70,
        };
        let (views, _) = dual_progress(&table, &global_table(), [("leadership", skill)]);
        assert_eq!(views[0].max_xp, 80);

        assert!(skill.add_xp(&table, 15));
        assert_eq!(skill.level, 3);
        assert_eq!(skill.current_xp_within_level, 5);
    }

    #[test]
    fn dashboard_sample_totals() {
        let skills = [
            (
                "communication",
                SkillProgress {
                    level: 4,
                    current_xp_within_level: 120,
                },
            ),
            (
                "problem_solving",
                SkillProgress {
                    level: 3,
                    current_xp_within_level: 45,
                },
            ),
            (
                "leadership",
                SkillProgress {
                    level: 2,
                    current_xp_within_level: 70,
                },
            ),
        ];
        let (views, global) = dual_progress(&skill_table(), &global_table(), skills);

        // 300 + 120, 140 + 45, 60 + 70
        assert_eq!(views[0].total_xp, 420);
        assert_eq!(views[0].max_xp, 320);
        assert_eq!(views[1].total_xp, 185);
        assert_eq!(views[2].total_xp, 130);

        // 735 total: 50 + 120 + 250 consumed, 315 into the 500 band.
        assert_eq!(global.total_xp, 735);
        assert_eq!(global.global_level, 3);
        assert_eq!(global.current_xp, 315);
        assert_eq!(global.max_xp, 500);
    }

    #[test]
    fn overfull_stored_pair_is_normalised() {
        let stored = SkillProgress {
            level: 0,
            current_xp_within_level: 25,
        };
        let (views, _) = dual_progress(&skill_table(), &global_table(), [("communication", stored)]);
        assert_eq!(views[0].level, 1);
        assert_eq!(views[0].current_xp, 5);
        assert_eq!(views[0].total_xp, 25);
    }

    #[test]
    fn empty_skills_yield_level_zero() {
        let (views, global) =
            dual_progress(&skill_table(), &global_table(), std::iter::empty::<(&str, SkillProgress)>());
        assert!(views.is_empty());
        assert_eq!(global.global_level, 0);
        assert_eq!(global.max_xp, 50);
    }
}
