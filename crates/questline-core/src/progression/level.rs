//! Level calculation from cumulative XP.
//!
//! Two models are supported:
//!
//! - **Flat**: fixed-width bands of `band` XP. Level 1 covers `0..band`.
//! - **Tiered**: an ordered threshold table where each entry is the XP needed
//!   to complete that level. Past the end of the table the overflow band (or
//!   the last entry) repeats, so the table never runs out of capacity.
//!
//! Everything here is pure; levels are always re-derived from total XP.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Result of folding a threshold table over a cumulative XP value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPosition {
    /// Number of fully consumed tiers.
    pub tiers_completed: u32,
    /// XP earned inside the active tier.
    pub xp_within_level: u64,
    /// Width of the active tier.
    pub band: u64,
}

impl TierPosition {
    /// XP still missing to complete the active tier.
    pub fn xp_to_next(&self) -> u64 {
        self.band - self.xp_within_level
    }
}

/// Ordered per-level XP requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub thresholds: Vec<u64>,
    /// Band width used past the end of `thresholds`. Defaults to the last entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overflow: Option<u64>,
}

impl ThresholdTable {
    pub fn new(thresholds: Vec<u64>) -> Self {
        Self {
            thresholds,
            overflow: None,
        }
    }

    pub fn with_overflow(mut self, overflow: u64) -> Self {
        self.overflow = Some(overflow);
        self
    }

    /// Reject tables that could stall the walk or shrink between levels.
    pub fn validate(&self, name: &str) -> Result<(), ValidationError> {
        if self.thresholds.is_empty() {
            return Err(ValidationError::EmptyCollection(name.to_string()));
        }
        if self.thresholds.iter().any(|&t| t == 0) || self.overflow == Some(0) {
            return Err(ValidationError::InvalidValue {
                field: name.to_string(),
                message: "threshold bands must be greater than zero".into(),
            });
        }
        if self.thresholds.windows(2).any(|w| w[1] < w[0]) {
            return Err(ValidationError::InvalidValue {
                field: name.to_string(),
                message: "thresholds must be non-decreasing".into(),
            });
        }
        Ok(())
    }

    fn overflow_band(&self) -> u64 {
        self.overflow
            .or_else(|| self.thresholds.last().copied())
            .unwrap_or(1)
            .max(1)
    }

    /// Width of the band for a zero-based level index.
    pub fn band(&self, index: u32) -> u64 {
        self.thresholds
            .get(index as usize)
            .copied()
            .unwrap_or_else(|| self.overflow_band())
            .max(1)
    }

    /// Sum of the bands for levels `0..level`.
    pub fn cumulative(&self, level: u32) -> u64 {
        let in_table = (level as usize).min(self.thresholds.len());
        let table_sum = self.thresholds[..in_table]
            .iter()
            .fold(0u64, |acc, &t| acc.saturating_add(t));
        let beyond = u64::from(level).saturating_sub(in_table as u64);
        table_sum.saturating_add(beyond.saturating_mul(self.overflow_band()))
    }

    /// Fold the table over `cumulative` XP.
    ///
    /// A value exactly on a tier boundary counts as having completed that tier.
    pub fn position(&self, cumulative: u64) -> TierPosition {
        let mut consumed = 0u64;
        let mut level = 0u32;

        for &threshold in &self.thresholds {
            let threshold = threshold.max(1);
            if cumulative >= consumed.saturating_add(threshold) {
                consumed += threshold;
                level += 1;
            } else {
                return TierPosition {
                    tiers_completed: level,
                    xp_within_level: cumulative - consumed,
                    band: threshold,
                };
            }
        }

        let band = self.overflow_band();
        let remaining = cumulative - consumed;
        let extra = remaining / band;
        TierPosition {
            tiers_completed: level.saturating_add(u32::try_from(extra).unwrap_or(u32::MAX)),
            xp_within_level: remaining % band,
            band,
        }
    }

    /// Inverse of [`position`](Self::position).
    pub fn total_xp(&self, level: u32, xp_within_level: u64) -> u64 {
        self.cumulative(level).saturating_add(xp_within_level)
    }
}

/// Level of the overall XP pool together with its display numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    pub xp_within_level: u64,
    pub xp_to_next_level: u64,
}

/// Model used to derive the overall (account-wide) level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LevelModel {
    /// `floor(xp / band) + 1`.
    Flat { band: u64 },
    /// Tiers completed plus one, so level 1 is the first tier.
    Tiered { table: ThresholdTable },
}

impl Default for LevelModel {
    fn default() -> Self {
        LevelModel::Flat { band: 100 }
    }
}

impl LevelModel {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            LevelModel::Flat { band } if *band == 0 => Err(ValidationError::InvalidValue {
                field: "level_model.band".into(),
                message: "band must be greater than zero".into(),
            }),
            LevelModel::Flat { .. } => Ok(()),
            LevelModel::Tiered { table } => table.validate("level_model.table"),
        }
    }

    pub fn level(&self, total_xp: u64) -> u32 {
        self.progress(total_xp).level
    }

    pub fn progress(&self, total_xp: u64) -> LevelProgress {
        match self {
            LevelModel::Flat { band } => {
                let band = (*band).max(1);
                let level = u32::try_from((total_xp / band).saturating_add(1)).unwrap_or(u32::MAX);
                LevelProgress {
                    level,
                    xp_within_level: total_xp % band,
                    xp_to_next_level: band - total_xp % band,
                }
            }
            LevelModel::Tiered { table } => {
                let pos = table.position(total_xp);
                LevelProgress {
                    level: pos.tiers_completed.saturating_add(1),
                    xp_within_level: pos.xp_within_level,
                    xp_to_next_level: pos.xp_to_next(),
                }
            }
        }
    }

    /// XP value at which `level` is completed.
    pub fn threshold_for_level(&self, level: u32) -> u64 {
        match self {
            LevelModel::Flat { band } => u64::from(level).saturating_mul((*band).max(1)),
            LevelModel::Tiered { table } => table.cumulative(level),
        }
    }
}
