//! Daily activity streaks.
//!
//! Streaks compare calendar dates, not instants. The caller decides which
//! calendar: [`StreakClock`] turns a UTC instant into a date using a fixed
//! offset, UTC by default.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Persisted streak state for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStreak {
    pub current_streak: u32,
    pub longest_streak: u32,
    /// `None` until the first qualifying activity.
    #[serde(default)]
    pub last_activity_date: Option<NaiveDate>,
}

/// Outcome of [`DailyStreak::touch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakTouch {
    pub increased: bool,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl DailyStreak {
    /// Record activity on `today`.
    ///
    /// Same day is a no-op, the following day extends the streak, anything
    /// else (gap, earlier date, first activity ever) restarts it at 1.
    /// `last_activity_date` always ends up at `today`.
    pub fn touch(&mut self, today: NaiveDate) -> StreakTouch {
        let increased = match self.last_activity_date {
            Some(last) if last == today => {
                return self.outcome(false);
            }
            Some(last) if last.succ_opt() == Some(today) => {
                self.current_streak = self.current_streak.saturating_add(1);
                true
            }
            _ => {
                self.current_streak = 1;
                false
            }
        };

        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_activity_date = Some(today);
        self.outcome(increased)
    }

    fn outcome(&self, increased: bool) -> StreakTouch {
        StreakTouch {
            increased,
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
        }
    }
}

/// Maps instants to calendar dates in one canonical zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakClock {
    offset: FixedOffset,
}

impl Default for StreakClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl StreakClock {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Offset in minutes east of UTC. Out-of-range offsets fall back to UTC.
    pub fn from_offset_minutes(minutes: i32) -> Self {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self { offset })
            .unwrap_or_default()
    }

    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }
}
