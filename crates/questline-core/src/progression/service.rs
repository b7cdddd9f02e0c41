//! Progression service: the engine's two entry points.
//!
//! ## Submission stages
//!
//! ```text
//! Idle -> Accruing -> Evaluating -> (LevelUpBonus -> Accruing -> Evaluating)? -> Settled
//! ```
//!
//! Every submission and snapshot runs inside its account's exclusive section:
//! an in-process guard per account plus [`ProgressStore::with_account`], which
//! the SQLite store backs with a write transaction so separate processes on
//! one database file take turns too. A failed write aborts the call with an
//! error; the SQLite store rolls the whole submission back, the in-memory
//! store keeps whatever the earlier writes stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use super::activity::{Activity, ActivityCounters, ActivityLog, ActivityType};
use super::badges::{BadgeContext, BadgeDefinition, EarnedBadge, EarnedBadges};
use super::skills::{dual_progress, GlobalProgress, SkillProgress, SkillView};
use super::streak::{DailyStreak, StreakTouch};
use crate::error::{CoreError, Result, StoreError, ValidationError};
use crate::storage::{self, Domain, EngineConfig, ProgressStore};

/// Number of activities returned in a progress snapshot.
pub const RECENT_ACTIVITY_COUNT: usize = 10;
/// Number of locked badges suggested as next targets.
pub const NEXT_BADGE_COUNT: usize = 3;

/// Stage of a submission, reported in trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStage {
    Idle,
    Accruing,
    Evaluating,
    LevelUpBonus,
    Settled,
}

/// Overall XP pool of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpRecord {
    pub account_id: String,
    pub total_xp: u64,
    pub level: u32,
    pub xp_to_next_level: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl XpRecord {
    fn new(account_id: &str, config: &EngineConfig, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            account_id: account_id.to_string(),
            total_xp: 0,
            level: 1,
            xp_to_next_level: 0,
            created_at: now,
            updated_at: now,
        };
        record.rederive(config);
        record
    }

    /// Recompute level fields from `total_xp`.
    fn rederive(&mut self, config: &EngineConfig) {
        let progress = config.level_model.progress(self.total_xp);
        self.level = progress.level;
        self.xp_to_next_level = progress.xp_to_next_level;
    }
}

/// Result of one `submit_activity` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub account_id: String,
    pub activity_type: ActivityType,
    /// XP granted for the submitted activity itself.
    pub xp_earned: u64,
    pub leveled_up: bool,
    /// Level right after the activity's own award.
    pub new_level: u32,
    /// Total XP right after the activity's own award.
    pub total_xp: u64,
    /// Level-up bonus XP granted on top, zero when none.
    pub bonus_xp: u64,
    pub settled_level: u32,
    pub settled_total_xp: u64,
    /// Badges unlocked by this call, bonus legs included.
    pub new_badges: Vec<BadgeDefinition>,
    pub streak: StreakTouch,
}

/// Read-only dashboard view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub xp_record: XpRecord,
    pub skills: Vec<SkillView>,
    pub global_progress: GlobalProgress,
    pub earned_badges: Vec<EarnedBadge>,
    pub locked_badges: Vec<BadgeDefinition>,
    pub next_badges: Vec<BadgeDefinition>,
    pub total_badges: usize,
    pub recent_activities: Vec<Activity>,
    pub streak: DailyStreak,
}

/// Everything stored for one account, loaded for a submission.
struct AccountState {
    xp: XpRecord,
    log: ActivityLog,
    counters: ActivityCounters,
    badges: EarnedBadges,
    streak: DailyStreak,
    skills: BTreeMap<String, SkillProgress>,
}

/// Outcome of a single accrual leg.
struct Leg {
    leveled_up: bool,
    level: u32,
    total_xp: u64,
    new_badges: Vec<BadgeDefinition>,
}

/// Orchestrates streaks, XP, the activity log and badges over a store.
pub struct ProgressionService<S> {
    store: S,
    config: EngineConfig,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: ProgressStore> ProgressionService<S> {
    /// Build a service from a validated configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration fails validation.
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record an activity at the current time.
    pub fn submit_activity(&self, account_id: &str, activity_type: ActivityType) -> Result<Snapshot> {
        self.submit_activity_at(account_id, activity_type, Utc::now())
    }

    /// Record an activity from its wire name (e.g. `"chat_message"`).
    pub fn submit_activity_named(&self, account_id: &str, activity_type: &str) -> Result<Snapshot> {
        self.submit_activity(account_id, activity_type.parse()?)
    }

    /// Record an activity as if it happened at `now`.
    ///
    /// # Errors
    /// Fails before touching the store for an empty account id or an activity
    /// type with no configured XP; fails with `StoreUnavailable` if any read
    /// or write fails.
    pub fn submit_activity_at(
        &self,
        account_id: &str,
        activity_type: ActivityType,
        now: DateTime<Utc>,
    ) -> Result<Snapshot> {
        validate_account(account_id)?;
        let xp_earned = self
            .config
            .xp_for(activity_type)
            .ok_or_else(|| CoreError::UnknownActivityType(activity_type.to_string()))?;

        self.with_account(account_id, |store| {
            self.run_submission(store, account_id, activity_type, xp_earned, now)
        })
    }

    fn run_submission(
        &self,
        store: &dyn ProgressStore,
        account_id: &str,
        activity_type: ActivityType,
        xp_earned: u64,
        now: DateTime<Utc>,
    ) -> Result<Snapshot> {
        tracing::debug!(account_id, activity = %activity_type, stage = ?SubmissionStage::Idle, "submission accepted");

        let mut state = self.load_state(store, account_id, now)?;

        let today = self.config.streak_clock().date_of(now);
        let streak = state.streak.touch(today);
        storage::save(store, account_id, &Domain::Streak, &state.streak)?;

        let first = self.accrue(store, &mut state, account_id, activity_type, xp_earned, now)?;
        let mut new_badges = first.new_badges;
        let mut settled = (first.level, first.total_xp);
        let mut bonus_xp = 0u64;

        let mut leveled = first.leveled_up;
        let mut depth = 0;
        while leveled && depth < self.config.bonus.max_cascade {
            depth += 1;
            let bonus = self.config.bonus.level_up_xp;
            tracing::debug!(account_id, depth, bonus, stage = ?SubmissionStage::LevelUpBonus, "granting level-up bonus");
            let leg = self.accrue(store, &mut state, account_id, ActivityType::LevelUp, bonus, now)?;
            bonus_xp = bonus_xp.saturating_add(bonus);
            settled = (leg.level, leg.total_xp);
            new_badges.extend(leg.new_badges);
            leveled = leg.leveled_up;
        }

        tracing::debug!(
            account_id,
            total_xp = settled.1,
            level = settled.0,
            stage = ?SubmissionStage::Settled,
            "submission settled"
        );

        Ok(Snapshot {
            account_id: account_id.to_string(),
            activity_type,
            xp_earned,
            leveled_up: first.leveled_up,
            new_level: first.level,
            total_xp: first.total_xp,
            bonus_xp,
            settled_level: settled.0,
            settled_total_xp: settled.1,
            new_badges,
            streak,
        })
    }

    /// Read the dashboard view of an account without writing anything.
    pub fn get_snapshot(&self, account_id: &str) -> Result<ProgressSnapshot> {
        validate_account(account_id)?;
        let state =
            self.with_account(account_id, |store| self.load_state(store, account_id, Utc::now()))?;
        let (skills, global_progress) = self.dual_view(&state);

        let catalog = &self.config.badges;
        Ok(ProgressSnapshot {
            xp_record: state.xp,
            skills,
            global_progress,
            earned_badges: state.badges.list().to_vec(),
            locked_badges: state.badges.locked(catalog).into_iter().cloned().collect(),
            next_badges: state
                .badges
                .next(catalog, NEXT_BADGE_COUNT)
                .into_iter()
                .cloned()
                .collect(),
            total_badges: catalog.len(),
            recent_activities: state.log.recent(RECENT_ACTIVITY_COUNT),
            streak: state.streak,
        })
    }

    /// Run `f` inside the account's exclusive section.
    fn with_account<T>(
        &self,
        account_id: &str,
        mut f: impl FnMut(&dyn ProgressStore) -> Result<T>,
    ) -> Result<T> {
        let lock = self.account_lock(account_id);
        let outcome = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut output = None;
            let status = self.store.with_account(account_id, &mut |store| {
                output = Some(f(store)?);
                Ok(())
            });
            status.map(|()| output)
        };
        self.release_lock(account_id, lock);

        outcome?.ok_or_else(|| {
            StoreError::Backend(format!("store skipped the unit of work for {account_id}")).into()
        })
    }

    fn account_lock(&self, account_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the account's guard once nobody else holds or waits on it.
    fn release_lock(&self, account_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks
            .get(account_id)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(account_id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    fn load_state(
        &self,
        store: &dyn ProgressStore,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AccountState> {
        let mut xp: XpRecord = storage::load_or_else(store, account_id, &Domain::Xp, || {
            XpRecord::new(account_id, &self.config, now)
        })?;
        // Levels are always derived from the total under the active model.
        xp.rederive(&self.config);

        let mut badges: EarnedBadges = storage::load_or_default(store, account_id, &Domain::Badges)?;
        badges.dedup();

        let mut skills = BTreeMap::new();
        for name in &self.config.skills {
            let progress: SkillProgress =
                storage::load_or_default(store, account_id, &Domain::Skill(name.clone()))?;
            skills.insert(name.clone(), progress.normalized(&self.config.skill_thresholds));
        }

        Ok(AccountState {
            xp,
            log: storage::load_or_default(store, account_id, &Domain::Activities)?,
            counters: storage::load_or_default(store, account_id, &Domain::Counters)?,
            badges,
            streak: storage::load_or_default(store, account_id, &Domain::Streak)?,
            skills,
        })
    }

    fn dual_view(&self, state: &AccountState) -> (Vec<SkillView>, GlobalProgress) {
        dual_progress(
            &self.config.skill_thresholds,
            &self.config.global_thresholds,
            state.skills.iter().map(|(name, p)| (name.as_str(), *p)),
        )
    }

    /// One Accruing + Evaluating pass for `amount` XP of `kind`.
    fn accrue(
        &self,
        store: &dyn ProgressStore,
        state: &mut AccountState,
        account_id: &str,
        kind: ActivityType,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<Leg> {
        tracing::debug!(account_id, activity = %kind, amount, stage = ?SubmissionStage::Accruing, "accruing xp");

        let old_level = state.xp.level;
        state.xp.total_xp = state.xp.total_xp.saturating_add(amount);
        state.xp.rederive(&self.config);
        state.xp.updated_at = now;
        storage::save(store, account_id, &Domain::Xp, &state.xp)?;
        let leveled_up = state.xp.level > old_level;
        if leveled_up {
            tracing::info!(account_id, from = old_level, to = state.xp.level, "level up");
        }

        let skill = self.config.skill_for(kind).map(str::to_string);
        if let Some(name) = &skill {
            let progress = state.skills.entry(name.clone()).or_default();
            if progress.add_xp(&self.config.skill_thresholds, amount) {
                tracing::info!(account_id, skill = %name, level = progress.level, "skill level up");
            }
            storage::save(store, account_id, &Domain::Skill(name.clone()), &*progress)?;
        }

        state.log.push(
            Activity::new(account_id, kind, amount, skill, now),
            self.config.activity_log_capacity,
        );
        storage::save(store, account_id, &Domain::Activities, &state.log)?;
        state.counters.record(kind);
        storage::save(store, account_id, &Domain::Counters, &state.counters)?;

        tracing::debug!(account_id, stage = ?SubmissionStage::Evaluating, "evaluating badges");
        let (_, global) = self.dual_view(state);
        let ctx = BadgeContext {
            total_xp: state.xp.total_xp,
            activity_counts: state.counters.clone(),
            current_streak: state.streak.current_streak,
            skill_levels: state
                .skills
                .iter()
                .map(|(name, p)| (name.clone(), p.level))
                .collect(),
            global_level: global.global_level,
        };
        let new_badges: Vec<BadgeDefinition> = state
            .badges
            .evaluate(&self.config.badges, &ctx, now)
            .into_iter()
            .cloned()
            .collect();
        if !new_badges.is_empty() {
            storage::save(store, account_id, &Domain::Badges, &state.badges)?;
            for badge in &new_badges {
                tracing::info!(account_id, badge = %badge.id, "badge earned");
            }
        }

        Ok(Leg {
            leveled_up,
            level: state.xp.level,
            total_xp: state.xp.total_xp,
            new_badges,
        })
    }
}

fn validate_account(account_id: &str) -> Result<(), ValidationError> {
    if account_id.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "account_id".into(),
            message: "must not be empty".into(),
        });
    }
    Ok(())
}
