//! # Questline Core Library
//!
//! Progression engine for a learning companion: activities earn XP, XP rolls
//! up into levels, daily activity builds streaks, and milestones unlock badges.
//! The `questline` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Progression**: pure level, streak, skill and badge rules plus the
//!   [`ProgressionService`] that applies them per account
//! - **Storage**: a keyed JSON record store ([`ProgressStore`]) with SQLite and
//!   in-memory backends, and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`ProgressionService`]: `submit_activity` and `get_snapshot`
//! - [`ProgressDb`]: SQLite persistence
//! - [`EngineConfig`]: XP amounts, level tables and the badge catalog

pub mod error;
pub mod progression;
pub mod storage;

pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use progression::{
    ActivityType, BadgeDefinition, LevelModel, ProgressSnapshot, ProgressionService, Snapshot,
};
pub use storage::{EngineConfig, MemoryStore, ProgressDb, ProgressStore};
