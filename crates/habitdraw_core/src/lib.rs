//! Core domain logic for habitdraw.
//! This crate owns the habit store, weighted selection, completion rules and
//! the daily reset cycle. Transport and process wiring live in other crates.

pub mod db;
pub mod log_retention;
pub mod logging;
pub mod model;
pub mod repo;
pub mod reset;
pub mod selection;
pub mod service;

pub use log_retention::{PruneReport, RetentionPolicy, DEFAULT_RETENTION_DAYS};
pub use logging::{default_log_level, init_logging, LOG_FILE_BASENAME};
pub use model::habit::{Frequency, Habit, HabitId, HabitPatch, HabitValidationError, NewHabit};
pub use repo::habit_repo::{HabitRepository, RepoError, RepoResult, SqliteHabitRepository};
pub use reset::{
    run_reset, Clock, ManualClock, ResetAuditLog, ResetAuditRecord, ResetOutcome, ResetSchedule,
    ResetStatus, ResetTrigger, SystemClock,
};
pub use service::habit_service::{HabitService, HabitServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
