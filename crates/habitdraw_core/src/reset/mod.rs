//! Daily reset cycle.
//!
//! # Responsibility
//! - Compute when the next day boundary falls (`schedule`).
//! - Run one reset with logging and an audit record (`cycle`).
//! - Keep a durable JSONL trail of every reset attempt (`audit`).
//!
//! # Invariants
//! - A reset clears `completed_today` on every habit in one statement and never
//!   touches `streak`.
//! - Failed resets are reported to the caller and audited, never swallowed.
//!
//! Whatever drives the schedule (a tokio task, a cron entry, a CLI call) lives
//! outside this module and only calls [`run_reset`].

pub mod audit;
pub mod cycle;
pub mod schedule;

pub use audit::{AuditError, ResetAuditLog, ResetAuditRecord, ResetStatus, ResetTrigger};
pub use cycle::{run_reset, ResetOutcome};
pub use schedule::{Clock, ManualClock, ResetSchedule, ScheduleParseError, SystemClock};
