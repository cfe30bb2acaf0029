//! One run of the daily reset: store write, log event, audit record.

use super::audit::{ResetAuditLog, ResetAuditRecord, ResetTrigger};
use crate::repo::habit_repo::HabitRepository;
use crate::service::habit_service::{HabitService, ServiceResult};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    pub trigger: ResetTrigger,
    pub ran_at: DateTime<Utc>,
    /// Habits whose `completed_today` flag was cleared.
    pub reset_count: usize,
}

/// Clears `completed_today` on every habit and records the attempt.
///
/// `ran_at` stamps the outcome and the audit record; the scheduler passes its
/// clock's reading, manual callers pass the wall clock.
///
/// The store error, if any, is returned unchanged after it has been logged
/// and audited. An audit write failure is logged but does not change the
/// result of the reset itself.
pub fn run_reset<R: HabitRepository>(
    service: &HabitService<R>,
    trigger: ResetTrigger,
    ran_at: DateTime<Utc>,
    audit: Option<&ResetAuditLog>,
) -> ServiceResult<ResetOutcome> {
    let started_at = Instant::now();

    match service.reset_all() {
        Ok(reset_count) => {
            info!(
                "event=daily_reset module=reset status=ok trigger={} reset_count={} duration_ms={}",
                trigger.as_str(),
                reset_count,
                started_at.elapsed().as_millis()
            );
            record(
                audit,
                &ResetAuditRecord::succeeded(ran_at, trigger, reset_count),
            );
            Ok(ResetOutcome {
                trigger,
                ran_at,
                reset_count,
            })
        }
        Err(err) => {
            error!(
                "event=daily_reset module=reset status=error trigger={} duration_ms={} error={}",
                trigger.as_str(),
                started_at.elapsed().as_millis(),
                err
            );
            record(
                audit,
                &ResetAuditRecord::failed(ran_at, trigger, err.to_string()),
            );
            Err(err)
        }
    }
}

fn record(audit: Option<&ResetAuditLog>, entry: &ResetAuditRecord) {
    let Some(audit) = audit else {
        return;
    };
    if let Err(err) = audit.append(entry) {
        warn!(
            "event=reset_audit module=reset status=error path={} error={}",
            audit.path().display(),
            err
        );
    }
}
