//! Background task that runs the daily reset at the configured wall-clock time.
//!
//! # Invariants
//! - At most one reset per scheduled boundary, even when the clock lags the
//!   timer.
//! - A failed reset is logged and audited; the loop moves on to the next day.
//! - Cancelling the token stops the loop between runs.
//! - Reset stamps and retention cutoffs come from the injected clock.

use crate::state::AppState;
use chrono::{TimeZone, Utc};
use habitdraw_core::{
    run_reset, Clock, ResetSchedule, ResetTrigger, RetentionPolicy, LOG_FILE_BASENAME,
};
use log::{debug, info, warn};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct DailyResetScheduler<C: Clock> {
    state: AppState,
    clock: Arc<C>,
    schedule: ResetSchedule,
    retention: RetentionPolicy,
    log_dir: Option<PathBuf>,
    cancel: CancellationToken,
}

impl<C> DailyResetScheduler<C>
where
    C: Clock + 'static,
    <C::Tz as TimeZone>::Offset: Send + Display,
{
    pub fn new(
        state: AppState,
        clock: Arc<C>,
        schedule: ResetSchedule,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state,
            clock,
            schedule,
            retention: RetentionPolicy::default(),
            log_dir: None,
            cancel,
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Directory whose rotated process logs are pruned after each reset.
    pub fn with_log_dir(mut self, log_dir: PathBuf) -> Self {
        self.log_dir = Some(log_dir);
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let mut next_run = self.schedule.next_after(&self.clock.now());
        info!(
            "event=reset_scheduler module=scheduler status=started schedule=\"{}\" next_run={}",
            self.schedule,
            next_run.to_rfc3339()
        );

        loop {
            let delay = next_run
                .clone()
                .signed_duration_since(self.clock.now())
                .to_std()
                .unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("event=reset_scheduler module=scheduler status=stopped");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            self.run_once().await;

            let now = self.clock.now();
            let base = if now > next_run { now } else { next_run };
            next_run = self.schedule.next_after(&base);
            info!(
                "event=reset_scheduler module=scheduler status=rescheduled next_run={}",
                next_run.to_rfc3339()
            );
        }
    }

    async fn run_once(&self) {
        let now = self.clock.now().with_timezone(&Utc);
        let audit = self.state.audit_log();
        let for_reset = audit.clone();
        let reset = self
            .state
            .with_service(move |service| {
                run_reset(service, ResetTrigger::Scheduled, now, for_reset.as_deref())
            })
            .await;
        // Store failures were logged and audited by `run_reset`.
        if let Err(err) = reset {
            debug!("event=daily_reset module=scheduler status=error error={err}");
        }

        let retention = self.retention;
        let log_dir = self.log_dir.clone();
        let pruned = tokio::task::spawn_blocking(move || {
            if let Some(audit) = audit {
                retention.prune_file(audit.path(), now)?;
            }
            if let Some(dir) = log_dir {
                retention.prune_rotated_logs(&dir, LOG_FILE_BASENAME, now)?;
            }
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(|err| err.to_string())
        .and_then(|result| result.map_err(|err| err.to_string()));
        if let Err(err) = pruned {
            warn!("event=log_prune module=scheduler status=error error={err}");
        }
    }
}
