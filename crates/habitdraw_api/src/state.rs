//! Shared handler state: one SQLite connection and the reset audit trail.
//!
//! # Invariants
//! - All store access goes through [`AppState::with_service`], which holds the
//!   connection lock for the whole closure. There is a single active writer.
//! - Store work runs on the blocking pool, never on a runtime worker.

use crate::error::ApiError;
use habitdraw_core::{
    HabitService, HabitServiceError, ResetAuditLog, ServiceResult, SqliteHabitRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    audit: Option<Arc<ResetAuditLog>>,
}

impl AppState {
    /// `conn` must already be migrated (see `habitdraw_core::db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            audit: None,
        }
    }

    pub fn with_audit_log(mut self, audit: ResetAuditLog) -> Self {
        self.audit = Some(Arc::new(audit));
        self
    }

    pub fn audit_log(&self) -> Option<Arc<ResetAuditLog>> {
        self.audit.clone()
    }

    /// Runs `f` against a habit service bound to the shared connection.
    pub async fn with_service<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&HabitService<SqliteHabitRepository<'_>>) -> ServiceResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let joined = tokio::task::spawn_blocking(move || {
            // A panic mid-request leaves no open transaction behind; rusqlite
            // rolls back on drop.
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            let repo = SqliteHabitRepository::try_new(&guard).map_err(HabitServiceError::from)?;
            f(&HabitService::new(repo))
        })
        .await;

        match joined {
            Ok(result) => result.map_err(ApiError::from),
            Err(err) => Err(ApiError::store_failure(format!(
                "blocking store task failed: {err}"
            ))),
        }
    }
}
