//! Server configuration with defaults for local use.

use habitdraw_core::{default_log_level, ResetSchedule, DEFAULT_RETENTION_DAYS};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_PATH: &str = "./habits.db";
pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const DEFAULT_PORT: u16 = 8000;
pub const AUDIT_LOG_FILE_NAME: &str = "reset_audit.jsonl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub reset_at: ResetSchedule,
    /// Defaults to `<log_dir>/reset_audit.jsonl` when unset.
    pub audit_log_path: Option<PathBuf>,
    pub log_retention_days: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_level: default_log_level().to_string(),
            reset_at: ResetSchedule::default(),
            audit_log_path: None,
            log_retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl ServerConfig {
    pub fn audit_log_path(&self) -> PathBuf {
        self.audit_log_path
            .clone()
            .unwrap_or_else(|| self.log_dir.join(AUDIT_LOG_FILE_NAME))
    }

    /// Resolves relative paths against `base` so logging and the audit trail
    /// do not depend on later working-directory changes.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        self.db_path = absolutize(base, &self.db_path);
        self.log_dir = absolutize(base, &self.log_dir);
        self.audit_log_path = self.audit_log_path.map(|path| absolutize(base, &path));
        self
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
