//! Durable JSONL audit trail of reset runs.
//!
//! One line per attempt, successful or not, so a failed midnight reset is
//! visible after the fact even when the process log has rotated away.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetTrigger {
    /// Fired by the daily timer.
    Scheduled,
    /// Requested through the API or CLI.
    Manual,
}

impl ResetTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetAuditRecord {
    pub ran_at: DateTime<Utc>,
    pub trigger: ResetTrigger,
    pub status: ResetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResetAuditRecord {
    pub fn succeeded(ran_at: DateTime<Utc>, trigger: ResetTrigger, reset_count: usize) -> Self {
        Self {
            ran_at,
            trigger,
            status: ResetStatus::Ok,
            reset_count: Some(reset_count),
            error: None,
        }
    }

    pub fn failed(ran_at: DateTime<Utc>, trigger: ResetTrigger, error: impl Into<String>) -> Self {
        Self {
            ran_at,
            trigger,
            status: ResetStatus::Error,
            reset_count: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug)]
pub enum AuditError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
}

impl Display for AuditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "reset audit io failure: {err}"),
            Self::Serialize(err) => write!(f, "reset audit encoding failure: {err}"),
        }
    }
}

impl Error for AuditError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for AuditError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Append-only reset audit file.
#[derive(Debug, Clone)]
pub struct ResetAuditLog {
    path: PathBuf,
}

impl ResetAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a JSON line, creating the file and its parent
    /// directory on first use.
    pub fn append(&self, record: &ResetAuditRecord) -> Result<(), AuditError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Reads every record back; a missing file reads as empty.
    pub fn read_records(&self) -> Result<Vec<ResetAuditRecord>, AuditError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }
}
