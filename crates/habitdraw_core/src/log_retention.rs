//! Age-based pruning for line-oriented log files.
//!
//! # Responsibility
//! - Drop lines older than a retention window from files the process owns
//!   (the reset audit trail, exported logs).
//! - Delete rotated process log files whose rotation stamp is older than the
//!   same window.
//!
//! # Invariants
//! - Lines without a recognizable timestamp are always kept.
//! - The file is replaced atomically (write to a sibling, then rename).
//! - A file with nothing to prune is left untouched.
//! - The live log file and files with unrecognized names are never deleted.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use std::fs;
use std::io;
use std::path::Path;

pub const DEFAULT_RETENTION_DAYS: u32 = 30;

const JSON_TIMESTAMP_KEYS: [&str; 3] = ["ran_at", "ts", "timestamp"];
const ROTATION_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const ROTATION_STAMP_LEN: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_age_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_DAYS)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub kept: usize,
    pub removed: usize,
}

impl RetentionPolicy {
    /// A zero-day window is raised to one day.
    pub fn new(max_age_days: u32) -> Self {
        Self {
            max_age_days: max_age_days.max(1),
        }
    }

    pub fn max_age_days(&self) -> u32 {
        self.max_age_days
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - TimeDelta::days(i64::from(self.max_age_days))
    }

    /// Rewrites `path` without the lines stamped before [`Self::cutoff`].
    ///
    /// A missing file is not an error and reports nothing pruned.
    pub fn prune_file(&self, path: &Path, now: DateTime<Utc>) -> io::Result<PruneReport> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(PruneReport::default())
            }
            Err(err) => return Err(err),
        };

        let cutoff = self.cutoff(now);
        let mut kept_lines = Vec::new();
        let mut report = PruneReport::default();
        for line in text.lines() {
            match line_timestamp(line) {
                Some(stamp) if stamp < cutoff => report.removed += 1,
                _ => {
                    report.kept += 1;
                    kept_lines.push(line);
                }
            }
        }

        if report.removed == 0 {
            return Ok(report);
        }

        let mut rewritten = kept_lines.join("\n");
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        let staging = path.with_extension("prune.tmp");
        fs::write(&staging, rewritten)?;
        fs::rename(&staging, path)?;

        log::info!(
            "event=log_prune module=log_retention status=ok path={} kept={} removed={}",
            path.display(),
            report.kept,
            report.removed
        );
        Ok(report)
    }

    /// Deletes rotated `<basename>_r<stamp>*` files in `dir` stamped before
    /// [`Self::cutoff`] and returns how many were removed.
    ///
    /// A missing directory is not an error.
    pub fn prune_rotated_logs(
        &self,
        dir: &Path,
        basename: &str,
        now: DateTime<Utc>,
    ) -> io::Result<usize> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err),
        };

        let cutoff = self.cutoff(now);
        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let stamp = name
                .to_str()
                .and_then(|name| rotation_stamp(name, basename));
            let Some(stamp) = stamp else {
                continue;
            };
            if stamp < cutoff && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        if removed > 0 {
            log::info!(
                "event=log_prune module=log_retention status=ok dir={} removed_files={}",
                dir.display(),
                removed
            );
        }
        Ok(removed)
    }
}

/// Rotation stamp of a rotated log file name, read as local time.
///
/// `habitdraw_r2026-03-01_00-00-05.log` yields `2026-03-01 00:00:05`;
/// `habitdraw_rCURRENT.log` yields nothing.
fn rotation_stamp(file_name: &str, basename: &str) -> Option<DateTime<Utc>> {
    let rest = file_name.strip_prefix(basename)?.strip_prefix("_r")?;
    let raw = rest.get(..ROTATION_STAMP_LEN)?;
    let naive = NaiveDateTime::parse_from_str(raw, ROTATION_STAMP_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|stamp| stamp.with_timezone(&Utc))
}

/// Extracts the timestamp of one log line.
///
/// Understands JSON lines carrying an RFC 3339 `ran_at`, `ts` or `timestamp`
/// field, and text lines starting with `[YYYY-MM-DD HH:MM:SS(.f)( +HH:MM)]`.
pub fn line_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
        return JSON_TIMESTAMP_KEYS.iter().find_map(|key| {
            value
                .get(key)
                .and_then(serde_json::Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|stamp| stamp.with_timezone(&Utc))
        });
    }

    let rest = trimmed.strip_prefix('[')?;
    let inner = &rest[..rest.find(']')?];
    DateTime::parse_from_str(inner, "%Y-%m-%d %H:%M:%S%.f %:z")
        .map(|stamp| stamp.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(inner, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
