//! Wall-clock schedule for the daily reset and the clock capability it reads.

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

/// Source of "now" for the reset scheduler.
pub trait Clock: Send + Sync {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// Process-local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Settable UTC clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for ManualClock {
    type Tz = Utc;

    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleParseError(String);

impl Display for ScheduleParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid reset time `{}`; expected HH:MM", self.0)
    }
}

impl Error for ScheduleParseError {}

/// Fires once per day at a fixed local wall-clock time (midnight by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSchedule {
    at: NaiveTime,
}

impl Default for ResetSchedule {
    fn default() -> Self {
        Self { at: NaiveTime::MIN }
    }
}

impl ResetSchedule {
    pub fn daily_at(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// First occurrence of the reset time strictly after `now`, in `now`'s
    /// time zone.
    ///
    /// A reset time that falls into a DST gap moves one hour forward; an
    /// ambiguous one resolves to the earlier instant.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let mut date = now.naive_local().date();

        for _ in 0..3 {
            if let Some(candidate) = resolve_local(&tz, date.and_time(self.at)) {
                if candidate > *now {
                    return candidate;
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        now.clone() + TimeDelta::days(1)
    }

    /// Time left until [`ResetSchedule::next_after`].
    pub fn delay_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        (self.next_after(now) - now.clone())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl FromStr for ResetSchedule {
    type Err = ScheduleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map(Self::daily_at)
            .map_err(|_| ScheduleParseError(trimmed.to_string()))
    }
}

impl Display for ResetSchedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "daily at {}", self.at.format("%H:%M"))
    }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + TimeDelta::hours(1))).earliest())
}
