//! Habit use-case service.
//!
//! # Responsibility
//! - CRUD entry points over the habit store.
//! - Completion transition and streak tracking.
//! - Weighted random pick, alone or combined with completion.
//! - Bulk reset of the daily completion flag.
//!
//! # Invariants
//! - `pick_and_complete` never completes a habit whose `completed_today` flag
//!   changed between the draw and the write.
//! - Repeated completion within one day keeps incrementing `streak`.

use crate::model::habit::{Habit, HabitId, HabitPatch, HabitValidationError, NewHabit};
use crate::repo::habit_repo::{HabitRepository, RepoError};
use crate::selection;
use log::{error, info, warn};
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Draw attempts before `pick_and_complete` gives up on a contended store.
pub const MAX_PICK_ATTEMPTS: usize = 3;

/// Service error for habit use-cases.
///
/// Absent habits are not errors; they come back as `Ok(None)`.
#[derive(Debug)]
pub enum HabitServiceError {
    /// Input rejected before reaching the store.
    Validation(HabitValidationError),
    /// Store failure.
    Repo(RepoError),
    /// The chosen habit kept changing under `pick_and_complete`.
    SelectionConflict { attempts: usize },
}

impl Display for HabitServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::SelectionConflict { attempts } => write!(
                f,
                "selected habit changed concurrently on each of {attempts} attempts"
            ),
        }
    }
}

impl Error for HabitServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::SelectionConflict { .. } => None,
        }
    }
}

impl From<RepoError> for HabitServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<HabitValidationError> for HabitServiceError {
    fn from(value: HabitValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ServiceResult<T> = Result<T, HabitServiceError>;

/// Habit service facade over a repository implementation.
pub struct HabitService<R: HabitRepository> {
    repo: R,
}

impl<R: HabitRepository> HabitService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_habit(&self, input: &NewHabit) -> ServiceResult<Habit> {
        let input = input.normalized()?;
        let habit = self.repo.create_habit(&input)?;
        info!(
            "event=habit_create module=service status=ok habit_id={} frequency={}",
            habit.id, habit.frequency
        );
        Ok(habit)
    }

    pub fn list_habits(&self) -> ServiceResult<Vec<Habit>> {
        Ok(self.repo.list_habits()?)
    }

    pub fn get_habit(&self, id: HabitId) -> ServiceResult<Option<Habit>> {
        Ok(self.repo.get_habit(id)?)
    }

    /// Partial update of name/description/frequency.
    pub fn update_habit(&self, id: HabitId, patch: &HabitPatch) -> ServiceResult<Option<Habit>> {
        let patch = patch.normalized()?;
        let updated = self.repo.update_habit(id, &patch)?;
        log_lookup("habit_update", id, updated.is_some());
        Ok(updated)
    }

    /// Permanently removes a habit and returns its last snapshot.
    pub fn delete_habit(&self, id: HabitId) -> ServiceResult<Option<Habit>> {
        let deleted = self.repo.delete_habit(id)?;
        log_lookup("habit_delete", id, deleted.is_some());
        Ok(deleted)
    }

    /// Marks a habit done for today and bumps its streak.
    pub fn complete_habit(&self, id: HabitId) -> ServiceResult<Option<Habit>> {
        let completed = self.repo.complete_habit(id)?;
        // Not deduplicated: a second completion on the same day bumps the
        // streak again.
        if let Some(habit) = &completed {
            info!(
                "event=habit_complete module=service status=ok habit_id={} streak={}",
                habit.id, habit.streak
            );
        } else {
            log_lookup("habit_complete", id, false);
        }
        Ok(completed)
    }

    /// Weighted random pick without side effects; `None` when no habits exist.
    pub fn pick_habit<G>(&self, rng: &mut G) -> ServiceResult<Option<Habit>>
    where
        G: Rng + ?Sized,
    {
        let habits = self.repo.list_habits()?;
        let picked = selection::pick(&habits, rng).cloned();
        match &picked {
            Some(habit) => info!(
                "event=habit_pick module=service status=ok habit_id={} candidates={}",
                habit.id,
                habits.len()
            ),
            None => info!("event=habit_pick module=service status=empty"),
        }
        Ok(picked)
    }

    /// Weighted random pick followed by completion, as one transaction.
    ///
    /// The completion write only lands if the chosen habit's
    /// `completed_today` flag is unchanged since the draw; otherwise the draw
    /// is repeated, up to [`MAX_PICK_ATTEMPTS`] times.
    pub fn pick_and_complete<G>(&self, rng: &mut G) -> ServiceResult<Option<Habit>>
    where
        G: Rng + ?Sized,
    {
        self.repo.with_transaction(|repo| {
            for attempt in 1..=MAX_PICK_ATTEMPTS {
                let habits = repo.list_habits()?;
                let Some(chosen) = selection::pick(&habits, rng) else {
                    info!("event=habit_pick_complete module=service status=empty");
                    return Ok(None);
                };

                let completed = repo.complete_habit_if(chosen.id, chosen.completed_today)?;
                if let Some(completed) = completed {
                    info!(
                        "event=habit_pick_complete module=service status=ok habit_id={} streak={} attempt={}",
                        completed.id, completed.streak, attempt
                    );
                    return Ok(Some(completed));
                }

                warn!(
                    "event=habit_pick_complete module=service status=retry habit_id={} attempt={}",
                    chosen.id, attempt
                );
            }

            error!(
                "event=habit_pick_complete module=service status=error error_code=selection_conflict attempts={}",
                MAX_PICK_ATTEMPTS
            );
            Err(HabitServiceError::SelectionConflict {
                attempts: MAX_PICK_ATTEMPTS,
            })
        })
    }

    /// Clears `completed_today` for every habit; streaks are untouched.
    ///
    /// Returns the number of habits touched.
    pub fn reset_all(&self) -> ServiceResult<usize> {
        Ok(self.repo.reset_completed_today()?)
    }
}

fn log_lookup(event: &str, id: HabitId, found: bool) {
    if found {
        info!("event={event} module=service status=ok habit_id={id}");
    } else {
        info!("event={event} module=service status=not_found habit_id={id}");
    }
}
