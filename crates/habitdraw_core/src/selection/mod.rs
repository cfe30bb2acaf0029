//! Weighted-random habit selection.
//!
//! # Responsibility
//! - Decide which habits are eligible for a draw (the candidate pool).
//! - Weight candidates so low-streak, high-frequency habits come up more often.
//! - Draw one candidate with probability proportional to its weight.
//!
//! # Invariants
//! - A non-empty input always yields a pick; an empty input never does.
//! - Every candidate weight is at least 1.
//! - Selection here is read-only; completion is applied by the service.

mod weights;

pub use weights::{base_weight, effective_weight, frequency_multiplier, BASE_WEIGHT_CEILING};

use crate::model::habit::Habit;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Habits eligible for the next draw.
///
/// Habits not yet completed today, or every habit when all are completed.
pub fn candidate_pool(habits: &[Habit]) -> Vec<&Habit> {
    let pending: Vec<&Habit> = habits
        .iter()
        .filter(|habit| !habit.completed_today)
        .collect();
    if pending.is_empty() {
        habits.iter().collect()
    } else {
        pending
    }
}

/// Picks one habit from `habits`, or `None` when `habits` is empty.
///
/// Each candidate's chance equals its [`effective_weight`] divided by the sum
/// of weights in the [`candidate_pool`].
pub fn pick<'a, G>(habits: &'a [Habit], rng: &mut G) -> Option<&'a Habit>
where
    G: Rng + ?Sized,
{
    let pool = candidate_pool(habits);
    if pool.is_empty() {
        return None;
    }

    let index = WeightedIndex::new(pool.iter().map(|habit| effective_weight(habit))).ok()?;
    pool.get(index.sample(rng)).copied()
}
