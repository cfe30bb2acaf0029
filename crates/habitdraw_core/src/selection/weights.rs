use crate::model::habit::{Frequency, Habit};

/// Base weight of a habit with no streak.
pub const BASE_WEIGHT_CEILING: u32 = 5;

/// `max(1, 5 - streak)`: fresh habits weigh more than established ones.
pub fn base_weight(streak: u32) -> u32 {
    BASE_WEIGHT_CEILING.saturating_sub(streak).max(1)
}

/// Daily ×3, weekly ×2, anything else ×1.
pub fn frequency_multiplier(frequency: &Frequency) -> u32 {
    match frequency {
        Frequency::Daily => 3,
        Frequency::Weekly => 2,
        Frequency::Other(_) => 1,
    }
}

pub fn effective_weight(habit: &Habit) -> u32 {
    base_weight(habit.streak) * frequency_multiplier(&habit.frequency)
}
