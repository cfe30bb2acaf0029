//! Domain model for tracked habits.
//!
//! # Invariants
//! - Every habit is identified by a store-assigned `HabitId` that is never
//!   reused.
//! - `streak` is non-negative by construction (`u32`).

pub mod habit;
