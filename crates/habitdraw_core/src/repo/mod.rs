//! Habit store contracts and the SQLite implementation.
//!
//! # Responsibility
//! - Define the storage operations the core consumes (`HabitRepository`).
//! - Keep SQL inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate input before touching SQL.
//! - Absent rows surface as `Ok(None)`, never as an error.

pub mod habit_repo;
