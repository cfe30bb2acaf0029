//! Habit use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the operations the API exposes.
//! - Keep HTTP and scheduling layers decoupled from storage details.

pub mod habit_service;
