//! HTTP surface for habitdraw.
//!
//! Wires the core habit service into an axum router, owns the shared SQLite
//! connection, and drives the daily reset on a tokio timer.

pub mod config;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::app;
pub use scheduler::DailyResetScheduler;
pub use state::AppState;
