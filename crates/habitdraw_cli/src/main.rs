//! habitdraw process entry point.
//!
//! # Responsibility
//! - Parse configuration from flags and `HABITDRAW_*` variables.
//! - Start logging, open the store, and run the selected command.
//! - Serve until Ctrl-C, then stop the reset scheduler cleanly.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use habitdraw_api::config::{DEFAULT_DB_PATH, DEFAULT_LOG_DIR};
use habitdraw_api::{app, AppState, DailyResetScheduler, ServerConfig};
use habitdraw_core::db::open_db;
use habitdraw_core::{
    default_log_level, init_logging, run_reset, HabitService, ResetAuditLog, ResetSchedule,
    ResetTrigger, RetentionPolicy, SqliteHabitRepository, SystemClock, DEFAULT_RETENTION_DAYS,
};
use log::{info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "habitdraw", version, about = "Weighted-random habit tracker")]
struct Cli {
    #[command(flatten)]
    settings: Settings,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API and run the daily reset (default)
    Serve,
    /// Create or migrate the database, then exit
    InitDb,
    /// Clear every completion flag once, then exit
    Reset,
}

#[derive(Debug, Args)]
struct Settings {
    #[arg(long, env = "HABITDRAW_DB_PATH", default_value = DEFAULT_DB_PATH, global = true)]
    db: PathBuf,
    #[arg(long, env = "HABITDRAW_BIND", default_value = "127.0.0.1:8000", global = true)]
    bind: SocketAddr,
    #[arg(long, env = "HABITDRAW_LOG_DIR", default_value = DEFAULT_LOG_DIR, global = true)]
    log_dir: PathBuf,
    /// trace|debug|info|warn|error; defaults by build mode
    #[arg(long, env = "HABITDRAW_LOG_LEVEL", global = true)]
    log_level: Option<String>,
    /// Local wall-clock time of the daily reset, `HH:MM`
    #[arg(long, env = "HABITDRAW_RESET_AT", default_value = "00:00", global = true)]
    reset_at: ResetSchedule,
    /// Defaults to `<log-dir>/reset_audit.jsonl`
    #[arg(long, env = "HABITDRAW_AUDIT_LOG", global = true)]
    audit_log: Option<PathBuf>,
    #[arg(long, env = "HABITDRAW_LOG_RETENTION_DAYS", default_value_t = DEFAULT_RETENTION_DAYS, global = true)]
    log_retention_days: u32,
}

impl Settings {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            db_path: self.db,
            bind: self.bind,
            log_dir: self.log_dir,
            log_level: self
                .log_level
                .unwrap_or_else(|| default_log_level().to_string()),
            reset_at: self.reset_at,
            audit_log_path: self.audit_log,
            log_retention_days: self.log_retention_days,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("cannot read working directory")?;
    let config = cli.settings.into_config().resolved_against(&cwd);

    init_logging(&config.log_level, &config.log_dir).map_err(anyhow::Error::msg)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::InitDb => init_db(&config),
        Command::Reset => reset_once(&config),
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    let conn = open_db(&config.db_path)
        .with_context(|| format!("cannot open database {}", config.db_path.display()))?;
    let state = AppState::new(conn).with_audit_log(ResetAuditLog::new(config.audit_log_path()));

    let cancel = CancellationToken::new();
    let scheduler = DailyResetScheduler::new(
        state.clone(),
        Arc::new(SystemClock),
        config.reset_at,
        cancel.clone(),
    )
    .with_retention(RetentionPolicy::new(config.log_retention_days))
    .with_log_dir(config.log_dir.clone())
    .spawn();

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;
    info!(
        "event=http_listen module=cli status=ok addr={}",
        listener.local_addr()?
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("http server failed")?;

    cancel.cancel();
    scheduler.await.context("reset scheduler panicked")?;
    info!("event=app_stop module=cli status=ok");
    Ok(())
}

fn init_db(config: &ServerConfig) -> Result<()> {
    open_db(&config.db_path)
        .with_context(|| format!("cannot open database {}", config.db_path.display()))?;
    println!("database ready at {}", config.db_path.display());
    Ok(())
}

fn reset_once(config: &ServerConfig) -> Result<()> {
    let conn = open_db(&config.db_path)
        .with_context(|| format!("cannot open database {}", config.db_path.display()))?;
    let service = HabitService::new(SqliteHabitRepository::try_new(&conn)?);
    let audit = ResetAuditLog::new(config.audit_log_path());
    let outcome = run_reset(&service, ResetTrigger::Manual, Utc::now(), Some(&audit))?;
    println!("reset {} habit(s)", outcome.reset_count);
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=shutdown_signal module=cli status=error error={err}");
        cancel.cancelled().await;
        return;
    }
    info!("event=shutdown_signal module=cli status=ok");
    cancel.cancel();
}
