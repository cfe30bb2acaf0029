use chrono::{TimeZone, Utc};
use habitdraw_api::{AppState, DailyResetScheduler};
use habitdraw_core::db::open_db_in_memory;
use habitdraw_core::{
    Habit, ManualClock, NewHabit, ResetAuditLog, ResetSchedule, ResetStatus, ResetTrigger,
    RetentionPolicy,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn seed_completed_habit(state: &AppState) -> Habit {
    let habit = state
        .with_service(|service| service.create_habit(&NewHabit::new("Read", "daily")))
        .await
        .unwrap();
    let id = habit.id;
    state
        .with_service(move |service| service.complete_habit(id))
        .await
        .unwrap()
        .unwrap()
}

async fn load(state: &AppState, id: i64) -> Habit {
    state
        .with_service(move |service| service.get_habit(id))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn resets_once_per_boundary_and_stops_on_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let audit = ResetAuditLog::new(dir.path().join("reset_audit.jsonl"));
    let state = AppState::new(open_db_in_memory().unwrap()).with_audit_log(audit.clone());
    let habit = seed_completed_habit(&state).await;

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap(),
    ));
    let cancel = CancellationToken::new();
    let handle = DailyResetScheduler::new(
        state.clone(),
        Arc::clone(&clock),
        ResetSchedule::default(),
        cancel.clone(),
    )
    .spawn();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(load(&state, habit.id).await.completed_today);

    tokio::time::sleep(Duration::from_secs(1)).await;
    let after = load(&state, habit.id).await;
    assert!(!after.completed_today);
    assert_eq!(after.streak, 1);

    let records = audit.read_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].trigger, ResetTrigger::Scheduled);
    assert_eq!(records[0].status, ResetStatus::Ok);
    assert_eq!(records[0].reset_count, Some(1));

    // The clock has not moved, so the same boundary must not fire again.
    let id = habit.id;
    state
        .with_service(move |service| service.complete_habit(id))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(load(&state, habit.id).await.completed_today);

    tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
    let next_day = load(&state, habit.id).await;
    assert!(!next_day.completed_today);
    assert_eq!(next_day.streak, 2);
    assert_eq!(audit.read_records().unwrap().len(), 2);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancel_before_boundary_skips_reset() {
    let state = AppState::new(open_db_in_memory().unwrap());
    let habit = seed_completed_habit(&state).await;

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    ));
    let cancel = CancellationToken::new();
    let handle =
        DailyResetScheduler::new(state.clone(), clock, ResetSchedule::default(), cancel.clone())
            .spawn();

    tokio::time::sleep(Duration::from_secs(60)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert!(load(&state, habit.id).await.completed_today);
}

#[tokio::test(start_paused = true)]
async fn reset_and_pruning_follow_the_injected_clock() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("logs");
    std::fs::create_dir_all(&log_dir).unwrap();
    let stale = log_dir.join("habitdraw_r2020-01-15_00-00-00.log");
    let recent = log_dir.join("habitdraw_r2020-02-28_00-00-00.log");
    let live = log_dir.join("habitdraw_rCURRENT.log");
    for path in [&stale, &recent, &live] {
        std::fs::write(path, "line\n").unwrap();
    }

    let audit = ResetAuditLog::new(log_dir.join("reset_audit.jsonl"));
    let state = AppState::new(open_db_in_memory().unwrap()).with_audit_log(audit.clone());
    seed_completed_habit(&state).await;

    let boundary_eve = Utc.with_ymd_and_hms(2020, 3, 1, 23, 59, 59).unwrap();
    let clock = Arc::new(ManualClock::new(boundary_eve));
    let cancel = CancellationToken::new();
    let handle =
        DailyResetScheduler::new(state.clone(), clock, ResetSchedule::default(), cancel.clone())
            .with_retention(RetentionPolicy::new(30))
            .with_log_dir(log_dir.clone())
            .spawn();

    tokio::time::sleep(Duration::from_secs(2)).await;
    cancel.cancel();
    handle.await.unwrap();

    let records = audit.read_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ran_at, boundary_eve);

    assert!(!stale.exists());
    assert!(recent.exists());
    assert!(live.exists());
}
