use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use habitdraw_api::{app, AppState};
use habitdraw_core::db::{open_db, open_db_in_memory};
use habitdraw_core::{ResetAuditLog, ResetStatus, ResetTrigger};
use rusqlite::Connection;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_router() -> Router {
    app(AppState::new(open_db_in_memory().unwrap()))
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(router: &Router, name: &str, frequency: &str) -> Value {
    let (status, body) = send(
        router,
        "POST",
        "/habits",
        Some(json!({"name": name, "frequency": frequency})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn id_of(habit: &Value) -> i64 {
    habit["id"].as_i64().unwrap()
}

#[tokio::test]
async fn root_reports_running() {
    let router = test_router();
    let (status, body) = send(&router, "GET", "/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Habit Tracker API is running!");
    assert!(body["version"].as_str().is_some_and(|v| !v.is_empty()));
}

#[tokio::test]
async fn create_returns_new_habit_with_defaults() {
    let router = test_router();
    let (status, body) = send(
        &router,
        "POST",
        "/habits/",
        Some(json!({"name": "Read", "description": "20 pages", "frequency": "daily"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(id_of(&body) > 0);
    assert_eq!(body["name"], "Read");
    assert_eq!(body["description"], "20 pages");
    assert_eq!(body["frequency"], "daily");
    assert_eq!(body["streak"], 0);
    assert_eq!(body["completed_today"], false);

    let (status, list) = send(&router, "GET", "/habits", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0], body);
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let router = test_router();

    let (status, body) = send(
        &router,
        "POST",
        "/habits",
        Some(json!({"name": "   ", "frequency": "daily"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body) = send(&router, "POST", "/habits", Some(json!({"name": "Run"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/habits")
                .header("content-type", "application/json")
                .body(Body::from("{"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, list) = send(&router, "GET", "/habits", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn get_unknown_habit_returns_not_found() {
    let router = test_router();
    let (status, body) = send(&router, "GET", "/habits/999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "habit_not_found");
}

#[tokio::test]
async fn non_numeric_id_is_a_validation_error() {
    let router = test_router();
    let (status, body) = send(&router, "GET", "/habits/abc", None).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn update_applies_only_supplied_fields() {
    let router = test_router();
    let created = create(&router, "Walk", "daily").await;
    let id = id_of(&created);

    let (status, updated) = send(
        &router,
        "PUT",
        &format!("/habits/{id}"),
        Some(json!({"name": "X"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "X");
    assert_eq!(updated["frequency"], "daily");
    assert_eq!(updated["streak"], 0);

    let (_, updated) = send(
        &router,
        "PUT",
        &format!("/habits/{id}"),
        Some(json!({"description": ""})),
    )
    .await;
    assert_eq!(updated["description"], "");

    let (_, updated) = send(
        &router,
        "PUT",
        &format!("/habits/{id}"),
        Some(json!({"description": null})),
    )
    .await;
    assert_eq!(updated["description"], Value::Null);

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/habits/{id}"),
        Some(json!({"frequency": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = send(&router, "PUT", "/habits/999", Some(json!({"name": "Y"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_habit() {
    let router = test_router();
    let id = id_of(&create(&router, "Meditate", "weekly").await);

    let (status, body) = send(&router, "DELETE", &format!("/habits/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Habit deleted successfully"}));

    let (status, _) = send(&router, "GET", &format!("/habits/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, "DELETE", &format!("/habits/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn complete_bumps_streak_every_call() {
    let router = test_router();
    let id = id_of(&create(&router, "Journal", "daily").await);

    let (status, body) = send(&router, "PATCH", &format!("/habits/{id}/complete"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["streak"], 1);
    assert_eq!(body["completed_today"], true);

    let (_, body) = send(&router, "PATCH", &format!("/habits/{id}/complete"), None).await;
    assert_eq!(body["streak"], 2);

    let (status, body) = send(&router, "PATCH", "/habits/999/complete", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "habit_not_found");
}

#[tokio::test]
async fn random_on_empty_store_returns_no_habits() {
    let router = test_router();

    for uri in ["/habits/random", "/habits/random?complete=true"] {
        let (status, body) = send(&router, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "no_habits");
    }
}

#[tokio::test]
async fn random_is_read_only_unless_complete_is_requested() {
    let router = test_router();
    let created = create(&router, "Floss", "daily").await;
    let id = id_of(&created);

    let (status, picked) = send(&router, "GET", "/habits/random", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(picked, created);

    let (_, stored) = send(&router, "GET", &format!("/habits/{id}"), None).await;
    assert_eq!(stored["streak"], 0);
    assert_eq!(stored["completed_today"], false);

    let (status, picked) = send(&router, "GET", "/habits/random?complete=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(id_of(&picked), id);
    assert_eq!(picked["streak"], 1);
    assert_eq!(picked["completed_today"], true);

    let (status, body) = send(&router, "GET", "/habits/random?complete=maybe", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn reset_clears_flags_keeps_streaks_and_audits() {
    let dir = tempfile::tempdir().unwrap();
    let audit = ResetAuditLog::new(dir.path().join("reset_audit.jsonl"));
    let router = app(AppState::new(open_db_in_memory().unwrap()).with_audit_log(audit.clone()));
    let first = id_of(&create(&router, "A", "daily").await);
    create(&router, "B", "weekly").await;
    send(&router, "PATCH", &format!("/habits/{first}/complete"), None).await;

    let (status, body) = send(&router, "POST", "/habits/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "All habits reset for the new day!");
    assert_eq!(body["reset_count"], 2);

    let (_, list) = send(&router, "GET", "/habits", None).await;
    for habit in list.as_array().unwrap() {
        assert_eq!(habit["completed_today"], false);
    }
    assert_eq!(list[0]["streak"], 1);

    let records = audit.read_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].trigger, ResetTrigger::Manual);
    assert_eq!(records[0].status, ResetStatus::Ok);
}

#[tokio::test]
async fn reset_store_failure_returns_500() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("habits.db");
    let audit = ResetAuditLog::new(dir.path().join("reset_audit.jsonl"));
    let router = app(AppState::new(open_db(&db_path).unwrap()).with_audit_log(audit.clone()));
    create(&router, "A", "daily").await;

    let saboteur = Connection::open(&db_path).unwrap();
    saboteur
        .execute_batch(
            "CREATE TRIGGER habits_read_only BEFORE UPDATE ON habits
             BEGIN
                 SELECT RAISE(ABORT, 'store offline');
             END;",
        )
        .unwrap();
    drop(saboteur);

    let (status, body) = send(&router, "POST", "/habits/reset", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "store_failure");

    let records = audit.read_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ResetStatus::Error);
}
