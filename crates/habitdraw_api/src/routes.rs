//! HTTP routes for the habit API.
//!
//! # Responsibility
//! - Map requests onto habit service calls.
//! - Translate absent habits and empty stores into 404 envelopes.
//!
//! # Invariants
//! - `GET /habits/random` is read-only unless `complete=true` is passed.
//! - Handlers never hold the connection lock across an await point.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use habitdraw_core::{
    core_version, run_reset, Habit, HabitId, HabitPatch, NewHabit, ResetTrigger,
};
use serde::{Deserialize, Serialize};

pub const DELETE_MESSAGE: &str = "Habit deleted successfully";
pub const RESET_MESSAGE: &str = "All habits reset for the new day!";

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub message: &'static str,
    pub reset_count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RandomQuery {
    #[serde(default)]
    pub complete: bool,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/habits", get(list_habits).post(create_habit))
        .route("/habits/", get(list_habits).post(create_habit))
        .route("/habits/random", get(random_habit))
        .route("/habits/reset", post(reset_habits))
        .route(
            "/habits/{id}",
            get(get_habit).put(update_habit).delete(delete_habit),
        )
        .route("/habits/{id}/complete", patch(complete_habit))
        .with_state(state)
}

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "Habit Tracker API is running!",
        version: core_version(),
    })
}

async fn create_habit(
    State(state): State<AppState>,
    payload: Result<Json<NewHabit>, JsonRejection>,
) -> Result<(StatusCode, Json<Habit>), ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::invalid_json(&rejection))?;
    let habit = state
        .with_service(move |service| service.create_habit(&input))
        .await?;
    Ok((StatusCode::CREATED, Json(habit)))
}

async fn list_habits(State(state): State<AppState>) -> Result<Json<Vec<Habit>>, ApiError> {
    let habits = state.with_service(|service| service.list_habits()).await?;
    Ok(Json(habits))
}

async fn get_habit(
    State(state): State<AppState>,
    id: Result<Path<HabitId>, PathRejection>,
) -> Result<Json<Habit>, ApiError> {
    let Path(id) = id.map_err(|rejection| ApiError::invalid_path(&rejection))?;
    state
        .with_service(move |service| service.get_habit(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::habit_not_found(id))
}

async fn update_habit(
    State(state): State<AppState>,
    id: Result<Path<HabitId>, PathRejection>,
    payload: Result<Json<HabitPatch>, JsonRejection>,
) -> Result<Json<Habit>, ApiError> {
    let Path(id) = id.map_err(|rejection| ApiError::invalid_path(&rejection))?;
    let Json(patch) = payload.map_err(|rejection| ApiError::invalid_json(&rejection))?;
    state
        .with_service(move |service| service.update_habit(id, &patch))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::habit_not_found(id))
}

async fn delete_habit(
    State(state): State<AppState>,
    id: Result<Path<HabitId>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id.map_err(|rejection| ApiError::invalid_path(&rejection))?;
    state
        .with_service(move |service| service.delete_habit(id))
        .await?
        .map(|_| {
            Json(MessageResponse {
                message: DELETE_MESSAGE,
            })
        })
        .ok_or_else(|| ApiError::habit_not_found(id))
}

async fn complete_habit(
    State(state): State<AppState>,
    id: Result<Path<HabitId>, PathRejection>,
) -> Result<Json<Habit>, ApiError> {
    let Path(id) = id.map_err(|rejection| ApiError::invalid_path(&rejection))?;
    state
        .with_service(move |service| service.complete_habit(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::habit_not_found(id))
}

async fn random_habit(
    State(state): State<AppState>,
    query: Result<Query<RandomQuery>, QueryRejection>,
) -> Result<Json<Habit>, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::invalid_query(&rejection))?;
    state
        .with_service(move |service| {
            let mut rng = rand::thread_rng();
            if query.complete {
                service.pick_and_complete(&mut rng)
            } else {
                service.pick_habit(&mut rng)
            }
        })
        .await?
        .map(Json)
        .ok_or_else(ApiError::no_habits)
}

async fn reset_habits(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    let audit = state.audit_log();
    let outcome = state
        .with_service(move |service| {
            run_reset(service, ResetTrigger::Manual, Utc::now(), audit.as_deref())
        })
        .await?;
    Ok(Json(ResetResponse {
        message: RESET_MESSAGE,
        reset_count: outcome.reset_count,
    }))
}
