use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{json_body, path_param, query_params};
use crate::progress::{calculate_level, Achievement};
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_progress).delete(reset_progress))
        .route("/xp", post(add_xp))
        .route("/quiz", post(complete_quiz))
        .route("/activity", post(record_activity))
        .route("/completion", put(set_completion))
        .route("/session-time", post(add_session_time))
        .route("/stages/:id", post(complete_stage))
}

#[derive(Debug, Deserialize)]
pub struct LevelQuery {
    xp: u32,
}

pub async fn level(query: Result<Query<LevelQuery>, QueryRejection>) -> Result<Response, AppError> {
    let LevelQuery { xp } = query_params(query)?;
    Ok(ok(calculate_level(xp)))
}

async fn get_progress(State(state): State<AppState>) -> Response {
    ok(state.snapshot().await)
}

async fn reset_progress(State(state): State<AppState>) -> Response {
    tracing::info!("progress reset requested");
    ok(state.reset().await)
}

#[derive(Debug, Deserialize)]
struct AddXpRequest {
    amount: u32,
}

async fn add_xp(
    State(state): State<AppState>,
    payload: Result<Json<AddXpRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let AddXpRequest { amount } = json_body(payload)?;
    let gain = state.mutate(|progress| progress.add_xp(amount, Utc::now())).await;
    if gain.leveled_up {
        tracing::info!(level = gain.level_progress.current_level, xp = gain.new_xp, "level up");
    }
    Ok(ok(gain))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizRequest {
    correct_answers: u32,
    total_questions: u32,
}

async fn complete_quiz(
    State(state): State<AppState>,
    payload: Result<Json<QuizRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let QuizRequest {
        correct_answers,
        total_questions,
    } = json_body(payload)?;
    let outcome = state
        .update(|progress| progress.complete_quiz(correct_answers, total_questions, Utc::now()))
        .await?;
    tracing::debug!(
        xp_earned = outcome.xp_earned,
        streak = outcome.streak_count,
        "quiz completed"
    );
    Ok(ok(outcome))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityResponse {
    streak_count: u32,
    daily_goal_progress: u32,
    new_achievements: Vec<Achievement>,
}

async fn record_activity(State(state): State<AppState>) -> Response {
    let response = state
        .mutate(|progress| {
            let new_achievements = progress.record_activity(Utc::now());
            ActivityResponse {
                streak_count: progress.streak_count,
                daily_goal_progress: progress.daily_goal_progress,
                new_achievements,
            }
        })
        .await;
    ok(response)
}

#[derive(Debug, Deserialize)]
struct CompletionRequest {
    percent: u32,
}

async fn set_completion(
    State(state): State<AppState>,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let CompletionRequest { percent } = json_body(payload)?;
    let current = state.mutate(|progress| progress.set_completion(percent)).await;
    Ok(ok(serde_json::json!({ "currentProgress": current })))
}

#[derive(Debug, Deserialize)]
struct SessionTimeRequest {
    seconds: u64,
}

async fn add_session_time(
    State(state): State<AppState>,
    payload: Result<Json<SessionTimeRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let SessionTimeRequest { seconds } = json_body(payload)?;
    let total = state.mutate(|progress| progress.add_session_time(seconds)).await;
    Ok(ok(serde_json::json!({ "totalSessionTime": total })))
}

async fn complete_stage(
    State(state): State<AppState>,
    stage_id: Result<Path<u32>, PathRejection>,
) -> Result<Response, AppError> {
    let stage_id = path_param(stage_id)?;
    let newly_completed = state.mutate(|progress| progress.complete_stage(stage_id)).await;
    Ok(ok(serde_json::json!({
        "stageId": stage_id,
        "newlyCompleted": newly_completed,
    })))
}
