use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{json_body, path_param};
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/due", get(due_words))
        .route("/:id", get(get_word))
        .route("/:id/answer", post(record_answer))
        .route("/:id/bookmark", post(toggle_bookmark))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DueWordsResponse {
    word_ids: Vec<u32>,
    count: usize,
}

async fn due_words(State(state): State<AppState>) -> Response {
    let word_ids = state.read(|progress| progress.due_words(Utc::now())).await;
    ok(DueWordsResponse {
        count: word_ids.len(),
        word_ids,
    })
}

async fn get_word(
    State(state): State<AppState>,
    word_id: Result<Path<u32>, PathRejection>,
) -> Result<Response, AppError> {
    let word_id = path_param(word_id)?;
    let word = state.read(|progress| progress.word(word_id)).await?;
    Ok(ok(word.view()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest {
    is_correct: bool,
}

async fn record_answer(
    State(state): State<AppState>,
    word_id: Result<Path<u32>, PathRejection>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let word_id = path_param(word_id)?;
    let AnswerRequest { is_correct } = json_body(payload)?;
    let outcome = state
        .update(|progress| progress.record_word_answer(word_id, is_correct, Utc::now()))
        .await?;
    if outcome.previous_status != outcome.status {
        tracing::debug!(
            word_id,
            from = outcome.previous_status.as_str(),
            to = outcome.status.as_str(),
            "word status changed"
        );
    }
    Ok(ok(outcome))
}

async fn toggle_bookmark(
    State(state): State<AppState>,
    word_id: Result<Path<u32>, PathRejection>,
) -> Result<Response, AppError> {
    let word_id = path_param(word_id)?;
    let bookmarked = state
        .update(|progress| progress.toggle_bookmark(word_id))
        .await?;
    Ok(ok(serde_json::json!({
        "wordId": word_id,
        "bookmarked": bookmarked,
    })))
}
