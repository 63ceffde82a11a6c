use axum::extract::rejection::PathRejection;
use axum::extract::Path;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use super::path_param;
use crate::progress::{get_book_and_day_from_word_id, get_word_ids_for_day, BookDay};
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/books/:book/days/:day", get(day_words))
        .route("/words/:id", get(word_location))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DayWordsResponse {
    book_number: u32,
    day_number: u32,
    word_ids: Vec<u32>,
}

async fn day_words(params: Result<Path<(u32, u32)>, PathRejection>) -> Result<Response, AppError> {
    let (book_number, day_number) = path_param(params)?;
    let word_ids = get_word_ids_for_day(book_number, day_number)?;
    Ok(ok(DayWordsResponse {
        book_number,
        day_number,
        word_ids,
    }))
}

async fn word_location(word_id: Result<Path<u32>, PathRejection>) -> Result<Response, AppError> {
    let word_id = path_param(word_id)?;
    let location: BookDay = get_book_and_day_from_word_id(word_id)?;
    Ok(ok(location))
}
