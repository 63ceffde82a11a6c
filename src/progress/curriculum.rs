//! Fixed word-book curriculum: 8 books of 480 words, studied 30 words a day.
//! Word ids run from 1 to 3840 across all books.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TOTAL_BOOKS: u32 = 8;
pub const WORDS_PER_BOOK: u32 = 480;
pub const WORDS_PER_DAY: u32 = 30;
pub const DAYS_PER_BOOK: u32 = WORDS_PER_BOOK / WORDS_PER_DAY;
pub const TOTAL_WORDS: u32 = TOTAL_BOOKS * WORDS_PER_BOOK;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurriculumError {
    #[error("book number {0} out of range 1..=8")]
    InvalidBook(u32),
    #[error("day number {0} out of range 1..=16")]
    InvalidDay(u32),
    #[error("word id {0} out of range 1..=3840")]
    InvalidWordId(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDay {
    pub book_number: u32,
    pub day_number: u32,
}

pub fn validate_word_id(word_id: u32) -> Result<u32, CurriculumError> {
    if (1..=TOTAL_WORDS).contains(&word_id) {
        Ok(word_id)
    } else {
        Err(CurriculumError::InvalidWordId(word_id))
    }
}

pub fn get_word_ids_for_day(book_number: u32, day_number: u32) -> Result<Vec<u32>, CurriculumError> {
    if !(1..=TOTAL_BOOKS).contains(&book_number) {
        return Err(CurriculumError::InvalidBook(book_number));
    }
    if !(1..=DAYS_PER_BOOK).contains(&day_number) {
        return Err(CurriculumError::InvalidDay(day_number));
    }

    let start = (book_number - 1) * WORDS_PER_BOOK + (day_number - 1) * WORDS_PER_DAY + 1;
    Ok((start..start + WORDS_PER_DAY).collect())
}

pub fn get_book_and_day_from_word_id(word_id: u32) -> Result<BookDay, CurriculumError> {
    let index = validate_word_id(word_id)? - 1;
    Ok(BookDay {
        book_number: index / WORDS_PER_BOOK + 1,
        day_number: (index % WORDS_PER_BOOK) / WORDS_PER_DAY + 1,
    })
}
