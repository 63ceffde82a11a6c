use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mastery::{calculate_mastery_level, get_word_status, WordStatus};
use super::schedule::calculate_next_review_date;

/// Per-word answer history. Mastery and status are derived from the counts
/// on every read and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordProgress {
    pub word_id: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    #[serde(default)]
    pub consecutive_correct: u32,
    #[serde(default)]
    pub next_review: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_reviewed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bookmarked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordProgressView {
    pub word_id: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub consecutive_correct: u32,
    pub mastery_level: u8,
    pub status: WordStatus,
    pub next_review: Option<DateTime<Utc>>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub bookmarked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub word_id: u32,
    pub is_correct: bool,
    pub previous_status: WordStatus,
    pub status: WordStatus,
    pub mastery_level: u8,
    pub consecutive_correct: u32,
    pub next_review: DateTime<Utc>,
}

impl WordProgress {
    pub fn new(word_id: u32) -> Self {
        Self {
            word_id,
            correct_count: 0,
            wrong_count: 0,
            consecutive_correct: 0,
            next_review: None,
            last_reviewed: None,
            bookmarked: false,
        }
    }

    pub fn study_count(&self) -> u32 {
        self.correct_count.saturating_add(self.wrong_count)
    }

    pub fn mastery_level(&self) -> u8 {
        calculate_mastery_level(self.correct_count, self.wrong_count)
    }

    pub fn status(&self) -> WordStatus {
        get_word_status(self.mastery_level(), self.study_count())
    }

    /// A wrong answer resets the consecutive-correct run to zero.
    pub fn record_answer(&mut self, is_correct: bool, now: DateTime<Utc>) -> AnswerOutcome {
        let previous_status = self.status();

        if is_correct {
            self.correct_count = self.correct_count.saturating_add(1);
            self.consecutive_correct = self.consecutive_correct.saturating_add(1);
        } else {
            self.wrong_count = self.wrong_count.saturating_add(1);
            self.consecutive_correct = 0;
        }

        let mastery_level = self.mastery_level();
        let next_review = calculate_next_review_date(now, mastery_level, self.consecutive_correct);
        self.next_review = Some(next_review);
        self.last_reviewed = Some(now);

        AnswerOutcome {
            word_id: self.word_id,
            is_correct,
            previous_status,
            status: self.status(),
            mastery_level,
            consecutive_correct: self.consecutive_correct,
            next_review,
        }
    }

    pub fn toggle_bookmark(&mut self) -> bool {
        self.bookmarked = !self.bookmarked;
        self.bookmarked
    }

    /// Words never answered have no schedule and count as due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review.map_or(true, |at| at <= now)
    }

    pub fn view(&self) -> WordProgressView {
        WordProgressView {
            word_id: self.word_id,
            correct_count: self.correct_count,
            wrong_count: self.wrong_count,
            consecutive_correct: self.consecutive_correct,
            mastery_level: self.mastery_level(),
            status: self.status(),
            next_review: self.next_review,
            last_reviewed: self.last_reviewed,
            bookmarked: self.bookmarked,
        }
    }
}
