use serde::{Deserialize, Serialize};

const MIN_ATTEMPTS_FOR_FULL_CREDIT: f64 = 5.0;
const MASTERED_LEVEL: u8 = 80;
const MASTERED_MIN_STUDIES: u32 = 5;
const REVIEWING_LEVEL: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordStatus {
    New,
    Learning,
    Reviewing,
    Mastered,
}

impl WordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Reviewing => "reviewing",
            Self::Mastered => "mastered",
        }
    }
}

/// Accuracy scaled down until five attempts have been made, so one lucky
/// early answer cannot report high mastery.
pub fn calculate_mastery_level(correct_count: u32, wrong_count: u32) -> u8 {
    let total_attempts = correct_count as u64 + wrong_count as u64;
    if total_attempts == 0 {
        return 0;
    }

    let total = total_attempts as f64;
    let accuracy = correct_count as f64 / total * 100.0;
    let attempt_factor = (total / MIN_ATTEMPTS_FOR_FULL_CREDIT).min(1.0);

    (accuracy * attempt_factor).round().clamp(0.0, 100.0) as u8
}

/// Stateless: a word can fall back from `Reviewing` to `Learning` when its
/// mastery drops.
pub fn get_word_status(mastery_level: u8, study_count: u32) -> WordStatus {
    if study_count == 0 {
        WordStatus::New
    } else if mastery_level >= MASTERED_LEVEL && study_count >= MASTERED_MIN_STUDIES {
        WordStatus::Mastered
    } else if mastery_level >= REVIEWING_LEVEL {
        WordStatus::Reviewing
    } else {
        WordStatus::Learning
    }
}
