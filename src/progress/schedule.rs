use chrono::{DateTime, Duration, TimeZone};

/// `(min mastery, min consecutive correct, interval days)`, strictest first.
/// Both thresholds of a tier must be met.
const REVIEW_TIERS: [(u8, u32, i64); 4] = [(80, 5, 30), (60, 4, 14), (40, 3, 7), (20, 2, 3)];
const FALLBACK_INTERVAL_DAYS: i64 = 1;

pub fn review_interval_days(mastery_level: u8, consecutive_correct: u32) -> i64 {
    REVIEW_TIERS
        .iter()
        .find(|(mastery, streak, _)| mastery_level >= *mastery && consecutive_correct >= *streak)
        .map(|(_, _, days)| *days)
        .unwrap_or(FALLBACK_INTERVAL_DAYS)
}

/// The result keeps the time zone of `current_date`; no normalization.
pub fn calculate_next_review_date<Tz: TimeZone>(
    current_date: DateTime<Tz>,
    mastery_level: u8,
    consecutive_correct: u32,
) -> DateTime<Tz> {
    current_date + Duration::days(review_interval_days(mastery_level, consecutive_correct))
}
