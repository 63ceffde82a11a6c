pub mod curriculum;
pub mod level;
pub mod mastery;
pub mod schedule;
pub mod snapshot;
pub mod word;
pub mod xp;

pub use curriculum::{get_book_and_day_from_word_id, get_word_ids_for_day, BookDay, CurriculumError};
pub use level::{calculate_level, check_for_level_up, LevelProgress};
pub use mastery::{calculate_mastery_level, get_word_status, WordStatus};
pub use schedule::calculate_next_review_date;
pub use snapshot::{Achievement, ProgressError, QuizOutcome, UserProgress, XpGain};
pub use word::{AnswerOutcome, WordProgress, WordProgressView};
pub use xp::calculate_xp;
