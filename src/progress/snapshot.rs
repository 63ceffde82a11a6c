use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::curriculum::{validate_word_id, CurriculumError};
use super::level::{calculate_level, check_for_level_up, LevelProgress};
use super::word::{AnswerOutcome, WordProgress};
use super::xp::calculate_xp;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("totalQuestions must be greater than 0")]
    EmptyQuiz,
    #[error("correctAnswers ({correct}) exceeds totalQuestions ({total})")]
    TooManyCorrect { correct: u32, total: u32 },
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AchievementKind {
    FirstQuiz,
    PerfectQuiz,
    Streak7,
    Streak30,
    Level5,
    Level10,
}

impl AchievementKind {
    fn id(&self) -> &'static str {
        match self {
            Self::FirstQuiz => "first_quiz",
            Self::PerfectQuiz => "perfect_quiz",
            Self::Streak7 => "streak_7",
            Self::Streak30 => "streak_30",
            Self::Level5 => "level_5",
            Self::Level10 => "level_10",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::FirstQuiz => "First Quiz",
            Self::PerfectQuiz => "Perfect Score",
            Self::Streak7 => "One Week Streak",
            Self::Streak30 => "One Month Streak",
            Self::Level5 => "Level 5",
            Self::Level10 => "Level 10",
        }
    }
}

/// The persisted user snapshot. `level_progress` is derived from `user_xp`
/// and is refreshed on every XP change and on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    #[serde(rename = "userXP")]
    pub user_xp: u32,
    pub streak_count: u32,
    pub current_progress: u8,
    pub total_quizzes_completed: u32,
    pub completed_stages: BTreeSet<u32>,
    #[serde(default)]
    pub unlocked_subjects: Vec<String>,
    #[serde(default)]
    pub daily_goal_progress: u32,
    pub last_active_date: DateTime<Utc>,
    #[serde(default)]
    pub total_session_time: u64,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub level_progress: LevelProgress,
    #[serde(default, with = "word_list")]
    pub word_progress: BTreeMap<u32, WordProgress>,
}

/// Word records are stored as a list; each record carries its own id.
mod word_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::progress::word::WordProgress;

    pub fn serialize<S>(words: &BTreeMap<u32, WordProgress>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(words.values())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<u32, WordProgress>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let words = Vec::<WordProgress>::deserialize(deserializer)?;
        Ok(words.into_iter().map(|w| (w.word_id, w)).collect())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpGain {
    pub old_xp: u32,
    pub new_xp: u32,
    pub leveled_up: bool,
    pub level_progress: LevelProgress,
    pub new_achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub xp_earned: u32,
    pub streak_count: u32,
    pub total_quizzes_completed: u32,
    pub daily_goal_progress: u32,
    pub gain: XpGain,
}

impl UserProgress {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            user_xp: 0,
            streak_count: 0,
            current_progress: 0,
            total_quizzes_completed: 0,
            completed_stages: BTreeSet::new(),
            unlocked_subjects: Vec::new(),
            daily_goal_progress: 0,
            last_active_date: now,
            total_session_time: 0,
            achievements: Vec::new(),
            level_progress: calculate_level(0),
            word_progress: BTreeMap::new(),
        }
    }

    pub fn refresh_level_progress(&mut self) {
        self.level_progress = calculate_level(self.user_xp);
    }

    /// Restores derived and bounded fields on data read from storage.
    pub fn normalize(&mut self) {
        self.current_progress = self.current_progress.min(100);
        self.refresh_level_progress();
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a.id == id)
    }

    pub fn add_xp(&mut self, amount: u32, now: DateTime<Utc>) -> XpGain {
        let old_xp = self.user_xp;
        self.user_xp = old_xp.saturating_add(amount);
        self.refresh_level_progress();

        let mut new_achievements = Vec::new();
        let level = self.level_progress.current_level;
        if level >= 5 {
            self.unlock(AchievementKind::Level5, now, &mut new_achievements);
        }
        if level >= 10 {
            self.unlock(AchievementKind::Level10, now, &mut new_achievements);
        }

        XpGain {
            old_xp,
            new_xp: self.user_xp,
            leveled_up: check_for_level_up(old_xp, self.user_xp),
            level_progress: self.level_progress,
            new_achievements,
        }
    }

    pub fn complete_quiz(
        &mut self,
        correct_answers: u32,
        total_questions: u32,
        now: DateTime<Utc>,
    ) -> Result<QuizOutcome, ProgressError> {
        if total_questions == 0 {
            return Err(ProgressError::EmptyQuiz);
        }
        if correct_answers > total_questions {
            return Err(ProgressError::TooManyCorrect {
                correct: correct_answers,
                total: total_questions,
            });
        }

        let xp_earned = calculate_xp(correct_answers, total_questions);
        let mut unlocked = self.record_activity(now);
        self.total_quizzes_completed = self.total_quizzes_completed.saturating_add(1);
        self.daily_goal_progress = self.daily_goal_progress.saturating_add(1);

        self.unlock(AchievementKind::FirstQuiz, now, &mut unlocked);
        if correct_answers == total_questions {
            self.unlock(AchievementKind::PerfectQuiz, now, &mut unlocked);
        }

        let mut gain = self.add_xp(xp_earned, now);
        unlocked.append(&mut gain.new_achievements);
        gain.new_achievements = unlocked;

        Ok(QuizOutcome {
            xp_earned,
            streak_count: self.streak_count,
            total_quizzes_completed: self.total_quizzes_completed,
            daily_goal_progress: self.daily_goal_progress,
            gain,
        })
    }

    /// Streak bookkeeping by UTC calendar day: same day keeps the streak,
    /// the next day extends it, any longer gap restarts it at 1. A new day
    /// also clears the daily goal counter.
    pub fn record_activity(&mut self, now: DateTime<Utc>) -> Vec<Achievement> {
        let today = now.date_naive();
        let last = self.last_active_date.date_naive();
        let gap = (today - last).num_days();

        if self.streak_count == 0 {
            self.streak_count = 1;
        } else {
            match gap {
                i64::MIN..=0 => {}
                1 => self.streak_count = self.streak_count.saturating_add(1),
                _ => self.streak_count = 1,
            }
        }
        if gap > 0 {
            self.daily_goal_progress = 0;
        }
        if now > self.last_active_date {
            self.last_active_date = now;
        }

        let mut unlocked = Vec::new();
        if self.streak_count >= 7 {
            self.unlock(AchievementKind::Streak7, now, &mut unlocked);
        }
        if self.streak_count >= 30 {
            self.unlock(AchievementKind::Streak30, now, &mut unlocked);
        }
        unlocked
    }

    pub fn complete_stage(&mut self, stage_id: u32) -> bool {
        self.completed_stages.insert(stage_id)
    }

    pub fn set_completion(&mut self, percent: u32) -> u8 {
        self.current_progress = percent.min(100) as u8;
        self.current_progress
    }

    pub fn add_session_time(&mut self, seconds: u64) -> u64 {
        self.total_session_time = self.total_session_time.saturating_add(seconds);
        self.total_session_time
    }

    pub fn word(&self, word_id: u32) -> Result<WordProgress, ProgressError> {
        let word_id = validate_word_id(word_id)?;
        Ok(self
            .word_progress
            .get(&word_id)
            .cloned()
            .unwrap_or_else(|| WordProgress::new(word_id)))
    }

    pub fn record_word_answer(
        &mut self,
        word_id: u32,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, ProgressError> {
        let word_id = validate_word_id(word_id)?;
        let word = self
            .word_progress
            .entry(word_id)
            .or_insert_with(|| WordProgress::new(word_id));
        Ok(word.record_answer(is_correct, now))
    }

    pub fn toggle_bookmark(&mut self, word_id: u32) -> Result<bool, ProgressError> {
        let word_id = validate_word_id(word_id)?;
        let word = self
            .word_progress
            .entry(word_id)
            .or_insert_with(|| WordProgress::new(word_id));
        Ok(word.toggle_bookmark())
    }

    /// Studied words whose review date has arrived, ascending by id.
    pub fn due_words(&self, now: DateTime<Utc>) -> Vec<u32> {
        self.word_progress
            .values()
            .filter(|w| w.study_count() > 0 && w.is_due(now))
            .map(|w| w.word_id)
            .collect()
    }

    fn unlock(&mut self, kind: AchievementKind, now: DateTime<Utc>, out: &mut Vec<Achievement>) {
        if self.has_achievement(kind.id()) {
            return;
        }
        let achievement = Achievement {
            id: kind.id().to_string(),
            title: kind.title().to_string(),
            unlocked_at: now,
        };
        self.achievements.push(achievement.clone());
        out.push(achievement);
    }
}
