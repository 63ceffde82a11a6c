const XP_PER_CORRECT: u32 = 10;

/// `(min accuracy %, bonus)`, checked top-down.
const ACCURACY_BONUS: [(u64, u32); 4] = [(100, 50), (90, 30), (80, 20), (70, 10)];

/// Quiz reward: 10 XP per correct answer plus an accuracy bonus.
/// A quiz with no questions earns the base only.
pub fn calculate_xp(correct_answers: u32, total_questions: u32) -> u32 {
    let base = correct_answers.saturating_mul(XP_PER_CORRECT);
    if total_questions == 0 {
        return base;
    }

    // accuracy >= threshold, in integers
    let scaled_correct = correct_answers as u64 * 100;
    let bonus = ACCURACY_BONUS
        .iter()
        .find(|(threshold, _)| scaled_correct >= threshold * total_questions as u64)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0);

    base.saturating_add(bonus)
}
