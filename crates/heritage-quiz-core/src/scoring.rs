//! Quiz scoring.
//!
//! Scoring is a pure function of the recorded answers and the question bank.
//! The percentage is based on the number of correct answers; points are
//! reported alongside for hosts that show a points total.

use serde::{Deserialize, Serialize};

use crate::model::{Answer, Question};

/// Outcome of a finished quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Number of questions in the bank.
    pub total: usize,
    pub correct: usize,
    /// Wrong answers, including unanswered ones.
    pub incorrect: usize,
    /// Questions that timed out without a submission.
    pub unanswered: usize,
    /// `round(100 * correct / total)`, 0 for an empty bank.
    pub percentage: u8,
    /// Threshold the percentage was checked against.
    pub passing_score: u8,
    pub passed: bool,
    pub points_earned: u32,
    pub points_possible: u32,
}

/// Rounded percentage of `correct` out of `total`. Halves round up.
pub fn percentage(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total);
    ((200 * correct + total) / (2 * total)) as u8
}

/// Score a set of answers against the question bank.
///
/// The threshold is inclusive: a percentage equal to `passing_score` passes.
/// An empty bank scores 0% and never passes.
pub fn score(answers: &[Answer], questions: &[Question], passing_score: u8) -> Score {
    let total = questions.len();
    let correct = answers.iter().filter(|a| a.is_correct).count();
    let unanswered = answers.iter().filter(|a| a.is_unanswered()).count();
    let incorrect = answers.len() - correct;
    let percentage = percentage(correct, total);

    Score {
        total,
        correct,
        incorrect,
        unanswered,
        percentage,
        passing_score,
        passed: total > 0 && percentage >= passing_score,
        points_earned: answers.iter().map(|a| a.points_awarded).sum(),
        points_possible: questions.iter().map(Question::points).sum(),
    }
}
