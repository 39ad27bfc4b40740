//! Quiz results and the notification contract towards the hosting caller.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::model::{Answer, Question, QuizConfig};
use crate::scoring::{score, Score};
use crate::session::Phase;

/// The final, immutable outcome of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    /// Session that produced this result.
    pub session_id: Uuid,
    pub quiz_id: String,
    pub quiz_name: String,
    /// When the last question was answered or expired.
    pub completed_at: DateTime<Utc>,
    /// Answers in question order.
    pub answers: Vec<Answer>,
    pub score: Score,
    /// Wall-clock time from start to completion in milliseconds.
    pub duration_ms: u64,
}

impl QuizResult {
    /// Score `answers` against `config` and package the outcome.
    pub fn new(
        session_id: Uuid,
        config: &QuizConfig,
        answers: Vec<Answer>,
        elapsed: Duration,
    ) -> Self {
        let score = score(&answers, config.questions(), config.passing_score());
        Self {
            session_id,
            quiz_id: config.id().to_string(),
            quiz_name: config.name().to_string(),
            completed_at: Utc::now(),
            answers,
            score,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// Save the result as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize result")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }

    /// Load a result from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read result from {}", path.display()))?;
        let result: QuizResult =
            serde_json::from_str(&content).context("failed to parse result JSON")?;
        Ok(result)
    }

    /// One-line verdict, e.g. `Bali Heritage: 4/5 correct (80%) PASSED`.
    pub fn summary_line(&self) -> String {
        format!(
            "{}: {}/{} correct ({}%) {}",
            self.quiz_name,
            self.score.correct,
            self.score.total,
            self.score.percentage,
            if self.score.passed { "PASSED" } else { "FAILED" }
        )
    }

    /// Format the result as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## {}\n\n", self.quiz_name));
        md.push_str(&format!(
            "**Score:** {}% ({} of {} correct, {} unanswered), passing score {}%: **{}**\n\n",
            self.score.percentage,
            self.score.correct,
            self.score.total,
            self.score.unanswered,
            self.score.passing_score,
            if self.score.passed { "passed" } else { "failed" }
        ));
        md.push_str(&format!(
            "**Points:** {}/{}\n\n",
            self.score.points_earned, self.score.points_possible
        ));

        md.push_str("| # | Question | Your answer | Correct answer | Time |\n");
        md.push_str("|---|----------|-------------|----------------|------|\n");
        for (i, a) in self.answers.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {}{} | {} | {:.1}s |\n",
                i + 1,
                a.prompt,
                a.selection,
                if a.is_correct { " ✓" } else { "" },
                a.correct_option,
                a.time_spent().as_secs_f64()
            ));
        }

        md
    }
}

/// Receives session notifications from the engine.
///
/// `on_complete` is the completion contract: it fires exactly once per
/// completed session and never for an abandoned one.
pub trait SessionReporter: Send + Sync {
    fn on_phase_change(&self, session_id: Uuid, phase: Phase);
    fn on_question(&self, index: usize, question: &Question, allotted: Duration);
    fn on_tick(&self, index: usize, remaining: Duration);
    fn on_answer(&self, index: usize, answer: &Answer);
    fn on_complete(&self, result: &QuizResult);
    fn on_exit(&self, discarded: usize);
}

/// No-op reporter.
pub struct NoopReporter;

impl SessionReporter for NoopReporter {
    fn on_phase_change(&self, _: Uuid, _: Phase) {}
    fn on_question(&self, _: usize, _: &Question, _: Duration) {}
    fn on_tick(&self, _: usize, _: Duration) {}
    fn on_answer(&self, _: usize, _: &Answer) {}
    fn on_complete(&self, _: &QuizResult) {}
    fn on_exit(&self, _: usize) {}
}

/// Owned form of a reporter callback.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotification {
    PhaseChanged { session_id: Uuid, phase: Phase },
    Question {
        index: usize,
        question: Question,
        allotted: Duration,
    },
    Tick { index: usize, remaining: Duration },
    Answered { index: usize, answer: Answer },
    Completed(QuizResult),
    Exited { discarded: usize },
}

/// Reporter that forwards every callback into a channel.
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<SessionNotification>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, notification: SessionNotification) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(notification);
    }
}

impl SessionReporter for ChannelReporter {
    fn on_phase_change(&self, session_id: Uuid, phase: Phase) {
        self.send(SessionNotification::PhaseChanged { session_id, phase });
    }

    fn on_question(&self, index: usize, question: &Question, allotted: Duration) {
        self.send(SessionNotification::Question {
            index,
            question: question.clone(),
            allotted,
        });
    }

    fn on_tick(&self, index: usize, remaining: Duration) {
        self.send(SessionNotification::Tick { index, remaining });
    }

    fn on_answer(&self, index: usize, answer: &Answer) {
        self.send(SessionNotification::Answered {
            index,
            answer: answer.clone(),
        });
    }

    fn on_complete(&self, result: &QuizResult) {
        self.send(SessionNotification::Completed(result.clone()));
    }

    fn on_exit(&self, discarded: usize) {
        self.send(SessionNotification::Exited { discarded });
    }
}
