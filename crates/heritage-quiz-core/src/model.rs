//! Core data model types for heritage-quiz.
//!
//! `Question` and `QuizConfig` are validated when they are built, so the
//! session controller never has to re-check option bounds or empty banks.
//! `Answer` is the append-only record of one question's outcome.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SessionError};

/// Points a question is worth when the bank does not say otherwise.
pub const DEFAULT_POINTS: u32 = 10;
/// Passing threshold used when the configured one is out of range.
pub const DEFAULT_PASSING_SCORE: u8 = 70;
/// Per-question allotment used when the configured limit is out of range.
pub const DEFAULT_SECONDS_PER_QUESTION: u64 = 30;
/// Longest allotment accepted for a question or a whole session.
pub const MAX_TIME_LIMIT_SECS: u64 = 24 * 60 * 60;
/// Display label of the "no answer" sentinel.
pub const NO_ANSWER_LABEL: &str = "(no answer)";

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: String,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: Option<String>,
    points: u32,
    time_limit: Option<Duration>,
}

impl Question {
    /// Build a question, checking that it has at least two non-blank options
    /// and that `correct_index` points at one of them.
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, ConfigError> {
        let id = id.into();
        let prompt = prompt.into();

        if id.trim().is_empty() || prompt.trim().is_empty() {
            return Err(ConfigError::EmptyPrompt(id));
        }
        if options.len() < 2 {
            return Err(ConfigError::TooFewOptions {
                question_id: id,
                count: options.len(),
            });
        }
        if let Some(position) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(ConfigError::EmptyOption {
                question_id: id,
                position,
            });
        }
        if correct_index >= options.len() {
            return Err(ConfigError::CorrectIndexOutOfRange {
                question_id: id,
                index: correct_index,
                count: options.len(),
            });
        }

        Ok(Self {
            id,
            prompt,
            options,
            correct_index,
            explanation: None,
            points: DEFAULT_POINTS,
            time_limit: None,
        })
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        let explanation = explanation.into();
        self.explanation = (!explanation.trim().is_empty()).then_some(explanation);
        self
    }

    pub fn with_points(mut self, points: u32) -> Self {
        self.points = points;
        self
    }

    /// Give this question its own allotment. A zero duration or one longer
    /// than [`MAX_TIME_LIMIT_SECS`] is ignored and the quiz-wide allotment
    /// applies.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        if !within_time_cap(limit) {
            tracing::warn!(
                question = %self.id,
                ?limit,
                "ignoring out-of-range time limit, quiz default applies"
            );
            self.time_limit = None;
        } else {
            self.time_limit = Some(limit);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

/// How the quiz's clock is declared.
///
/// Every question runs its own countdown. A session-wide limit is split
/// evenly across the questions that do not carry their own allotment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLimit {
    PerQuestion(Duration),
    PerSession(Duration),
}

impl Default for TimeLimit {
    fn default() -> Self {
        TimeLimit::PerQuestion(Duration::from_secs(DEFAULT_SECONDS_PER_QUESTION))
    }
}

/// Whether `limit` is a usable allotment: positive and no longer than
/// [`MAX_TIME_LIMIT_SECS`].
pub fn within_time_cap(limit: Duration) -> bool {
    !limit.is_zero() && limit <= Duration::from_secs(MAX_TIME_LIMIT_SECS)
}

impl TimeLimit {
    /// Per-question limit from a raw seconds value, falling back to the
    /// default when it is not within `1..=MAX_TIME_LIMIT_SECS`.
    pub fn per_question_secs(raw: i64) -> Self {
        match u64::try_from(raw) {
            Ok(secs) if (1..=MAX_TIME_LIMIT_SECS).contains(&secs) => {
                TimeLimit::PerQuestion(Duration::from_secs(secs))
            }
            _ => {
                tracing::warn!(
                    raw,
                    fallback = DEFAULT_SECONDS_PER_QUESTION,
                    "time limit out of range, using default"
                );
                TimeLimit::default()
            }
        }
    }

    /// Session-wide limit from a raw minutes value, falling back to the
    /// per-question default when it is not positive or exceeds
    /// [`MAX_TIME_LIMIT_SECS`].
    pub fn per_session_minutes(raw: i64) -> Self {
        let secs = u64::try_from(raw).ok().and_then(|m| m.checked_mul(60));
        match secs {
            Some(secs) if (1..=MAX_TIME_LIMIT_SECS).contains(&secs) => {
                TimeLimit::PerSession(Duration::from_secs(secs))
            }
            _ => {
                tracing::warn!(
                    raw,
                    fallback = DEFAULT_SECONDS_PER_QUESTION,
                    "session time limit out of range, using per-question default"
                );
                TimeLimit::default()
            }
        }
    }
}

/// Clamp a raw passing score into `1..=100`, falling back to the default.
pub fn passing_score_or_default(raw: i64) -> u8 {
    match u8::try_from(raw) {
        Ok(score) if (1..=100).contains(&score) => score,
        _ => {
            tracing::warn!(
                raw,
                fallback = DEFAULT_PASSING_SCORE,
                "passing score must be within 1..=100, using default"
            );
            DEFAULT_PASSING_SCORE
        }
    }
}

/// A validated quiz: the question bank plus its timing and passing rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    id: String,
    name: String,
    description: String,
    topic: Option<String>,
    questions: Vec<Question>,
    time_limit: TimeLimit,
    passing_score: u8,
    shuffle_questions: bool,
}

impl QuizConfig {
    /// Build a quiz from an ordered question list. Rejects an empty list and
    /// duplicate question ids.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, ConfigError> {
        if questions.is_empty() {
            return Err(ConfigError::NoQuestions);
        }

        let mut seen = HashSet::new();
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(ConfigError::DuplicateQuestionId(q.id().to_string()));
            }
        }

        Ok(Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            topic: None,
            questions,
            time_limit: TimeLimit::default(),
            passing_score: DEFAULT_PASSING_SCORE,
            shuffle_questions: false,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Set the passing threshold in percent. Values outside `1..=100` fall
    /// back to [`DEFAULT_PASSING_SCORE`].
    pub fn with_passing_score(mut self, raw: i64) -> Self {
        self.passing_score = passing_score_or_default(raw);
        self
    }

    /// Set the time limit. Zero durations and durations above
    /// [`MAX_TIME_LIMIT_SECS`] fall back to the default per-question allotment.
    pub fn with_time_limit(mut self, limit: TimeLimit) -> Self {
        self.time_limit = match limit {
            TimeLimit::PerQuestion(d) | TimeLimit::PerSession(d) if !within_time_cap(d) => {
                tracing::warn!(?limit, "time limit out of range, using per-question default");
                TimeLimit::default()
            }
            other => other,
        };
        self
    }

    /// Replace the time limit of the whole quiz, dropping every per-question
    /// allotment so `limit` applies to all questions.
    pub fn with_time_override(mut self, limit: TimeLimit) -> Self {
        for question in &mut self.questions {
            question.time_limit = None;
        }
        self.with_time_limit(limit)
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle_questions = shuffle;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn time_limit(&self) -> TimeLimit {
        self.time_limit
    }

    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    pub fn shuffle_questions(&self) -> bool {
        self.shuffle_questions
    }

    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(Question::points).sum()
    }

    /// Allotment for a question that does not declare its own.
    pub fn default_question_time(&self) -> Duration {
        match self.time_limit {
            TimeLimit::PerQuestion(d) => d,
            TimeLimit::PerSession(total) => {
                let unset = self
                    .questions
                    .iter()
                    .filter(|q| q.time_limit().is_none())
                    .count()
                    .max(1);
                let share = total / unset as u32;
                share.max(Duration::from_secs(1))
            }
        }
    }

    /// Countdown duration for the question at `index`.
    pub fn allotted_for(&self, index: usize) -> Duration {
        self.question(index)
            .and_then(Question::time_limit)
            .unwrap_or_else(|| self.default_question_time())
    }

    /// A copy of this quiz with its questions in a random order.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut copy = self.clone();
        copy.questions.shuffle(rng);
        copy
    }
}

/// What the player picked for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    Chosen { index: usize, text: String },
    /// The countdown expired before any submission.
    NoAnswer,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Chosen { text, .. } => write!(f, "{text}"),
            Selection::NoAnswer => write!(f, "{NO_ANSWER_LABEL}"),
        }
    }
}

/// The recorded outcome of one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub prompt: String,
    pub selection: Selection,
    pub correct_option: String,
    pub is_correct: bool,
    pub time_spent_ms: u64,
    pub points_awarded: u32,
}

impl Answer {
    /// Record a submitted option.
    pub fn chosen(
        question: &Question,
        option: usize,
        time_spent: Duration,
    ) -> Result<Self, SessionError> {
        let text = question
            .options()
            .get(option)
            .ok_or_else(|| SessionError::OptionOutOfRange {
                question_id: question.id().to_string(),
                option,
                count: question.options().len(),
            })?
            .clone();
        let is_correct = option == question.correct_index();

        Ok(Self {
            question_id: question.id().to_string(),
            prompt: question.prompt().to_string(),
            selection: Selection::Chosen {
                index: option,
                text,
            },
            correct_option: question.correct_option().to_string(),
            is_correct,
            time_spent_ms: time_spent.as_millis() as u64,
            points_awarded: if is_correct { question.points() } else { 0 },
        })
    }

    /// Record an expired question: always incorrect, full allotment spent.
    pub fn unanswered(question: &Question, allotted: Duration) -> Self {
        Self {
            question_id: question.id().to_string(),
            prompt: question.prompt().to_string(),
            selection: Selection::NoAnswer,
            correct_option: question.correct_option().to_string(),
            is_correct: false,
            time_spent_ms: allotted.as_millis() as u64,
            points_awarded: 0,
        }
    }

    pub fn is_unanswered(&self) -> bool {
        self.selection == Selection::NoAnswer
    }

    pub fn time_spent(&self) -> Duration {
        Duration::from_millis(self.time_spent_ms)
    }
}
