//! The quiz session state machine.
//!
//! ```text
//! Intro --start--> Playing --submit/expire (last question)--> Completed
//!                     |  ^
//!                     |  +-- submit/expire (more questions)
//!                     +--abandon--> Exited
//! any phase --restart--> Intro (fresh session)
//! ```
//!
//! Each transition is a method returning a [`Transition`]. Rejected actions
//! return a [`SessionError`] and leave the session untouched. The countdown is
//! armed exactly while the phase is `Playing`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::SessionError;
use crate::model::{Answer, Question, QuizConfig};
use crate::report::QuizResult;
use crate::timer::{Countdown, TimerToken};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Intro,
    Playing,
    Completed,
    Exited,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Exited)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Intro => write!(f, "intro"),
            Phase::Playing => write!(f, "playing"),
            Phase::Completed => write!(f, "completed"),
            Phase::Exited => write!(f, "exited"),
        }
    }
}

/// Mutable runtime state of one attempt.
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: Uuid,
    phase: Phase,
    index: usize,
    answers: Vec<Answer>,
    remaining: Option<Duration>,
    started_at: Option<Instant>,
    question_started_at: Option<Instant>,
}

impl QuizSession {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: Phase::Intro,
            index: 0,
            answers: Vec::new(),
            remaining: None,
            started_at: None,
            question_started_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the question being played, or the question count once done.
    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Time left on the current question as of the last tick.
    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }
}

/// What a successful action did.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// `Intro -> Playing`; the first question is live.
    Started { question: usize, allotted: Duration },
    /// An answer was recorded and the next question is live.
    Advanced {
        answer: Answer,
        next: usize,
        allotted: Duration,
    },
    /// The last answer was recorded and the session is scored.
    Completed { answer: Answer, result: QuizResult },
    /// `Playing -> Exited`; partial answers were dropped.
    Exited { discarded: usize },
    /// A fresh session replaced the old one.
    Reset { session_id: Uuid },
}

/// Owns one [`QuizSession`] and drives it through its phases.
pub struct SessionController<C: Countdown> {
    base: QuizConfig,
    config: QuizConfig,
    session: QuizSession,
    timer: C,
    token: Option<TimerToken>,
    result: Option<QuizResult>,
}

impl<C: Countdown> SessionController<C> {
    pub fn new(config: QuizConfig, timer: C) -> Self {
        let active = arrange(&config);
        Self {
            base: config,
            config: active,
            session: QuizSession::new(),
            timer,
            token: None,
            result: None,
        }
    }

    /// The quiz in the order it is being played.
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    /// Result of the session, once it has completed.
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    pub fn timer(&self) -> &C {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut C {
        &mut self.timer
    }

    /// The live question while playing.
    pub fn current_question(&self) -> Option<&Question> {
        match self.session.phase {
            Phase::Playing => self.config.question(self.session.index),
            _ => None,
        }
    }

    /// `Intro -> Playing`.
    pub fn start(&mut self) -> Result<Transition, SessionError> {
        if self.session.phase != Phase::Intro {
            return Err(SessionError::InvalidPhase {
                action: "start",
                phase: self.session.phase,
            });
        }

        self.session.phase = Phase::Playing;
        self.session.index = 0;
        self.session.started_at = Some(Instant::now());
        let allotted = self.arm();

        tracing::info!(
            session = %self.session.id,
            quiz = %self.config.id(),
            questions = self.config.question_count(),
            "quiz session started"
        );
        Ok(Transition::Started {
            question: 0,
            allotted,
        })
    }

    /// Record the player's choice for `question_index`.
    ///
    /// Only the live question accepts a submission, so a second submission
    /// for an already-answered question is rejected without side effects.
    pub fn submit(
        &mut self,
        question_index: usize,
        option: usize,
    ) -> Result<Transition, SessionError> {
        self.ensure_playing("submit")?;
        if question_index != self.session.index {
            return Err(SessionError::QuestionMismatch {
                expected: self.session.index,
                got: question_index,
            });
        }
        let Some(question) = self.config.question(self.session.index) else {
            return Err(SessionError::InvalidPhase {
                action: "submit",
                phase: self.session.phase,
            });
        };

        let allotted = self.config.allotted_for(self.session.index);
        let spent = self
            .session
            .question_started_at
            .map(|t| t.elapsed())
            .unwrap_or_default()
            .min(allotted);
        let answer = Answer::chosen(question, option, spent)?;

        tracing::debug!(
            session = %self.session.id,
            question = %answer.question_id,
            correct = answer.is_correct,
            "answer submitted"
        );
        Ok(self.record(answer))
    }

    /// Handle a countdown expiry. Returns `None` for a token that is not the
    /// live countdown of this session; such events change nothing.
    pub fn expire(&mut self, token: TimerToken) -> Option<Transition> {
        if self.session.phase != Phase::Playing
            || self.token != Some(token)
            || !self.timer.acknowledge_expiry(token)
        {
            tracing::debug!(
                generation = token.generation,
                "discarding stale countdown expiry"
            );
            return None;
        }

        let question = self.config.question(self.session.index)?;
        let answer = Answer::unanswered(question, self.config.allotted_for(self.session.index));
        tracing::debug!(
            session = %self.session.id,
            question = %answer.question_id,
            "question timed out"
        );
        Some(self.record(answer))
    }

    /// Handle a countdown tick. Returns `true` if it belonged to the live
    /// countdown.
    pub fn tick(&mut self, token: TimerToken, remaining: Duration) -> bool {
        if self.session.phase == Phase::Playing
            && self.token == Some(token)
            && self.timer.is_current(token)
        {
            self.session.remaining = Some(remaining);
            true
        } else {
            false
        }
    }

    /// `Playing -> Exited`. No result is produced.
    pub fn abandon(&mut self) -> Result<Transition, SessionError> {
        self.ensure_playing("abandon")?;
        self.disarm();

        let discarded = self.session.answers.len();
        self.session.answers.clear();
        self.session.phase = Phase::Exited;
        self.session.remaining = None;
        self.session.question_started_at = None;

        tracing::info!(session = %self.session.id, discarded, "quiz session abandoned");
        Ok(Transition::Exited { discarded })
    }

    /// Throw the current session away and begin a fresh one in `Intro`.
    /// A replacement quiz, e.g. a refetched bank, may be supplied.
    pub fn restart(&mut self, replacement: Option<QuizConfig>) -> Transition {
        self.disarm();
        if let Some(config) = replacement {
            self.base = config;
        }
        self.config = arrange(&self.base);

        let previous = self.session.id;
        self.session = QuizSession::new();
        self.result = None;

        tracing::info!(
            previous = %previous,
            session = %self.session.id,
            "quiz session restarted"
        );
        Transition::Reset {
            session_id: self.session.id,
        }
    }

    fn ensure_playing(&self, action: &'static str) -> Result<(), SessionError> {
        if self.session.phase == Phase::Playing {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase {
                action,
                phase: self.session.phase,
            })
        }
    }

    /// Arm the countdown for the current question.
    fn arm(&mut self) -> Duration {
        let allotted = self.config.allotted_for(self.session.index);
        self.token = Some(self.timer.start(allotted, self.session.id));
        self.session.remaining = Some(allotted);
        self.session.question_started_at = Some(Instant::now());
        allotted
    }

    fn disarm(&mut self) {
        self.timer.stop();
        self.token = None;
    }

    /// Append `answer` for the current question and move on.
    fn record(&mut self, answer: Answer) -> Transition {
        self.disarm();
        self.session.answers.push(answer.clone());
        self.session.index += 1;

        if self.session.index >= self.config.question_count() {
            return self.complete(answer);
        }

        let allotted = self.arm();
        Transition::Advanced {
            answer,
            next: self.session.index,
            allotted,
        }
    }

    fn complete(&mut self, answer: Answer) -> Transition {
        self.session.phase = Phase::Completed;
        self.session.remaining = None;
        self.session.question_started_at = None;

        let elapsed = self
            .session
            .started_at
            .map(|t| t.elapsed())
            .unwrap_or_default();
        let result = QuizResult::new(
            self.session.id,
            &self.config,
            self.session.answers.clone(),
            elapsed,
        );

        tracing::info!(
            session = %self.session.id,
            percentage = result.score.percentage,
            passed = result.score.passed,
            "quiz session completed"
        );
        self.result = Some(result.clone());
        Transition::Completed { answer, result }
    }
}

/// Question order for a fresh session.
fn arrange(config: &QuizConfig) -> QuizConfig {
    if config.shuffle_questions() {
        config.shuffled(&mut rand::thread_rng())
    } else {
        config.clone()
    }
}
