//! Quiz engine error types.
//!
//! Configuration problems are caught when a `QuizConfig` is built, before any
//! session can start. Session errors describe actions that arrived in the
//! wrong phase or for the wrong question; they never mutate state.

use thiserror::Error;

use crate::session::Phase;

/// A question bank failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The quiz has no questions at all.
    #[error("quiz has no questions")]
    NoQuestions,

    /// A question offers fewer than two options.
    #[error("question '{question_id}' has {count} option(s), at least 2 required")]
    TooFewOptions { question_id: String, count: usize },

    /// The correct-option index points outside the option list.
    #[error("question '{question_id}' marks option {index} as correct but only has {count} options")]
    CorrectIndexOutOfRange {
        question_id: String,
        index: usize,
        count: usize,
    },

    /// Two questions share an identifier.
    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(String),

    /// A question has a blank identifier or prompt.
    #[error("question '{0}' has an empty id or prompt")]
    EmptyPrompt(String),

    /// An option string is blank.
    #[error("question '{question_id}' has an empty option at position {position}")]
    EmptyOption { question_id: String, position: usize },
}

/// An action was not valid for the current session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The action is not allowed in this phase.
    #[error("cannot {action} while session is {phase}")]
    InvalidPhase { action: &'static str, phase: Phase },

    /// A submission targeted a question other than the current one.
    #[error("submission for question {got} rejected, current question is {expected}")]
    QuestionMismatch { expected: usize, got: usize },

    /// The chosen option does not exist.
    #[error("option {option} is out of range for question '{question_id}' ({count} options)")]
    OptionOutOfRange {
        question_id: String,
        option: usize,
        count: usize,
    },
}

/// Errors surfaced to the hosting caller.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("invalid quiz configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The question bank provider could not supply questions.
    #[error("no questions available for '{topic}': {reason}")]
    ProviderFailure { topic: String, reason: String },

    /// The engine task is no longer running.
    #[error("quiz engine has shut down")]
    EngineClosed,
}

impl QuizError {
    /// Returns `true` if the session state was left untouched by the failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, QuizError::Session(_) | QuizError::Config(_))
    }
}
