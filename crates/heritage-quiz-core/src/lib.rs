//! heritage-quiz-core — Timed quiz sessions, scoring, and question banks.
//!
//! This crate defines the quiz data model, the session state machine and its
//! countdown, scoring, and the async engine that the heritage-quiz CLI and
//! providers build on.

pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod session;
pub mod timer;
pub mod traits;
