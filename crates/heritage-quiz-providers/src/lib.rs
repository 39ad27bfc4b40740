//! heritage-quiz-providers — Question bank providers.
//!
//! Implements the `QuestionBankProvider` trait for a local directory of TOML
//! banks, a remote HTTP endpoint serving JSON banks, and an in-memory set of
//! quizzes, plus the application configuration that selects between them.

pub mod config;
pub mod directory;
pub mod error;
pub mod http;
pub mod memory;

pub use config::{create_provider, load_config, QuizAppConfig, SourceConfig};
pub use error::ProviderError;
