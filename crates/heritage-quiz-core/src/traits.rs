//! Question bank provider trait.
//!
//! Implemented by the `heritage-quiz-providers` crate. The engine only
//! consumes what a provider returns; fetching and caching are the provider's
//! concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::QuizConfig;

/// Source of question banks, keyed by topic (an island, a province, ...).
#[async_trait]
pub trait QuestionBankProvider: Send + Sync {
    /// Human-readable provider name (e.g. "directory").
    fn name(&self) -> &str;

    /// Fetch and validate the quiz for `topic`.
    async fn fetch(&self, topic: &str) -> anyhow::Result<QuizConfig>;

    /// List the topics this provider can serve.
    async fn topics(&self) -> anyhow::Result<Vec<TopicInfo>>;
}

/// A topic a provider can serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    /// Key passed to [`QuestionBankProvider::fetch`].
    pub topic: String,
    /// Display name of the quiz.
    pub name: String,
    /// Number of questions in the bank.
    pub question_count: usize,
    /// Provider that serves it.
    pub source: String,
}
