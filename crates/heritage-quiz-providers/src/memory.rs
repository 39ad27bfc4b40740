//! In-memory provider, for embedding fixed quizzes and for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use heritage_quiz_core::model::QuizConfig;
use heritage_quiz_core::traits::{QuestionBankProvider, TopicInfo};

use crate::error::ProviderError;

/// Serves a fixed set of quizzes keyed by topic (or id when no topic is set).
#[derive(Default)]
pub struct StaticBankProvider {
    quizzes: BTreeMap<String, QuizConfig>,
    fetch_count: AtomicU32,
}

impl StaticBankProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quiz(mut self, quiz: QuizConfig) -> Self {
        let key = quiz.topic().unwrap_or(quiz.id()).to_string();
        self.quizzes.insert(key, quiz);
        self
    }

    /// Number of `fetch` calls made so far.
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl QuestionBankProvider for StaticBankProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, topic: &str) -> anyhow::Result<QuizConfig> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        self.quizzes
            .get(topic)
            .cloned()
            .ok_or_else(|| ProviderError::TopicNotFound(topic.to_string()).into())
    }

    async fn topics(&self) -> anyhow::Result<Vec<TopicInfo>> {
        Ok(self
            .quizzes
            .iter()
            .map(|(topic, quiz)| TopicInfo {
                topic: topic.clone(),
                name: quiz.name().to_string(),
                question_count: quiz.question_count(),
                source: "static".into(),
            })
            .collect())
    }
}
