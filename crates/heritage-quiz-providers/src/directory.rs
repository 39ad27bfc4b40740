//! Question banks stored as TOML files in a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;

use heritage_quiz_core::model::QuizConfig;
use heritage_quiz_core::parser::{find_bank_files, load_quiz_directory, parse_quiz};
use heritage_quiz_core::traits::{QuestionBankProvider, TopicInfo};

use crate::error::{check_topic, ProviderError};

/// Serves the banks found under a directory.
///
/// A topic resolves to `<root>/<topic>.toml` when that file exists, otherwise
/// to the first bank whose `topic` (or `id`) matches.
pub struct DirectoryBankProvider {
    name: String,
    root: PathBuf,
}

impl DirectoryBankProvider {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, topic: &str) -> anyhow::Result<QuizConfig> {
        check_topic(topic)?;
        let direct = self.root.join(format!("{topic}.toml"));
        if direct.is_file() {
            return parse_quiz(&direct);
        }

        for path in find_bank_files(&self.root)? {
            match parse_quiz(&path) {
                Ok(quiz) if topic_key(&quiz) == topic => return Ok(quiz),
                Ok(_) => {}
                Err(e) => tracing::debug!("skipping {}: {:#}", path.display(), e),
            }
        }
        Err(ProviderError::TopicNotFound(topic.to_string()).into())
    }
}

fn topic_key(quiz: &QuizConfig) -> &str {
    quiz.topic().unwrap_or(quiz.id())
}

#[async_trait]
impl QuestionBankProvider for DirectoryBankProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn fetch(&self, topic: &str) -> anyhow::Result<QuizConfig> {
        let quiz = self.locate(topic)?;
        tracing::debug!(
            quiz = %quiz.id(),
            questions = quiz.question_count(),
            "loaded bank from directory"
        );
        Ok(quiz)
    }

    async fn topics(&self) -> anyhow::Result<Vec<TopicInfo>> {
        let quizzes = load_quiz_directory(&self.root)?;
        Ok(quizzes
            .iter()
            .map(|quiz| TopicInfo {
                topic: topic_key(quiz).to_string(),
                name: quiz.name().to_string(),
                question_count: quiz.question_count(),
                source: self.name.clone(),
            })
            .collect())
    }
}
