//! Question bank parser.
//!
//! Loads quiz banks from TOML files and directories (and from JSON, which
//! remote banks use), turns them into validated `QuizConfig`s and reports
//! soft issues as warnings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{
    passing_score_or_default, Question, QuizConfig, TimeLimit, MAX_TIME_LIMIT_SECS,
};

/// On-disk shape of a question bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDocument {
    pub quiz: QuizHeader,
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizHeader {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default = "default_passing_score")]
    pub passing_score: i64,
    #[serde(default)]
    pub time_per_question_secs: Option<i64>,
    #[serde(default)]
    pub time_limit_minutes: Option<i64>,
    #[serde(default)]
    pub shuffle_questions: bool,
}

fn default_passing_score() -> i64 {
    70
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct: usize,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub time_limit_secs: Option<i64>,
}

impl QuizDocument {
    /// Validate the document and build the quiz it describes.
    pub fn into_config(self) -> Result<QuizConfig, ConfigError> {
        let questions = self
            .questions
            .into_iter()
            .map(QuestionRecord::into_question)
            .collect::<Result<Vec<_>, _>>()?;

        let header = self.quiz;
        let time_limit = match (header.time_per_question_secs, header.time_limit_minutes) {
            (Some(secs), _) => TimeLimit::per_question_secs(secs),
            (None, Some(minutes)) => TimeLimit::per_session_minutes(minutes),
            (None, None) => TimeLimit::default(),
        };

        let mut config = QuizConfig::new(header.id, header.name, questions)?
            .with_description(header.description)
            .with_passing_score(header.passing_score)
            .with_time_limit(time_limit)
            .with_shuffle(header.shuffle_questions);
        if let Some(topic) = header.topic {
            config = config.with_topic(topic);
        }
        Ok(config)
    }
}

impl QuestionRecord {
    fn into_question(self) -> Result<Question, ConfigError> {
        let mut question = Question::new(self.id, self.prompt, self.options, self.correct)?;
        if let Some(explanation) = self.explanation {
            question = question.with_explanation(explanation);
        }
        if let Some(points) = self.points {
            question = question.with_points(points);
        }
        match self.time_limit_secs.map(u64::try_from) {
            Some(Ok(secs)) if secs > 0 => {
                question = question.with_time_limit(std::time::Duration::from_secs(secs));
            }
            Some(_) => {
                tracing::warn!(
                    question = %question.id(),
                    "ignoring non-positive time_limit_secs, quiz default applies"
                );
            }
            None => {}
        }
        Ok(question)
    }
}

/// Read a TOML bank file without validating it.
pub fn read_document(path: &Path) -> Result<QuizDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;
    parse_document_str(&content, path)
}

/// Parse a TOML string into a document (useful for testing).
pub fn parse_document_str(content: &str, source_path: &Path) -> Result<QuizDocument> {
    toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))
}

/// Parse and validate a TOML bank file.
pub fn parse_quiz(path: &Path) -> Result<QuizConfig> {
    let document = read_document(path)?;
    document
        .into_config()
        .with_context(|| format!("invalid question bank: {}", path.display()))
}

/// Parse and validate a TOML string.
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<QuizConfig> {
    let document = parse_document_str(content, source_path)?;
    Ok(document.into_config()?)
}

/// Parse and validate a JSON bank, as served by remote providers.
pub fn parse_quiz_json(content: &str) -> Result<QuizConfig> {
    let document: QuizDocument =
        serde_json::from_str(content).context("failed to parse question bank JSON")?;
    Ok(document.into_config()?)
}

/// Recursively collect all `.toml` files under `dir`, sorted by path.
pub fn find_bank_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(find_bank_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every valid bank under `dir`. Invalid files are skipped with a warning.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<QuizConfig>> {
    let mut quizzes = Vec::new();
    for path in find_bank_files(dir)? {
        match parse_quiz(&path) {
            Ok(quiz) => quizzes.push(quiz),
            Err(e) => {
                tracing::warn!("skipping {}: {:#}", path.display(), e);
            }
        }
    }
    Ok(quizzes)
}

/// A soft issue found in a bank that still loads.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

fn secs_in_range(raw: i64) -> bool {
    u64::try_from(raw).is_ok_and(|s| (1..=MAX_TIME_LIMIT_SECS).contains(&s))
}

/// Check a document for issues that fall back to defaults or look like
/// authoring mistakes.
pub fn validate_document(doc: &QuizDocument) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let quiz_warning = |message: String| ValidationWarning {
        question_id: None,
        message,
    };

    if passing_score_or_default(doc.quiz.passing_score) as i64 != doc.quiz.passing_score {
        warnings.push(quiz_warning(format!(
            "passing_score {} is outside 1..=100, default will be used",
            doc.quiz.passing_score
        )));
    }
    if doc
        .quiz
        .time_per_question_secs
        .is_some_and(|s| !secs_in_range(s))
    {
        warnings.push(quiz_warning(format!(
            "time_per_question_secs is outside 1..={MAX_TIME_LIMIT_SECS}, default will be used"
        )));
    }
    if doc
        .quiz
        .time_limit_minutes
        .is_some_and(|m| !secs_in_range(m.saturating_mul(60)))
    {
        warnings.push(quiz_warning(format!(
            "time_limit_minutes is outside 1..={}, default will be used",
            MAX_TIME_LIMIT_SECS / 60
        )));
    }
    if doc.quiz.time_per_question_secs.is_some() && doc.quiz.time_limit_minutes.is_some() {
        warnings.push(quiz_warning(
            "both time_per_question_secs and time_limit_minutes set, per-question limit wins"
                .into(),
        ));
    }

    for q in &doc.questions {
        let mut seen = HashSet::new();
        if q.options.iter().any(|o| !seen.insert(o.trim().to_lowercase())) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "options contain duplicates".into(),
            });
        }
        if q.points == Some(0) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "question is worth 0 points".into(),
            });
        }
        if q.time_limit_secs.is_some_and(|s| !secs_in_range(s)) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!(
                    "time_limit_secs is outside 1..={MAX_TIME_LIMIT_SECS} and will be ignored"
                ),
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const VALID_TOML: &str = r#"
[quiz]
id = "bali"
name = "Bali Heritage"
description = "Temples and traditions of Bali"
topic = "bali"
passing_score = 60
time_per_question_secs = 20

[[questions]]
id = "besakih"
prompt = "Besakih, the mother temple of Bali, stands on the slopes of which volcano?"
options = ["Mount Agung", "Mount Batur", "Mount Rinjani"]
correct = 0
explanation = "Pura Besakih lies about 1,000 m up Mount Agung."
points = 20

[[questions]]
id = "subak"
prompt = "What is the subak system recognised by UNESCO?"
options = ["A dance", "A rice-field irrigation system", "A weaving technique"]
correct = 1
time_limit_secs = 45
"#;

    #[test]
    fn parse_valid_toml() {
        let quiz = parse_quiz_str(VALID_TOML, &PathBuf::from("bali.toml")).unwrap();
        assert_eq!(quiz.id(), "bali");
        assert_eq!(quiz.topic(), Some("bali"));
        assert_eq!(quiz.question_count(), 2);
        assert_eq!(quiz.passing_score(), 60);
        assert_eq!(quiz.questions()[0].points(), 20);
        assert_eq!(quiz.questions()[1].points(), 10);
        assert_eq!(quiz.allotted_for(0), Duration::from_secs(20));
        assert_eq!(quiz.allotted_for(1), Duration::from_secs(45));
        assert!(quiz.questions()[0].explanation().is_some());
    }

    #[test]
    fn parse_missing_optional_fields() {
        let toml = r#"
[quiz]
id = "minimal"
name = "Minimal"

[[questions]]
id = "q1"
prompt = "Borobudur is located on which island?"
options = ["Java", "Sumatra"]
correct = 0
"#;
        let quiz = parse_quiz_str(toml, &PathBuf::from("minimal.toml")).unwrap();
        assert_eq!(quiz.passing_score(), 70);
        assert_eq!(quiz.time_limit(), TimeLimit::default());
        assert!(!quiz.shuffle_questions());
        assert!(quiz.description().is_empty());
    }

    #[test]
    fn session_minutes_are_split() {
        let toml = r#"
[quiz]
id = "split"
name = "Split"
time_limit_minutes = 1

[[questions]]
id = "q1"
prompt = "One?"
options = ["a", "b"]
correct = 0

[[questions]]
id = "q2"
prompt = "Two?"
options = ["a", "b"]
correct = 1
"#;
        let quiz = parse_quiz_str(toml, &PathBuf::from("split.toml")).unwrap();
        assert_eq!(quiz.allotted_for(0), Duration::from_secs(30));
        assert_eq!(quiz.allotted_for(1), Duration::from_secs(30));
    }

    #[test]
    fn non_positive_settings_fall_back() {
        let toml = r#"
[quiz]
id = "fallback"
name = "Fallback"
passing_score = 0
time_per_question_secs = -5

[[questions]]
id = "q1"
prompt = "Prompt?"
options = ["a", "b"]
correct = 0
time_limit_secs = 0
"#;
        let doc = parse_document_str(toml, &PathBuf::from("f.toml")).unwrap();
        let warnings = validate_document(&doc);
        assert!(warnings.iter().any(|w| w.message.contains("passing_score")));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("time_per_question_secs")));
        assert!(warnings
            .iter()
            .any(|w| w.question_id.as_deref() == Some("q1")));

        let quiz = doc.into_config().unwrap();
        assert_eq!(quiz.passing_score(), 70);
        assert_eq!(quiz.allotted_for(0), Duration::from_secs(30));
    }

    #[test]
    fn huge_time_limits_fall_back() {
        let toml = r#"
[quiz]
id = "huge"
name = "Huge"
time_limit_minutes = 9223372036854775807

[[questions]]
id = "q1"
prompt = "Prompt?"
options = ["a", "b"]
correct = 0
time_limit_secs = 9223372036854775807

[[questions]]
id = "q2"
prompt = "Prompt?"
options = ["a", "b"]
correct = 1
"#;
        let doc = parse_document_str(toml, &PathBuf::from("huge.toml")).unwrap();
        let warnings = validate_document(&doc);
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("time_limit_minutes")));
        assert!(warnings
            .iter()
            .any(|w| w.question_id.as_deref() == Some("q1")));

        let quiz = doc.into_config().unwrap();
        assert_eq!(quiz.time_limit(), TimeLimit::default());
        assert_eq!(quiz.allotted_for(0), Duration::from_secs(30));
        assert_eq!(quiz.allotted_for(1), Duration::from_secs(30));

        let toml = r#"
[quiz]
id = "huge"
name = "Huge"
time_per_question_secs = 9223372036854775807

[[questions]]
id = "q1"
prompt = "Prompt?"
options = ["a", "b"]
correct = 0
"#;
        let quiz = parse_quiz_str(toml, &PathBuf::from("huge.toml")).unwrap();
        assert_eq!(quiz.allotted_for(0), Duration::from_secs(30));
    }

    #[test]
    fn empty_bank_is_rejected() {
        let toml = r#"
[quiz]
id = "empty"
name = "Empty"
"#;
        let err = parse_quiz_str(toml, &PathBuf::from("empty.toml")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::NoQuestions)
        );
    }

    #[test]
    fn out_of_range_correct_is_rejected() {
        let toml = r#"
[quiz]
id = "bad"
name = "Bad"

[[questions]]
id = "q1"
prompt = "Prompt?"
options = ["a", "b"]
correct = 5
"#;
        let err = parse_quiz_str(toml, &PathBuf::from("bad.toml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::CorrectIndexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn duplicate_options_warn() {
        let toml = r#"
[quiz]
id = "dupes"
name = "Dupes"

[[questions]]
id = "q1"
prompt = "Prompt?"
options = ["Java", "java "]
correct = 0
"#;
        let doc = parse_document_str(toml, &PathBuf::from("d.toml")).unwrap();
        let warnings = validate_document(&doc);
        assert!(warnings.iter().any(|w| w.message.contains("duplicates")));
    }

    #[test]
    fn parse_json_bank() {
        let json = serde_json::json!({
            "quiz": {"id": "java", "name": "Java Heritage", "passing_score": 80},
            "questions": [
                {"id": "q1", "prompt": "Prambanan?", "options": ["Hindu", "Buddhist"], "correct": 0}
            ]
        });
        let quiz = parse_quiz_json(&json.to_string()).unwrap();
        assert_eq!(quiz.name(), "Java Heritage");
        assert_eq!(quiz.passing_score(), 80);
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_quiz_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn load_directory_skips_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bali.toml"), VALID_TOML).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("broken.toml"), "[quiz]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(find_bank_files(dir.path()).unwrap().len(), 2);
        let quizzes = load_quiz_directory(dir.path()).unwrap();
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].id(), "bali");
    }
}
