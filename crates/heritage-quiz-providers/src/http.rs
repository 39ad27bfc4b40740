//! Remote question banks served as JSON over HTTP.
//!
//! The server exposes `GET {base}/banks` (topic listing) and
//! `GET {base}/banks/{topic}` (one bank in the same shape as the TOML files).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use heritage_quiz_core::model::QuizConfig;
use heritage_quiz_core::parser::QuizDocument;
use heritage_quiz_core::traits::{QuestionBankProvider, TopicInfo};

use crate::error::{check_topic, ProviderError};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// HTTP bank provider.
pub struct HttpBankProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpBankProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: Option<u64>,
    ) -> anyhow::Result<Self> {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout_secs,
            client,
        })
    }

    async fn get(&self, url: String) -> Result<reqwest::Response, ProviderError> {
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                ProviderError::NetworkError(format!(
                    "bank server not reachable at {}",
                    self.base_url
                ))
            } else {
                ProviderError::NetworkError(e.to_string())
            }
        })
    }
}

#[derive(Deserialize)]
struct TopicEntry {
    topic: String,
    name: String,
    #[serde(default)]
    question_count: usize,
}

#[derive(Deserialize)]
struct TopicsResponse {
    topics: Vec<TopicEntry>,
}

#[async_trait]
impl QuestionBankProvider for HttpBankProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch(&self, topic: &str) -> anyhow::Result<QuizConfig> {
        check_topic(topic)?;
        let response = self
            .get(format!("{}/banks/{}", self.base_url, topic))
            .await?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(ProviderError::TopicNotFound(topic.to_string()).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let document: QuizDocument =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidBank {
                    source_name: self.name.clone(),
                    reason: format!("failed to parse bank JSON: {e}"),
                })?;

        let quiz = document.into_config()?;
        tracing::debug!(
            quiz = %quiz.id(),
            questions = quiz.question_count(),
            "fetched bank"
        );
        Ok(quiz)
    }

    async fn topics(&self) -> anyhow::Result<Vec<TopicInfo>> {
        let response = self.get(format!("{}/banks", self.base_url)).await?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let listing: TopicsResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidBank {
                    source_name: self.name.clone(),
                    reason: format!("failed to parse topic listing: {e}"),
                })?;

        Ok(listing
            .topics
            .into_iter()
            .map(|t| TopicInfo {
                topic: t.topic,
                name: t.name,
                question_count: t.question_count,
                source: self.name.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heritage_quiz_core::error::ConfigError;
    use heritage_quiz_core::model::TimeLimit;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bank_json() -> serde_json::Value {
        serde_json::json!({
            "quiz": {
                "id": "yogyakarta",
                "name": "Yogyakarta Heritage",
                "topic": "yogyakarta",
                "passing_score": 60,
                "time_limit_minutes": 1
            },
            "questions": [
                {
                    "id": "q1",
                    "prompt": "Which palace is the seat of the Sultan of Yogyakarta?",
                    "options": ["Kraton", "Puri", "Istana Bogor"],
                    "correct": 0
                },
                {
                    "id": "q2",
                    "prompt": "Which Hindu temple compound lies just outside Yogyakarta?",
                    "options": ["Prambanan", "Besakih"],
                    "correct": 0,
                    "points": 20
                }
            ]
        })
    }

    #[tokio::test]
    async fn fetches_bank() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/banks/yogyakarta"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bank_json()))
            .mount(&server)
            .await;

        let provider =
            HttpBankProvider::new("remote", &server.uri(), Some("secret".into()), None).unwrap();
        let quiz = provider.fetch("yogyakarta").await.unwrap();

        assert_eq!(quiz.question_count(), 2);
        assert_eq!(quiz.passing_score(), 60);
        assert_eq!(
            quiz.time_limit(),
            TimeLimit::PerSession(Duration::from_secs(60))
        );
        assert_eq!(quiz.total_points(), 30);
    }

    #[tokio::test]
    async fn missing_topic() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/banks/papua"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = HttpBankProvider::new("remote", &server.uri(), None, None).unwrap();
        let err = provider.fetch("papua").await.unwrap_err();
        assert!(err.to_string().contains("topic not found: papua"));
    }

    #[tokio::test]
    async fn traversal_topic_is_not_requested() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bank_json()))
            .expect(0)
            .mount(&server)
            .await;

        let provider = HttpBankProvider::new("remote", &server.uri(), None, None).unwrap();
        let err = provider.fetch("../admin").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::InvalidTopic(t)) if t == "../admin"
        ));
    }

    #[tokio::test]
    async fn server_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/banks/bali"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let provider = HttpBankProvider::new("remote", &server.uri(), None, None).unwrap();
        let err = provider.fetch("bali").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::ApiError { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/banks/bali"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = HttpBankProvider::new("remote", &server.uri(), None, None).unwrap();
        let err = provider.fetch("bali").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::InvalidBank { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_bank_is_config_error() {
        let server = MockServer::start().await;
        let mut body = bank_json();
        body["questions"][0]["correct"] = serde_json::json!(7);

        Mock::given(method("GET"))
            .and(path("/banks/yogyakarta"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let provider = HttpBankProvider::new("remote", &server.uri(), None, None).unwrap();
        let err = provider.fetch("yogyakarta").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::CorrectIndexOutOfRange { index: 7, .. })
        ));
    }

    #[tokio::test]
    async fn lists_topics() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/banks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "topics": [
                    {"topic": "bali", "name": "Bali Heritage", "question_count": 8},
                    {"topic": "java", "name": "Java Heritage"}
                ]
            })))
            .mount(&server)
            .await;

        let provider = HttpBankProvider::new("remote", &server.uri(), None, None).unwrap();
        let topics = provider.topics().await.unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].question_count, 8);
        assert_eq!(topics[1].question_count, 0);
        assert_eq!(topics[1].source, "remote");
    }
}
