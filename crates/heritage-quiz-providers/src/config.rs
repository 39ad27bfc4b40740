//! Application configuration and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use heritage_quiz_core::traits::QuestionBankProvider;

use crate::directory::DirectoryBankProvider;
use crate::http::HttpBankProvider;

/// Where a set of question banks comes from.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Directory {
        path: PathBuf,
    },
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceConfig::Directory { path } => {
                f.debug_struct("Directory").field("path", path).finish()
            }
            SourceConfig::Http {
                base_url,
                api_key,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

/// Top-level heritage-quiz configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAppConfig {
    /// Bank sources keyed by name.
    #[serde(default = "default_sources")]
    pub sources: HashMap<String, SourceConfig>,
    /// Source used when none is named.
    #[serde(default = "default_source")]
    pub default_source: String,
    /// Overrides the passing score of every bank.
    #[serde(default)]
    pub passing_score: Option<i64>,
    /// Seconds for every question of every bank, per-question limits included.
    #[serde(default)]
    pub seconds_per_question: Option<i64>,
    /// Countdown tick interval in milliseconds; 0 disables ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Where results are written when `--output` is not given.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_sources() -> HashMap<String, SourceConfig> {
    HashMap::from([(
        default_source(),
        SourceConfig::Directory {
            path: PathBuf::from("banks"),
        },
    )])
}
fn default_source() -> String {
    "local".to_string()
}
fn default_tick_interval() -> u64 {
    1000
}

impl Default for QuizAppConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            default_source: default_source(),
            passing_score: None,
            seconds_per_question: None,
            tick_interval_ms: default_tick_interval(),
            output_dir: None,
        }
    }
}

impl QuizAppConfig {
    /// The named source, or the default one.
    pub fn source(&self, name: Option<&str>) -> Result<(&str, &SourceConfig)> {
        let name = name.unwrap_or(self.default_source.as_str());
        self.sources
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .with_context(|| format!("unknown bank source: {name}"))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_source_config(config: &SourceConfig) -> SourceConfig {
    match config {
        SourceConfig::Directory { path } => SourceConfig::Directory {
            path: PathBuf::from(resolve_env_vars(&path.to_string_lossy())),
        },
        SourceConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => SourceConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_key: api_key.as_ref().map(|k| resolve_env_vars(k)),
            timeout_secs: *timeout_secs,
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `heritage-quiz.toml` in the current directory
/// 2. `~/.config/heritage-quiz/config.toml`
///
/// Environment variable override: `HERITAGE_QUIZ_BANK_URL` adds (or replaces)
/// an HTTP source named `remote`.
pub fn load_config() -> Result<QuizAppConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizAppConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("heritage-quiz.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizAppConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizAppConfig::default(),
    };

    if let Ok(url) = std::env::var("HERITAGE_QUIZ_BANK_URL") {
        config.sources.insert(
            "remote".into(),
            SourceConfig::Http {
                base_url: url,
                api_key: None,
                timeout_secs: None,
            },
        );
    }

    config.sources = config
        .sources
        .iter()
        .map(|(k, v)| (k.clone(), resolve_source_config(v)))
        .collect();

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("heritage-quiz"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &SourceConfig) -> Result<Arc<dyn QuestionBankProvider>> {
    match config {
        SourceConfig::Directory { path } => {
            Ok(Arc::new(DirectoryBankProvider::new(name, path.clone())))
        }
        SourceConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => Ok(Arc::new(HttpBankProvider::new(
            name,
            base_url,
            api_key.clone(),
            *timeout_secs,
        )?)),
    }
}
