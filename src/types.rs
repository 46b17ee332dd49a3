// src/types.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Credential pools keyed by lowercase source name.
pub type Keys = HashMap<String, Vec<String>>;

/// One event on a source (or finder) output stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceResult {
    Subdomain { value: String, source: String },
    Error { source: String, error: String },
}

/// HTTP settings shared by every source of a finder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub proxy: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("subscout/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

/// Input of [`crate::engine::Finder::new`].
#[derive(Debug, Clone, Default)]
pub struct FinderOptions {
    /// Empty means every registered source.
    pub sources_to_use: Vec<String>,
    pub sources_to_exclude: Vec<String>,
    pub keys: Keys,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    JsonLines,
}

/// A JSONL output record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostEntry {
    pub domain: String,
    pub subdomain: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumerationStats {
    pub unique_subdomains: usize,
    pub errors: usize,
    pub duration: Duration,
}

#[derive(Debug, Error)]
pub enum FinderError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Source error in {source_name}: {message}")]
    SourceError {
        source_name: String,
        message: String
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("JSON parse error: {0}\nBody: {1}")]
    JsonParseError(String, String),

    #[error("Rate limit error: {0}")]
    RateLimitError(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Enumeration cancelled")]
    Cancelled,

    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}
