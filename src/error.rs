use std::io;

/// Custom error type for commit_status_relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Malformed payload at '{path}': expected {expected}")]
    MalformedPayload {
        path: String,
        expected: &'static str,
    },

    #[error("Status API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Build could not be run: {0}")]
    BuildError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

impl RelayError {
    pub(crate) fn malformed(path: &str, expected: &'static str) -> Self {
        let path = if path.is_empty() { "<root>" } else { path };
        RelayError::MalformedPayload {
            path: path.to_string(),
            expected,
        }
    }
}

/// Helper type for Results that use RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
