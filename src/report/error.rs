//! Error taxonomy for the report pipeline

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Classification of a failed provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Credentials were rejected or could not be exchanged for a token
    Unauthenticated,
    /// The provider rejected the property/account identifier or the query
    InvalidConfig,
    /// Connection, DNS or timeout failure
    Transport,
    Unknown,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid report request: {0}")]
    InvalidRequest(String),

    #[error("{message}")]
    Provider {
        kind: ProviderErrorKind,
        message: String,
        /// Raw diagnostic payload (response body, transport error chain)
        details: Option<String>,
    },

    #[error("malformed provider response: {0}")]
    Format(String),
}

pub type ReportResult<T> = Result<T, ReportError>;

impl ReportError {
    pub fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self::Provider {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(self, details: impl Into<String>) -> Self {
        match self {
            Self::Provider { kind, message, .. } => Self::Provider {
                kind,
                message,
                details: Some(details.into()),
            },
            other => other,
        }
    }

    /// Provider-level classification. Configuration problems surface as
    /// `InvalidConfig`; request and format errors have no provider kind.
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Provider { kind, .. } => Some(*kind),
            Self::Configuration(_) => Some(ProviderErrorKind::InvalidConfig),
            Self::InvalidRequest(_) | Self::Format(_) => None,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Provider { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}

impl From<ConfigError> for ReportError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() || err.is_timeout() {
            ProviderErrorKind::Transport
        } else if err.is_decode() {
            return Self::Format(err.to_string());
        } else {
            ProviderErrorKind::Unknown
        };

        Self::provider(kind, err.to_string()).with_details(format!("{err:?}"))
    }
}
