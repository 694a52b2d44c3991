use thiserror::Error;

use crate::types::TicketId;

#[derive(Error, Debug)]
pub enum TaskboardError {
    #[error("not authenticated: log in first")]
    NotAuthenticated,

    #[error("not allowed: {0}")]
    Forbidden(String),

    #[error("ticket {0} not found")]
    TicketNotFound(TicketId),

    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("API error: {message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid ticket id '{0}'")]
    InvalidTicketId(String),

    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    #[error("invalid priority '{0}'")]
    InvalidPriority(String),

    #[error("invalid ticket type '{0}'")]
    InvalidType(String),

    #[error("unknown board column '{0}'")]
    InvalidColumn(String),

    #[error("invalid filter value for {field}: '{value}'")]
    InvalidFilter { field: &'static str, value: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl TaskboardError {
    pub fn api(message: impl Into<String>) -> Self {
        TaskboardError::Api {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskboardError::TicketNotFound(_))
    }

    /// Server errors and connection-level failures. Authorization and
    /// validation failures are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            TaskboardError::Api { status, .. } => status.is_none_or(|s| s >= 500),
            TaskboardError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskboardError>;
