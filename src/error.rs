//! Error types for the proxy and their mapping onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::translate::types::ErrorBody;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    /// A credential or setting the selected backend needs is missing.
    #[error("{message}")]
    Config { message: String },

    /// The backend answered with a non-success status.
    #[error("{backend} API error: {body}")]
    Upstream {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("Request to {backend} API timed out")]
    UpstreamTimeout { backend: &'static str },

    #[error("Failed to connect to {backend} API: {message}")]
    UpstreamUnreachable {
        backend: &'static str,
        message: String,
    },

    #[error("Translation error: {message}")]
    Translation { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl ProxyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation {
            message: msg.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Classify a transport failure from the outbound client.
    pub fn transport(backend: &'static str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout { backend }
        } else {
            Self::UpstreamUnreachable {
                backend,
                message: err.to_string(),
            }
        }
    }

    /// HTTP status surfaced to the caller for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            Self::Config { .. }
            | Self::Translation { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Toml(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used in the request log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "configuration",
            Self::Upstream { .. } => "upstream",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::UpstreamUnreachable { .. } => "upstream_unreachable",
            _ => "internal",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            Self::Config { .. }
            | Self::Upstream { .. }
            | Self::UpstreamTimeout { .. }
            | Self::UpstreamUnreachable { .. } => self.to_string(),
            _ => format!("Internal server error: {self}"),
        };
        (status, Json(ErrorBody::new(detail))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ProxyError::config("missing key").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::UpstreamTimeout { backend: "Claude" }.status_code(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            ProxyError::UpstreamUnreachable {
                backend: "Ollama",
                message: "connection refused".to_string(),
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ProxyError::translation("bad body").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_keeps_backend_status() {
        let err = ProxyError::Upstream {
            backend: "Claude",
            status: 429,
            body: r#"{"type":"error"}"#.to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert!(err.to_string().contains(r#"{"type":"error"}"#));
    }

    #[test]
    fn test_unrepresentable_upstream_status_falls_back() {
        let err = ProxyError::Upstream {
            backend: "Ollama",
            status: 42,
            body: String::new(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_internal_detail_is_prefixed() {
        let resp = ProxyError::other("boom").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
