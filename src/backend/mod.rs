//! Upstream chat backends.
//!
//! Each backend knows how to turn a [`ChatRequest`] into its native outbound call
//! and how to turn its native success body back into a [`ChatReply`]. Both
//! conversions are pure; the single network call lives in [`crate::proxy`].

pub mod anthropic;
pub mod ollama;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::translate::types::{ChatReply, ChatRequest};

pub use anthropic::AnthropicBackend;
pub use ollama::OllamaBackend;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted Messages API.
    #[default]
    Anthropic,
    /// Locally hosted Ollama server.
    Ollama,
}

impl BackendKind {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "ollama" | "local" => Some(Self::Ollama),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    /// Human-facing name used in error messages.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Anthropic => "Claude",
            Self::Ollama => "Ollama",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built outbound call, ready to hand to the HTTP client.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: serde_json::Value,
}

pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Model identifier this backend sends upstream.
    fn model(&self) -> &str;

    /// Upper bound for the whole outbound call.
    fn timeout(&self) -> Duration;

    /// Build the native outbound call for `req`.
    ///
    /// # Errors
    /// Returns `ProxyError::Config` when the backend is missing something it needs
    /// to authenticate upstream.
    fn translate_request(&self, req: &ChatRequest) -> Result<OutboundRequest>;

    /// Convert a native success body into the reply sent to the caller.
    ///
    /// # Errors
    /// Returns `ProxyError::Translation` when the body does not match the native shape.
    fn translate_response(&self, body: &str) -> Result<ChatReply>;
}

/// Build the backend selected by `config.backend`.
pub fn from_config(config: &ProxyConfig) -> Arc<dyn Backend> {
    match config.backend {
        BackendKind::Anthropic => Arc::new(AnthropicBackend::from_config(config)),
        BackendKind::Ollama => Arc::new(OllamaBackend::from_config(config)),
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_backends() {
        assert_eq!(BackendKind::from_name("anthropic"), Some(BackendKind::Anthropic));
        assert_eq!(BackendKind::from_name("Ollama"), Some(BackendKind::Ollama)); // case-insensitive
        assert_eq!(BackendKind::from_name("claude"), Some(BackendKind::Anthropic));
        assert_eq!(BackendKind::from_name("openai"), None);
    }

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = ProxyConfig::default();
        assert_eq!(from_config(&config).kind(), BackendKind::Anthropic);

        config.backend = BackendKind::Ollama;
        let backend = from_config(&config);
        assert_eq!(backend.kind(), BackendKind::Ollama);
        assert_eq!(backend.model(), "deepseek-r1:1.5b");
        assert_eq!(backend.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_join_url_trims_trailing_slash() {
        assert_eq!(
            join_url("http://localhost:11434/", "/api/chat"),
            "http://localhost:11434/api/chat"
        );
    }
}
