use std::time::Duration;

use super::{join_url, Backend, BackendKind, OutboundRequest};
use crate::config::{missing_api_key, ProxyConfig};
use crate::error::Result;
use crate::translate::anthropic_types::MessagesRequest;
use crate::translate::types::{ChatReply, ChatRequest};

/// Hosted Messages API. Its native response is the unified shape, so success
/// bodies are forwarded untouched.
#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Env var the key was read from, for the error message when it is missing.
    pub api_key_env: String,
    pub model: String,
    pub max_tokens: u64,
    pub version: String,
    pub persona: String,
    pub timeout: Duration,
}

impl AnthropicBackend {
    /// Build from config, reading the credential from the environment. A missing
    /// credential is not an error here; every request then fails with a
    /// configuration error instead.
    pub fn from_config(config: &ProxyConfig) -> Self {
        let api_key = config.resolve_api_key().ok();
        Self {
            base_url: config.anthropic.base_url.clone(),
            api_key,
            api_key_env: config.anthropic.api_key_env.clone(),
            model: config.anthropic.model.clone(),
            max_tokens: config.anthropic.max_tokens,
            version: config.anthropic.version.clone(),
            persona: config.persona.clone(),
            timeout: Duration::from_secs(config.anthropic.timeout_secs),
        }
    }

    /// Build the payload. Caller messages go through untouched.
    pub fn build_payload(&self, req: &ChatRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: self.persona.clone(),
            messages: req.messages.clone(),
        }
    }
}

impl Backend for AnthropicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn translate_request(&self, req: &ChatRequest) -> Result<OutboundRequest> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| missing_api_key(&self.api_key_env))?;

        let body = serde_json::to_value(self.build_payload(req))?;

        Ok(OutboundRequest {
            url: join_url(&self.base_url, "/v1/messages"),
            headers: vec![
                ("content-type", "application/json".to_string()),
                ("x-api-key", api_key.to_string()),
                ("anthropic-version", self.version.clone()),
            ],
            body,
        })
    }

    fn translate_response(&self, body: &str) -> Result<ChatReply> {
        ChatReply::passthrough(body)
    }
}
