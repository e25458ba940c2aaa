use std::time::Duration;

use sha2::{Digest, Sha256};

use super::{join_url, Backend, BackendKind, OutboundRequest};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::translate::ollama_types::{OllamaChatRequest, OllamaChatResponse};
use crate::translate::types::{
    ChatMessage, ChatReply, ChatRequest, TextBlock, UnifiedResponse, Usage,
};

const ID_PREFIX: &str = "ollama-";
const ID_HEX_LEN: usize = 16;

/// Locally hosted Ollama server, called through `/api/chat` with streaming off.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    pub persona: String,
    pub timeout: Duration,
}

impl OllamaBackend {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            base_url: config.ollama.effective_base_url().to_string(),
            model: config.ollama.effective_model().to_string(),
            persona: config.persona.clone(),
            timeout: Duration::from_secs(config.ollama.timeout_secs),
        }
    }

    /// Persona goes first as a system message, then the caller's turns in order.
    pub fn build_payload(&self, req: &ChatRequest) -> OllamaChatRequest {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);
        messages.push(ChatMessage::new("system", self.persona.clone()));
        messages.extend(req.messages.iter().cloned());

        OllamaChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
        }
    }

    /// Map a native `/api/chat` body onto the unified shape.
    pub fn translate(&self, body: &str) -> Result<UnifiedResponse> {
        let native: OllamaChatResponse = serde_json::from_str(body).map_err(|e| {
            ProxyError::translation(format!("Failed to parse Ollama response: {}", e))
        })?;

        let text = native.message.content;

        // Ollama reports neither a stop reason nor usage through /api/chat here;
        // both are fixed placeholders.
        Ok(UnifiedResponse {
            id: synthetic_id(&text),
            content: vec![TextBlock::text(text)],
            model: self.model.clone(),
            role: "assistant".to_string(),
            stop_reason: "end_turn".to_string(),
            usage: Usage::default(),
        })
    }
}

impl Backend for OllamaBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn translate_request(&self, req: &ChatRequest) -> Result<OutboundRequest> {
        Ok(OutboundRequest {
            url: join_url(&self.base_url, "/api/chat"),
            headers: vec![("content-type", "application/json".to_string())],
            body: serde_json::to_value(self.build_payload(req))?,
        })
    }

    fn translate_response(&self, body: &str) -> Result<ChatReply> {
        self.translate(body).map(ChatReply::Translated)
    }
}

/// Display-only message id: `ollama-` plus the first 16 hex chars of the
/// SHA-256 of the response text.
pub fn synthetic_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(ID_HEX_LEN);
    format!("{ID_PREFIX}{hex}")
}
