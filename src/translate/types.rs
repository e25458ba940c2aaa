use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, Result};

// ---------------------------------------------------------------------------
// Inbound (what the front-end sends TO us)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Reject messages whose role or content is empty or whitespace only. The
    /// error names the first offending field.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (i, msg) in self.messages.iter().enumerate() {
            if msg.role.trim().is_empty() {
                return Err(format!("messages[{i}].role must not be empty"));
            }
            if msg.content.trim().is_empty() {
                return Err(format!("messages[{i}].content must not be empty"));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Outbound to the client (the unified response shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "type", default = "default_block_type")]
    pub block_type: String,
    pub text: String,
}

impl TextBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            block_type: default_block_type(),
            text: text.into(),
        }
    }
}

fn default_block_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The single response shape returned to the caller whichever backend served it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedResponse {
    pub content: Vec<TextBlock>,
    pub id: String,
    pub model: String,
    pub role: String,
    pub stop_reason: String,
    pub usage: Usage,
}

/// The few fields of a reply the proxy looks at for its own log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReplySummary {
    pub id: String,
    pub model: String,
    pub role: String,
    pub usage: Usage,
}

/// A successful backend answer, ready to send to the caller.
#[derive(Debug, Clone)]
pub enum ChatReply {
    /// Upstream body that is already the unified shape, forwarded byte for byte.
    Passthrough { body: Bytes, summary: ReplySummary },
    /// Built here from a native body.
    Translated(UnifiedResponse),
}

impl ChatReply {
    /// Wrap an upstream body for passthrough. It must be a JSON object; nothing
    /// else about it is checked or changed.
    pub fn passthrough(body: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| ProxyError::translation(format!("Upstream body is not JSON: {e}")))?;
        if !value.is_object() {
            return Err(ProxyError::translation("Upstream body is not a JSON object"));
        }
        // Summary is for the log only; odd field types leave it blank.
        let summary = serde_json::from_value(value).unwrap_or_default();
        Ok(Self::Passthrough {
            body: Bytes::copy_from_slice(body.as_bytes()),
            summary,
        })
    }

    pub fn summary(&self) -> ReplySummary {
        match self {
            Self::Passthrough { summary, .. } => summary.clone(),
            Self::Translated(resp) => ReplySummary {
                id: resp.id.clone(),
                model: resp.model.clone(),
                role: resp.role.clone(),
                usage: resp.usage.clone(),
            },
        }
    }

    /// Exact bytes the caller receives.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            Self::Passthrough { body, .. } => Ok(body.clone()),
            Self::Translated(resp) => Ok(Bytes::from(serde_json::to_vec(resp)?)),
        }
    }
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_in_order() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"messages":[
                {"role":"user","content":"a"},
                {"role":"assistant","content":"b"},
                {"role":"user","content":"c"}
            ]}"#,
        )
        .unwrap();

        let contents: Vec<&str> = req.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let req = ChatRequest {
            messages: vec![ChatMessage::new("user", "hi"), ChatMessage::new("", "x")],
        };
        assert_eq!(req.validate().unwrap_err(), "messages[1].role must not be empty");

        let req = ChatRequest {
            messages: vec![ChatMessage::new("user", "")],
        };
        assert!(req.validate().unwrap_err().contains("content"));
    }

    #[test]
    fn test_validate_treats_whitespace_alike_for_role_and_content() {
        let req = ChatRequest {
            messages: vec![ChatMessage::new("  ", "hi")],
        };
        assert_eq!(req.validate().unwrap_err(), "messages[0].role must not be empty");

        let req = ChatRequest {
            messages: vec![ChatMessage::new("user", " \n\t ")],
        };
        assert_eq!(
            req.validate().unwrap_err(),
            "messages[0].content must not be empty"
        );
    }

    #[test]
    fn test_passthrough_keeps_bytes_and_reads_summary() {
        let raw = r#"{"id":"msg_01","type":"message","role":"assistant","model":"claude-sonnet-4-20250514",
            "content":[{"type":"thinking","thinking":"hmm","signature":"sig"},
                       {"type":"text","text":"Hi","citations":[{"type":"char_location","cited_text":"x"}]}],
            "stop_reason":"end_turn","stop_sequence":null,
            "usage":{"input_tokens":12,"output_tokens":3,"cache_read_input_tokens":0}}"#;

        let reply = ChatReply::passthrough(raw).unwrap();
        assert_eq!(reply.to_bytes().unwrap(), raw.as_bytes());

        let summary = reply.summary();
        assert_eq!(summary.role, "assistant");
        assert_eq!(summary.id, "msg_01");
        assert_eq!(summary.usage.input_tokens, 12);
        assert_eq!(summary.usage.output_tokens, 3);
    }

    #[test]
    fn test_passthrough_rejects_non_object() {
        assert!(matches!(
            ChatReply::passthrough("<html>bad gateway</html>"),
            Err(ProxyError::Translation { .. })
        ));
        assert!(ChatReply::passthrough("[]").is_err());
    }

    #[test]
    fn test_passthrough_tolerates_unexpected_field_types() {
        let raw = r#"{"id":42,"role":"assistant","content":[]}"#;
        let reply = ChatReply::passthrough(raw).unwrap();
        assert_eq!(reply.to_bytes().unwrap(), raw.as_bytes());
        assert_eq!(reply.summary(), ReplySummary::default());
    }
}
