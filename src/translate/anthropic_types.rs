//! Wire types for the hosted Messages API (backend A).
//!
//! Only the request side is modelled here: the hosted success response is
//! already the unified shape and is parsed straight into
//! [`UnifiedResponse`](super::types::UnifiedResponse).

use serde::{Deserialize, Serialize};

use super::types::ChatMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u64,
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

/// Error envelope the hosted API returns on non-success statuses. Used for log
/// summaries only; the caller always gets the raw body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}
