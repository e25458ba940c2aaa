use std::time::Instant;

use crate::backend::Backend;
use crate::error::{ProxyError, Result};
use crate::logging::{LogLevel, SharedLogger};
use crate::translate::anthropic_types::ApiErrorResponse;
use crate::translate::types::{ChatReply, ChatRequest};

/// Forward one chat request through `backend` and translate the answer.
///
/// A hosted-API success body comes back as [`ChatReply::Passthrough`] with its
/// bytes unchanged; a local-server body comes back translated.
///
/// Exactly one outbound call is made, bounded by the backend's timeout. Nothing
/// is retried: the first failure is mapped onto a [`ProxyError`] and returned.
pub async fn handle(
    req: &ChatRequest,
    backend: &dyn Backend,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<ChatReply> {
    let started = Instant::now();
    let result = forward(req, backend, client, logger).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match &result {
        Ok(reply) => {
            let summary = reply.summary();
            logger.log_with_context(
                LogLevel::Info,
                "proxy",
                format!(
                    "Completed: backend={} id={} in={} out={} tokens",
                    backend.kind(),
                    summary.id,
                    summary.usage.input_tokens,
                    summary.usage.output_tokens
                ),
                serde_json::json!({
                    "backend": backend.kind().as_str(),
                    "model": summary.model,
                    "role": summary.role,
                    "messages": req.messages.len(),
                    "elapsed_ms": elapsed_ms,
                }),
            );
        }
        Err(e) => logger.log_with_context(
            LogLevel::Warn,
            "proxy",
            format!("Failed: backend={} {}", backend.kind(), summarize(e)),
            serde_json::json!({
                "backend": backend.kind().as_str(),
                "kind": e.kind(),
                "status": e.status_code().as_u16(),
                "messages": req.messages.len(),
                "elapsed_ms": elapsed_ms,
            }),
        ),
    }

    result
}

async fn forward(
    req: &ChatRequest,
    backend: &dyn Backend,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<ChatReply> {
    let outbound = backend.translate_request(req)?;
    let label = backend.kind().display_name();

    logger.info(
        "proxy",
        format!(
            "POST {} model={} messages={}",
            outbound.url,
            backend.model(),
            req.messages.len()
        ),
    );

    let mut builder = client.post(&outbound.url).timeout(backend.timeout());
    for (name, value) in &outbound.headers {
        builder = builder.header(*name, value);
    }

    // Headers first: json() only sets content-type when it is absent
    let response = builder
        .json(&outbound.body)
        .send()
        .await
        .map_err(|e| ProxyError::transport(label, &e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProxyError::transport(label, &e))?;

    logger.debug(
        "proxy",
        format!("Response status={} body_len={}", status.as_u16(), body.len()),
    );

    if !status.is_success() {
        return Err(ProxyError::Upstream {
            backend: label,
            status: status.as_u16(),
            body,
        });
    }

    backend.translate_response(&body)
}

/// One-line description of a failure for the log. Upstream bodies are reduced to
/// the provider's own error message when it has one.
fn summarize(err: &ProxyError) -> String {
    match err {
        ProxyError::Upstream { status, body, .. } => {
            match serde_json::from_str::<ApiErrorResponse>(body) {
                Ok(parsed) => format!(
                    "status={} {}: {}",
                    status, parsed.error.error_type, parsed.error.message
                ),
                Err(_) => format!("status={} {}", status, truncate(body, 300)),
            }
        }
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
