use crate::backend::Backend;
use crate::config::ProxyConfig;
use crate::logging::SharedLogger;
use crate::proxy;
use crate::translate::types::{ChatReply, ChatRequest, ErrorBody};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::error::Category;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub const LIVENESS_MESSAGE: &str = "chat-proxy is running!";

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub backend: Arc<dyn Backend>,
    pub client: reqwest::Client,
    pub logger: SharedLogger,
}

impl AppState {
    /// Wire up state for `config`, selecting the backend it names.
    pub fn new(config: ProxyConfig, client: reqwest::Client, logger: SharedLogger) -> Self {
        let backend = crate::backend::from_config(&config);
        Self {
            config,
            backend,
            client,
            logger,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins, &state.logger);

    Router::new()
        .route("/", get(handle_root))
        .route("/api/claude/messages", post(handle_messages))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the configured front-end origins. Methods and headers
/// are mirrored because a wildcard is not allowed alongside credentials.
fn cors_layer(origins: &[String], logger: &SharedLogger) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                logger.warn("server", format!("Ignoring invalid CORS origin '{}'", origin));
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": LIVENESS_MESSAGE }))
}

async fn handle_messages(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: ChatRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            state
                .logger
                .error("server", format!("Failed to parse request: {}", e));
            let err = ErrorBody::new(format!("Invalid request body: {}", e));
            return (rejection_status(&e), Json(err)).into_response();
        }
    };

    if let Err(reason) = req.validate() {
        state
            .logger
            .warn("server", format!("Rejected request: {}", reason));
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody::new(reason))).into_response();
    }

    state.logger.info(
        "server",
        format!(
            "Request: backend={} messages={}",
            state.backend.kind(),
            req.messages.len()
        ),
    );

    match proxy::handle(&req, state.backend.as_ref(), &state.client, &state.logger).await {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Well-formed JSON of the wrong shape is 422; anything that is not JSON is 400.
fn rejection_status(err: &serde_json::Error) -> StatusCode {
    match err.classify() {
        Category::Data => StatusCode::UNPROCESSABLE_ENTITY,
        Category::Syntax | Category::Eof | Category::Io => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ChatReply {
    fn into_response(self) -> Response {
        match self {
            ChatReply::Passthrough { body, .. } => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
            ChatReply::Translated(resp) => Json(resp).into_response(),
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.backend.kind().as_str(),
        "model": state.backend.model(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error(body: &str) -> serde_json::Error {
        serde_json::from_str::<ChatRequest>(body).unwrap_err()
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(rejection_status(&parse_error("{not json")), StatusCode::BAD_REQUEST);
        assert_eq!(rejection_status(&parse_error("")), StatusCode::BAD_REQUEST);
        assert_eq!(
            rejection_status(&parse_error(r#"{"msgs": []}"#)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            rejection_status(&parse_error(r#"{"messages": [{"role": "user"}]}"#)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
