//! Start a chat-proxy server programmatically against a local Ollama.
//!
//! Usage:
//!   ollama serve &
//!   cargo run --example basic_proxy

use chat_proxy::{build_router, AppState, BackendKind, ProxyConfig, SharedLogger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = ProxyConfig::find_and_load(None)?;
    config.apply_env()?;
    config.backend = BackendKind::Ollama;

    println!(
        "Backend: ollama ({} model={})",
        config.ollama.effective_base_url(),
        config.ollama.effective_model()
    );

    let logger = SharedLogger::tracing_only();
    let client = reqwest::Client::new();

    let port = config.port;
    let state = Arc::new(AppState::new(config, client, logger));

    let app = build_router(state);
    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("Listening on http://{}", addr);
    println!();
    println!(
        "  curl -s http://{}/api/claude/messages -H 'content-type: application/json' \\",
        addr
    );
    println!("    -d '{{\"messages\":[{{\"role\":\"user\",\"content\":\"hello\"}}]}}'");

    axum::serve(listener, app).await?;
    Ok(())
}
