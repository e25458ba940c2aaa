use chat_proxy::config::config_search_paths;
use chat_proxy::{build_router, AppState, BackendKind, ProxyConfig, SharedLogger};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chat-proxy",
    about = "Chat proxy that fronts a hosted or local LLM backend behind one response contract",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend to forward to: anthropic or ollama (overrides config and env)
    #[arg(long)]
    backend: Option<String>,

    /// Request log file path
    #[arg(long, default_value = "chat-proxy.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;
    config.apply_env()?;

    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(ref name) = cli.backend {
        config.backend = BackendKind::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown backend '{name}'. Known backends: anthropic, ollama"))?;
    }

    let logger = SharedLogger::new(&cli.log_file)?;

    // The hosted backend still starts without a key; requests then fail with 500
    if config.backend == BackendKind::Anthropic && config.resolve_api_key().is_err() {
        warn!(
            "{} is not set; every request will fail until it is configured",
            config.anthropic.api_key_env
        );
    }

    // Timeouts are applied per request by each backend
    let client = reqwest::Client::builder().build()?;

    let state = Arc::new(AppState::new(config.clone(), client, logger.clone()));

    info!("chat-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("  Backend:   {}", state.backend.kind());
    info!("  Model:     {}", state.backend.model());
    info!("  Timeout:   {}s", state.backend.timeout().as_secs());
    info!("  Log file:  {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting chat-proxy backend={} model={} port={}",
            state.backend.kind(),
            state.backend.model(),
            config.port
        ),
    );

    let app = build_router(state);
    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
