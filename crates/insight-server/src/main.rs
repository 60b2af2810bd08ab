//! Stock insights HTTP server

use anyhow::Context;
use clap::Parser;
use insight_server::{AppState, insight_router};
use insight_stock::{InsightConfig, InsightOrchestrator};
use insight_utils::{LogFormat, init_tracing};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "insight-server")]
#[command(about = "HTTP service for stock insights", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "INSIGHT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "INSIGHT_PORT", default_value_t = 8080)]
    port: u16,

    /// Log output format (pretty or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.log_format);

    let config = InsightConfig::from_env().context("Invalid configuration")?;
    let orchestrator =
        InsightOrchestrator::from_config(config).context("Failed to build providers")?;
    let app = insight_router(AppState::new(orchestrator));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, "Starting insight server");
    axum::serve(listener, app).await?;

    Ok(())
}
