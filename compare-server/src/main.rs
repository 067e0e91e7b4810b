//! Models Compare server - exposes the model catalog and prompt comparisons over HTTP.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use models_compare_server::config::TOKEN_ENV_VAR;
use models_compare_server::{app, build_state, Config};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("models-compare {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().map_err(|e| format!("Failed to load configuration: {}", e))?;
    tracing::info!(
        "Starting models-compare: catalog={} (ttl {}s), inference={}",
        config.catalog.url,
        config.catalog.ttl_secs,
        config.inference.endpoint
    );

    if config.inference.token.is_none() {
        tracing::warn!(
            "{} is not set; catalog endpoints work but comparisons will be refused",
            TOKEN_ENV_VAR
        );
    }

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let state = Arc::new(build_state(config)?);

    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
