mod cli;

use anyhow::Context;
use cli::Args;
use npm_risk_report::adapters::inbound::http::create_router;
use npm_risk_report::bootstrap::build_app_state;
use npm_risk_report::config::{discover_config, load_config_from_path, validate_config, ConfigFile};
use npm_risk_report::logging::init_tracing;
use npm_risk_report::shared::Result;
use std::path::Path;
use std::process;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("\n❌ An error occurred:\n");
        eprintln!("{}", e);

        // Display error chain
        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("\nCaused by: {}", err);
            source = err.source();
        }

        eprintln!();
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Load configuration: explicit path, then ./npm-risk-report.config.yml, then defaults
    let mut config = load_config(args.config.as_deref())?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    apply_cli_overrides(&mut config, &args);
    validate_config(&config)?;

    init_tracing(&config.logging)?;
    for warning in config.unknown_field_warnings() {
        warn!("{}", warning);
    }

    let addr = config.listen_addr()?;

    // Create adapters and use cases (Dependency Injection)
    let state = build_app_state(&config, |key| std::env::var(key).ok())?;
    let router = create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(address = %addr, "npm-risk-report listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;

    info!("Server stopped");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ConfigFile> {
    match path {
        Some(path) => load_config_from_path(path),
        None => {
            let cwd = std::env::current_dir().context("Failed to read the current directory")?;
            Ok(discover_config(&cwd)?.unwrap_or_default())
        }
    }
}

/// Command-line flags win over the config file and the environment
fn apply_cli_overrides(config: &mut ConfigFile, args: &Args) {
    if let Some(listen) = &args.listen {
        config.server.listen = listen.clone();
    }
    if let Some(format) = args.log_format {
        config.logging.format = format.as_str().to_string();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install the shutdown signal handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
