// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crewline - call-event automation pipeline for voice-agent CRM tenants.
//!
//! Binary entry point: loads configuration, opens storage, wires the
//! workflow engine client, and serves the webhook gateway.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crewline_config::CrewlineConfig;
use crewline_core::CrewlineError;
use crewline_gateway::{AppState, Pipeline, ServerConfig};
use crewline_storage::Database;
use crewline_workflow::{DisabledEngine, HttpWorkflowEngine, WorkflowEngine};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Crewline - call-event automation pipeline.
#[derive(Parser, Debug)]
#[command(name = "crewline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server.
    Serve,
    /// Print the effective configuration and exit.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match crewline_config::load_and_validate() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("crewline: configuration error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.server.log_level);

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve(config).await {
                eprintln!("crewline: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            print_config(&config);
        }
        None => {
            println!("crewline: use --help for available commands");
        }
    }
}

/// RUST_LOG wins over the configured log level when set.
fn init_tracing(log_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config: CrewlineConfig) -> Result<(), CrewlineError> {
    let db = Arc::new(Database::open(&config.storage.database_path).await?);
    info!(path = %config.storage.database_path, "storage opened");

    let engine: Arc<dyn WorkflowEngine> = match config.workflow.engine_url.as_deref() {
        Some(url) => {
            info!(%url, "workflow engine dispatch enabled");
            Arc::new(HttpWorkflowEngine::new(
                url.to_string(),
                config.workflow.api_key.as_deref(),
                Duration::from_secs(config.workflow.dispatch_timeout_secs),
            )?)
        }
        None => {
            info!("no workflow engine configured; dispatch disabled");
            Arc::new(DisabledEngine)
        }
    };

    let pipeline = Pipeline::new(Arc::clone(&db), engine, config.billing.rate_per_minute);
    let state = AppState {
        pipeline: Arc::new(pipeline),
        start_time: Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    let result = crewline_gateway::start_server(&server_config, state).await;
    db.close().await?;
    result
}

fn print_config(config: &CrewlineConfig) {
    println!("server.host = {}", config.server.host);
    println!("server.port = {}", config.server.port);
    println!("server.log_level = {}", config.server.log_level);
    println!("storage.database_path = {}", config.storage.database_path);
    println!("billing.rate_per_minute = {}", config.billing.rate_per_minute);
    println!(
        "workflow.engine_url = {}",
        config.workflow.engine_url.as_deref().unwrap_or("(disabled)")
    );
    println!(
        "workflow.dispatch_timeout_secs = {}",
        config.workflow.dispatch_timeout_secs
    );
}
