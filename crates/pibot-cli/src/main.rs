//! PiBot CLI — entry point.
//!
//! # Commands
//!
//! - `pibot ask [-m MESSAGE]` — single prompt, or an interactive REPL
//! - `pibot serve [--host H] [--port P]` — JSON HTTP API for the robot frontend
//! - `pibot status` — show configuration and tool status

mod helpers;
mod repl;
mod server;
mod status;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use pibot_agent::{build_registry, EmotionState, Orchestrator, OrchestratorConfig};
use pibot_core::config::{get_config_path, load_config, Config};
use pibot_providers::HttpGateway;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🤖 PiBot — tool-using conversation service for a small robot
#[derive(Parser)]
#[command(name = "pibot", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.pibot/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask PiBot something (single-shot or interactive REPL)
    Ask {
        /// Single prompt (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Serve the HTTP API
    Serve {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and tool status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .as_deref()
        .map(helpers::expand_tilde)
        .unwrap_or_else(get_config_path);

    match cli.command {
        Commands::Ask { message, logs } => {
            init_logging(logs, false);
            let config = load_config(Some(config_path.as_path()));
            run_ask(message, &config, &config_path).await
        }
        Commands::Serve { host, port, logs } => {
            init_logging(logs, true);
            let mut config = load_config(Some(config_path.as_path()));
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            run_serve(&config, &config_path).await
        }
        Commands::Status => status::run(&config_path),
    }
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

async fn run_ask(message: Option<String>, config: &Config, config_path: &Path) -> Result<()> {
    let (orchestrator, emotions) = build_orchestrator(config, config_path)?;

    match message {
        Some(prompt) => {
            info!("processing single prompt");
            let reply = orchestrator
                .respond(&prompt)
                .await
                .context("prompt failed")?;
            helpers::print_reply(&reply);
        }
        None => repl::run(orchestrator, emotions, config_path.to_path_buf()).await?,
    }

    Ok(())
}

async fn run_serve(config: &Config, config_path: &Path) -> Result<()> {
    let (orchestrator, emotions) = build_orchestrator(config, config_path)?;

    helpers::print_banner();
    println!(
        "  Serving on http://{}:{}  (model: {} via {})",
        config.server.host,
        config.server.port,
        orchestrator.model(),
        orchestrator.gateway_name()
    );
    println!();

    let state = server::AppState {
        orchestrator,
        emotions,
    };
    server::run(state, &config.server).await
}

/// Wire gateway, tools and orchestrator from the loaded configuration.
///
/// The returned `EmotionState` is the one the emotion tool reads its schema from.
pub fn build_orchestrator(
    config: &Config,
    config_path: &Path,
) -> Result<(Arc<Orchestrator>, Arc<EmotionState>)> {
    if !config.provider.is_configured() {
        anyhow::bail!(
            "no API key configured: set provider.apiKey in {} or export OPENAI_API_KEY",
            config_path.display()
        );
    }

    let timeout = Duration::from_secs(config.agent.gateway_timeout_secs);
    let gateway =
        HttpGateway::new(&config.provider, timeout).context("failed to create model gateway")?;

    let emotions = EmotionState::new(&config.tools.emotions);
    let tools = build_registry(
        &config.tools,
        config.agent.strict_tool_registration,
        emotions.clone(),
    )
    .context("invalid tool configuration")?;

    let orchestrator = Orchestrator::new(
        Arc::new(gateway),
        tools,
        config.agent.system_message.clone(),
        OrchestratorConfig::from(&config.agent),
    );

    Ok((Arc::new(orchestrator), emotions))
}

/// Initialize tracing/logging.
///
/// With `honor_env`, a set `RUST_LOG` takes precedence over the flag.
fn init_logging(verbose: bool, honor_env: bool) {
    use tracing_subscriber::EnvFilter;

    let fallback = if verbose {
        EnvFilter::new("pibot=debug,info")
    } else if honor_env {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    let filter = if honor_env && !verbose {
        EnvFilter::try_from_default_env().unwrap_or(fallback)
    } else {
        fallback
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
