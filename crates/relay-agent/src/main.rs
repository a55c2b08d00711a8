//! # relay-agent
//!
//! Scan relay binary. Loads settings, checks the signing secret and starts
//! the WebSocket server.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use relay_auth::{CredentialValidator, SigningSecret};
use relay_server::config::ServerConfig;
use relay_server::server::RelayServer;
use relay_settings::{LoggingSettings, RelaySettings, ServerSettings};

/// Scan relay server.
#[derive(Parser, Debug)]
#[command(name = "scan-relay", about = "Customer/restaurant scan relay")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings and `PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a JSON settings file (defaults to `RELAY_SETTINGS`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit JSON log lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    fn apply(&self, settings: &mut RelaySettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.log_json {
            settings.logging.json = true;
        }
    }
}

fn init_logging(logging: &LoggingSettings) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init is a no-op if a subscriber is already set
    let _ = if logging.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}

fn server_config(server: &ServerSettings) -> ServerConfig {
    ServerConfig {
        host: server.host.clone(),
        port: server.port,
        max_send_queue: server.max_send_queue,
        max_message_size: server.max_message_size,
    }
}

/// Resolve on ctrl-c or, on unix, SIGTERM.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for ctrl-c")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut settings = match args.config {
        Some(ref path) => relay_settings::load_settings_from_path(path),
        None => relay_settings::load_settings(),
    }
    .context("Failed to load settings")?;
    args.apply(&mut settings);
    init_logging(&settings.logging);

    // Refuse to start without a secret rather than accept every token.
    let secret = relay_settings::read_signing_secret().context("Failed to read signing secret")?;
    let validator = CredentialValidator::with_max_age(
        &SigningSecret::from(secret),
        Duration::from_secs(settings.auth.token_max_age_secs),
    );

    let metrics = match relay_server::metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder unavailable, /metrics disabled");
            None
        }
    };

    let server = RelayServer::new(server_config(&settings.server), validator, metrics);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(
        token_max_age_secs = settings.auth.token_max_age_secs,
        "scan relay listening on ws://{addr}/ws"
    );

    shutdown_signal().await?;

    tracing::info!("Shutting down...");
    let remaining = server
        .shutdown()
        .graceful_shutdown(vec![handle], server.registry(), None)
        .await;
    tracing::info!(remaining, "Shutdown complete");
    Ok(())
}
