//! formbot entry point.
//!
//! Binary name: `formbot`
//!
//! Loads configuration, initializes tracing and application state, then runs
//! the webhook server, the stdin line runner, or an operator command.

mod cli;
mod http;
mod state;
#[cfg(test)]
mod testing;
mod transport;
mod wizards;

use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;

use formbot_core::transport::BoxTransport;
use formbot_infra::config::{load_config, resolve_data_dir};

use cli::{Cli, Commands, StateCommand};
use state::AppState;
use transport::JsonLinesTransport;

/// How often the server drops expired wizard states.
const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = resolve_data_dir();
    let config = load_config(cli.config.as_deref(), &data_dir).await;

    formbot_observe::tracing_setup::init_tracing(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let server_config = config.server.clone();
    let state = AppState::init(
        config,
        data_dir,
        BoxTransport::new(JsonLinesTransport::stdout()),
    )
    .await?;

    let result = match cli.command {
        Commands::Serve { port, host } => {
            let host = host.unwrap_or(server_config.host);
            let port = port.unwrap_or(server_config.port);
            serve(&state, &format!("{host}:{port}")).await
        }

        Commands::Run => cli::run::run(&state).await.map(|_| ()),

        Commands::State { action } => match action {
            StateCommand::Show { user_id } => {
                cli::state::show_state(&state, user_id, cli.json).await
            }
            StateCommand::Clear { user_id } => {
                cli::state::clear_state(&state, user_id, cli.json).await
            }
            StateCommand::Purge => cli::state::purge_states(&state, cli.json).await,
        },
    };

    formbot_observe::tracing_setup::shutdown_tracing();
    result
}

async fn serve(state: &AppState, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "formbot listening");

    let purger = tokio::spawn(purge_periodically(state.clone()));

    let router = http::router::build_router(state.clone());
    let stopping = state.stopping.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            stopping.cancel();
        })
        .await?;

    tracing::info!(in_flight = state.dispatcher.in_flight(), "draining updates");
    state.shutdown().await;
    let _ = purger.await;
    tracing::info!("server stopped");
    Ok(())
}

async fn purge_periodically(state: AppState) {
    let mut ticker = tokio::time::interval(PURGE_INTERVAL);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = state.stopping.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(err) = state.storage.purge_expired().await {
                    tracing::warn!(error = %err, "failed to purge expired wizard states");
                }
            }
        }
    }
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
