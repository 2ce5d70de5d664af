mod app;
mod cli;
mod error;
mod handlers;
mod model;
mod reachability;
mod state;
mod telemetry;
mod wiring;

use clap::Parser;
use tracing::info;

use crate::app::App;
use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format)?;

    info!(
        storage = %cli.storage,
        sequence = %cli.sequence,
        cache = %cli.cache,
        domain = %cli.domain,
        "Starting portal gateway"
    );

    let state = wiring::build_state(&cli).await?;
    let router = App::router(state);

    let listener = tokio::net::TcpListener::bind(cli.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "Gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
