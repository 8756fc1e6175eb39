use std::{
    process::ExitCode,
    time::Duration,
};

use celestia_da_mock::MockCelestiaNode;
use tokio::signal::unix::{
    signal,
    SignalKind,
};
use tracing::{
    error,
    info,
};

const LISTEN_ADDR_VAR: &str = "CELESTIA_DA_MOCK_LISTEN_ADDR";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:26658";

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(error) = celestia_da::telemetry::configure()
        .set_pretty_print(true)
        .set_filter_directives(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .try_init()
    {
        eprintln!("failed to initialize telemetry:\n{error:?}");
        return ExitCode::FAILURE;
    }

    let addr = std::env::var(LISTEN_ADDR_VAR).unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.into());
    let node = match MockCelestiaNode::spawn_with_response_delay(&addr, Duration::ZERO).await {
        Ok(node) => node,
        Err(error) => {
            error!(%error, addr, "failed to start mock celestia node");
            return ExitCode::FAILURE;
        }
    };
    info!(endpoint = node.endpoint(), "mock celestia node running");

    let mut sigterm = signal(SignalKind::terminate())
        .expect("setting a SIGTERM listener should always work on Unix");
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
    }
    node.stop();
    node.stopped().await;
    ExitCode::SUCCESS
}
