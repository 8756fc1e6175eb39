//! A data availability adapter that publishes rollup payloads to Celestia.
//!
//! The service connects to a Celestia node's JSON-RPC interface and serves the `da.*` JSON-RPC
//! API to rollup nodes over TCP or a unix domain socket. Payloads are wrapped into Celestia blobs
//! under a configured namespace and addressed by ids made of the height they were included at
//! and their share commitment.
//!
//! # Starting the service
//!
//! On startup the service reads its [`Config`] from the environment, checks that the Celestia
//! node is reachable by asking it for the network head, and then binds the configured listener.
//! [`CelestiaDa`] resolves once the server stopped.
//!
//! # Shutting down
//!
//! [`CelestiaDa::shutdown`] stops accepting new connections and waits for in-flight requests to
//! finish. Requests still waiting on the Celestia node after [`SHUTDOWN_TIMEOUT`] are cancelled.
use std::{
    future::Future,
    sync::Arc,
    task::Poll,
    time::Duration,
};

pub mod adapter;
mod build_info;
pub mod celestia;
pub mod config;
pub mod da;
pub mod error;
pub mod fee;
pub mod id;
pub(crate) mod metrics;
pub mod node;
pub(crate) mod serde;
pub mod server;
pub mod telemetry;

pub use adapter::CelestiaAdapter;
pub use build_info::BUILD_INFO;
pub use config::Config;
pub use da::DataAvailability;
pub use error::Error;
use eyre::WrapErr as _;
use jsonrpsee::{
    core::ClientError,
    http_client::HttpClient,
    server::ServerHandle,
};
pub use metrics::Metrics;
use tokio::task::{
    JoinError,
    JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{
    info,
    instrument,
    warn,
};

use crate::{
    celestia::BlobApiClient as _,
    node::NodeClientBuilder,
    server::{
        ListenAddr,
        Listener,
    },
};

/// How long [`CelestiaDa::shutdown`] waits for in-flight requests before cancelling them.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

const NODE_CONNECT_RETRIES: u32 = 3;

/// The [`CelestiaDa`] service returned by [`CelestiaDa::spawn`].
pub struct CelestiaDa {
    local_addr: ListenAddr,
    server_handle: ServerHandle,
    shutdown_token: CancellationToken,
    task: Option<JoinHandle<eyre::Result<()>>>,
}

impl CelestiaDa {
    /// Spawns the [`CelestiaDa`] service.
    ///
    /// # Errors
    /// Returns an error if the config is invalid, if the Celestia node cannot be reached, or if
    /// the listener cannot be bound.
    #[instrument(skip_all, err)]
    pub async fn spawn(cfg: Config, metrics: &'static Metrics) -> eyre::Result<Self> {
        let namespace = cfg
            .namespace()
            .wrap_err("failed to parse the configured namespace")?;
        let default_gas_price = cfg
            .default_gas_price()
            .wrap_err("failed to parse the configured gas price")?;

        let client = NodeClientBuilder::new(&cfg.celestia_node_endpoint)
            .bearer_token(&cfg.celestia_node_auth_token)
            .request_timeout(cfg.request_timeout())
            .build()
            .wrap_err("failed to construct celestia node client")?;
        check_node_reachable(&client).await.wrap_err_with(|| {
            format!(
                "celestia node at `{}` is not reachable",
                cfg.celestia_node_endpoint
            )
        })?;

        let shutdown_token = CancellationToken::new();
        let adapter = CelestiaAdapter::new(client, namespace, default_gas_price, metrics)
            .with_request_timeout(cfg.request_timeout())
            .with_shutdown_token(shutdown_token.child_token());
        let da: Arc<dyn DataAvailability> = Arc::new(adapter);

        let listener = Listener::bind(cfg.listen_network, &cfg.listen_address)
            .await
            .wrap_err_with(|| {
                format!(
                    "failed to listen on `{}` address `{}`",
                    cfg.listen_network, cfg.listen_address
                )
            })?;
        let local_addr = listener
            .local_addr()
            .wrap_err("failed to read the address of the listener")?;
        info!(
            %local_addr,
            namespace = %telemetry::display::hex(namespace.as_bytes()),
            "serving da requests",
        );

        let (stop_handle, server_handle) = server::shutdown_channel();
        let methods = server::methods(da);
        let task = tokio::spawn(async move {
            server::serve(listener, methods, stop_handle).await;
            Ok(())
        });

        Ok(Self {
            local_addr,
            server_handle,
            shutdown_token,
            task: Some(task),
        })
    }

    /// The address the service is listening on.
    #[must_use]
    pub fn local_addr(&self) -> &ListenAddr {
        &self.local_addr
    }

    /// Stops the server, waiting for in-flight requests to finish.
    ///
    /// Requests still running after [`SHUTDOWN_TIMEOUT`] are cancelled.
    ///
    /// # Errors
    /// Returns an error if the server task failed.
    ///
    /// # Panics
    /// Panics if called twice.
    #[instrument(skip_all, err)]
    pub async fn shutdown(&mut self) -> eyre::Result<()> {
        if self.server_handle.stop().is_err() {
            info!("server was already stopped");
        }
        let mut task = self.task.take().expect("shutdown must not be called twice");
        let res = match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
            Ok(res) => res,
            Err(_) => {
                warn!(
                    timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                    "in-flight requests did not finish in time; cancelling them"
                );
                self.shutdown_token.cancel();
                task.await
            }
        };
        flatten_join_result(res)
    }
}

impl Future for CelestiaDa {
    type Output = eyre::Result<()>;

    fn poll(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Self::Output> {
        use futures::future::FutureExt as _;

        let task = self
            .task
            .as_mut()
            .expect("celestia da must not be polled after shutdown");
        task.poll_unpin(cx).map(flatten_join_result)
    }
}

/// Asks the node for the network head, retrying a few times with backoff.
#[instrument(skip_all, err)]
async fn check_node_reachable(client: &HttpClient) -> Result<(), ClientError> {
    let retry_config = tryhard::RetryFutureConfig::new(NODE_CONNECT_RETRIES)
        .exponential_backoff(Duration::from_millis(100))
        .max_delay(Duration::from_secs(1))
        .on_retry(
            |attempt: u32, next_delay: Option<Duration>, error: &ClientError| {
                warn!(
                    attempt,
                    wait_duration = next_delay.map(tracing::field::debug),
                    error = error as &dyn std::error::Error,
                    "failed to fetch network head from celestia node; retrying after backoff",
                );
                futures::future::ready(())
            },
        );
    let head = tryhard::retry_fn(|| client.header_network_head())
        .with_config(retry_config)
        .await?;
    let height = head
        .pointer("/header/height")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("<unknown>");
    info!(height, "connected to celestia node");
    Ok(())
}

fn flatten_join_result<T>(res: Result<eyre::Result<T>, JoinError>) -> eyre::Result<T> {
    match res {
        Ok(Ok(val)) => Ok(val),
        Ok(Err(err)) => Err(err).wrap_err("task returned with error"),
        Err(err) => Err(err).wrap_err("task panicked"),
    }
}
