//! The JSON-RPC front serving a [`DataAvailability`] implementation to rollup nodes.
//!
//! The server runs its own accept loop so that it can listen on TCP as well as unix domain
//! sockets. Every connection is served with graceful shutdown: once stopped, no new connections
//! are accepted and requests already in flight run to completion.
use std::{
    fmt,
    future::Future,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use jsonrpsee::{
    core::RpcResult,
    proc_macros::rpc,
    server::{
        serve_with_graceful_shutdown,
        stop_channel,
        Server,
        ServerHandle,
        StopHandle,
    },
    types::ErrorObjectOwned,
    Methods,
};
use serde::{
    Deserialize,
    Serialize,
};
use tokio::net::{
    TcpListener,
    UnixListener,
};
use tokio_util::task::TaskTracker;
use tracing::{
    debug,
    info,
    instrument,
    warn,
};

use crate::{
    da::{
        Blob,
        Commitment,
        DataAvailability,
        Id,
        NamespaceBytes,
        Proof,
    },
    error::{
        Error,
        ErrorKind,
    },
};

pub const ENCODING_ERROR_CODE: i32 = 1;
pub const NOT_FOUND_ERROR_CODE: i32 = 2;
pub const TRANSPORT_ERROR_CODE: i32 = 3;
pub const CANCELLED_ERROR_CODE: i32 = 4;
pub const DEADLINE_EXCEEDED_ERROR_CODE: i32 = 5;

/// How long the accept loop pauses after failing to accept a connection.
///
/// Errors like running out of file descriptors persist until connections are closed, so
/// accepting again right away would spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

#[rpc(client, server)]
pub trait DaApi {
    #[method(name = "da.MaxBlobSize")]
    async fn max_blob_size(&self) -> RpcResult<u64>;

    #[method(name = "da.Get")]
    async fn get(&self, ids: Vec<Id>, namespace: Option<NamespaceBytes>) -> RpcResult<Vec<Blob>>;

    #[method(name = "da.GetIDs")]
    async fn get_ids(&self, height: u64, namespace: Option<NamespaceBytes>)
        -> RpcResult<Vec<Id>>;

    #[method(name = "da.GetProofs")]
    async fn get_proofs(
        &self,
        ids: Vec<Id>,
        namespace: Option<NamespaceBytes>,
    ) -> RpcResult<Vec<Proof>>;

    #[method(name = "da.Commit")]
    async fn commit(
        &self,
        blobs: Vec<Blob>,
        namespace: Option<NamespaceBytes>,
    ) -> RpcResult<Vec<Commitment>>;

    #[method(name = "da.Submit")]
    async fn submit(
        &self,
        blobs: Vec<Blob>,
        gas_price: f64,
        namespace: Option<NamespaceBytes>,
    ) -> RpcResult<Vec<Id>>;

    #[method(name = "da.Validate")]
    async fn validate(
        &self,
        ids: Vec<Id>,
        proofs: Vec<Proof>,
        namespace: Option<NamespaceBytes>,
    ) -> RpcResult<Vec<bool>>;
}

/// Serves a [`DataAvailability`] implementation over [`DaApiServer`].
pub struct DaRpc {
    da: Arc<dyn DataAvailability>,
}

impl DaRpc {
    pub fn new(da: Arc<dyn DataAvailability>) -> Self {
        Self {
            da,
        }
    }
}

fn namespace_bytes(namespace: Option<&NamespaceBytes>) -> Option<&[u8]> {
    namespace.map(NamespaceBytes::as_bytes)
}

#[async_trait]
impl DaApiServer for DaRpc {
    async fn max_blob_size(&self) -> RpcResult<u64> {
        self.da.max_blob_size().await.map_err(to_rpc_error)
    }

    async fn get(&self, ids: Vec<Id>, namespace: Option<NamespaceBytes>) -> RpcResult<Vec<Blob>> {
        self.da
            .get(&ids, namespace_bytes(namespace.as_ref()))
            .await
            .map_err(to_rpc_error)
    }

    async fn get_ids(
        &self,
        height: u64,
        namespace: Option<NamespaceBytes>,
    ) -> RpcResult<Vec<Id>> {
        self.da
            .get_ids(height, namespace_bytes(namespace.as_ref()))
            .await
            .map_err(to_rpc_error)
    }

    async fn get_proofs(
        &self,
        ids: Vec<Id>,
        namespace: Option<NamespaceBytes>,
    ) -> RpcResult<Vec<Proof>> {
        self.da
            .get_proofs(&ids, namespace_bytes(namespace.as_ref()))
            .await
            .map_err(to_rpc_error)
    }

    async fn commit(
        &self,
        blobs: Vec<Blob>,
        namespace: Option<NamespaceBytes>,
    ) -> RpcResult<Vec<Commitment>> {
        self.da
            .commit(&blobs, namespace_bytes(namespace.as_ref()))
            .await
            .map_err(to_rpc_error)
    }

    async fn submit(
        &self,
        blobs: Vec<Blob>,
        gas_price: f64,
        namespace: Option<NamespaceBytes>,
    ) -> RpcResult<Vec<Id>> {
        self.da
            .submit(&blobs, gas_price, namespace_bytes(namespace.as_ref()))
            .await
            .map_err(to_rpc_error)
    }

    async fn validate(
        &self,
        ids: Vec<Id>,
        proofs: Vec<Proof>,
        namespace: Option<NamespaceBytes>,
    ) -> RpcResult<Vec<bool>> {
        self.da
            .validate(&ids, &proofs, namespace_bytes(namespace.as_ref()))
            .await
            .map_err(to_rpc_error)
    }
}

/// Converts an adapter error into a JSON-RPC error carrying the full chain of causes.
#[must_use]
pub fn to_rpc_error(error: Error) -> ErrorObjectOwned {
    let code = match error.kind() {
        ErrorKind::Encoding => ENCODING_ERROR_CODE,
        ErrorKind::NotFound => NOT_FOUND_ERROR_CODE,
        ErrorKind::Transport => TRANSPORT_ERROR_CODE,
        ErrorKind::Cancelled => CANCELLED_ERROR_CODE,
        ErrorKind::DeadlineExceeded => DEADLINE_EXCEEDED_ERROR_CODE,
    };
    ErrorObjectOwned::owned(code, display_chain(&error), None::<()>)
}

fn display_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// The socket family the server listens on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenNetwork {
    #[default]
    Tcp,
    Tcp4,
    Tcp6,
    Unix,
    UnixPacket,
}

impl fmt::Display for ListenNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let network = match self {
            Self::Tcp => "tcp",
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
            Self::Unix => "unix",
            Self::UnixPacket => "unixpacket",
        };
        f.write_str(network)
    }
}

/// The address a server is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListenAddr {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => addr.fmt(f),
            Self::Unix(path) => path.display().fmt(f),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("listening on `{network}` sockets is not supported")]
    UnsupportedNetwork { network: ListenNetwork },
    #[error("failed to resolve `{address}`")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{address}` did not resolve to any `{network}` address")]
    NoMatchingAddress {
        address: String,
        network: ListenNetwork,
    },
    #[error("failed to bind `{address}`")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A bound listening socket.
#[derive(Debug)]
pub enum Listener {
    Tcp(TcpListener),
    Unix { listener: UnixListener, path: PathBuf },
}

impl Listener {
    /// Binds `address` in the given network family.
    ///
    /// For the TCP families `address` is a `host:port` pair; for `unix` it is a filesystem path.
    ///
    /// # Errors
    /// Returns an error if the network is not supported, if the address cannot be resolved to
    /// an address of the requested family, or if binding fails.
    pub async fn bind(network: ListenNetwork, address: &str) -> Result<Self, BindError> {
        match network {
            ListenNetwork::Tcp | ListenNetwork::Tcp4 | ListenNetwork::Tcp6 => {
                let candidates = tokio::net::lookup_host(address).await.map_err(|source| {
                    BindError::Resolve {
                        address: address.to_string(),
                        source,
                    }
                })?;
                let addr = candidates
                    .into_iter()
                    .find(|addr| match network {
                        ListenNetwork::Tcp4 => addr.is_ipv4(),
                        ListenNetwork::Tcp6 => addr.is_ipv6(),
                        _ => true,
                    })
                    .ok_or_else(|| BindError::NoMatchingAddress {
                        address: address.to_string(),
                        network,
                    })?;
                let listener = TcpListener::bind(addr).await.map_err(|source| BindError::Bind {
                    address: address.to_string(),
                    source,
                })?;
                Ok(Self::Tcp(listener))
            }
            ListenNetwork::Unix => {
                let listener = UnixListener::bind(address).map_err(|source| BindError::Bind {
                    address: address.to_string(),
                    source,
                })?;
                Ok(Self::Unix {
                    listener,
                    path: PathBuf::from(address),
                })
            }
            ListenNetwork::UnixPacket => Err(BindError::UnsupportedNetwork {
                network,
            }),
        }
    }

    /// The address the listener is bound to.
    ///
    /// # Errors
    /// Returns an error if the operating system cannot report the local address.
    pub fn local_addr(&self) -> std::io::Result<ListenAddr> {
        match self {
            Self::Tcp(listener) => listener.local_addr().map(ListenAddr::Tcp),
            Self::Unix {
                path, ..
            } => Ok(ListenAddr::Unix(path.clone())),
        }
    }
}

/// Builds the JSON-RPC methods serving `da`.
#[must_use]
pub fn methods(da: Arc<dyn DataAvailability>) -> Methods {
    DaRpc::new(da).into_rpc().into()
}

/// Creates a pair of handles: the server runs until [`ServerHandle::stop`] is called.
#[must_use]
pub fn shutdown_channel() -> (StopHandle, ServerHandle) {
    stop_channel()
}

/// Accepts connections on `listener` until `stop_handle` fires, then waits for all open
/// connections to finish their in-flight requests.
#[instrument(skip_all)]
pub async fn serve(listener: Listener, methods: Methods, stop_handle: StopHandle) {
    let service_builder = Server::builder().to_service_builder();
    let connections = TaskTracker::new();

    loop {
        let stopped = stop_handle.clone().shutdown();
        tokio::select! {
            biased;

            () = stopped => {
                info!("stop signal received; no longer accepting connections");
                break;
            }

            connection = next_connection(|| accept(&listener)) => {
                let service = service_builder
                    .clone()
                    .build(methods.clone(), stop_handle.clone());
                let stopped = stop_handle.clone().shutdown();
                match connection {
                    Connection::Tcp(stream) => connections.spawn(async move {
                        log_connection_result(
                            serve_with_graceful_shutdown(stream, service, stopped).await,
                        );
                    }),
                    Connection::Unix(stream) => connections.spawn(async move {
                        log_connection_result(
                            serve_with_graceful_shutdown(stream, service, stopped).await,
                        );
                    }),
                };
            }
        }
    }

    connections.close();
    debug!(
        open_connections = connections.len(),
        "waiting for open connections to finish"
    );
    connections.wait().await;

    if let Listener::Unix {
        path, ..
    } = &listener
    {
        if let Err(error) = std::fs::remove_file(path) {
            warn!(%error, path = %path.display(), "failed to remove unix socket");
        }
    }
    info!("server stopped");
}

enum Connection {
    Tcp(tokio::net::TcpStream),
    Unix(tokio::net::UnixStream),
}

/// Calls `accept` until it yields a connection, pausing for [`ACCEPT_ERROR_BACKOFF`] after
/// every failure.
async fn next_connection<F, Fut, T>(mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(connection) => return connection,
            Err(error) => {
                warn!(
                    %error,
                    backoff_ms = ACCEPT_ERROR_BACKOFF.as_millis(),
                    "failed to accept connection; pausing before accepting again",
                );
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

async fn accept(listener: &Listener) -> std::io::Result<Connection> {
    match listener {
        Listener::Tcp(listener) => {
            let (stream, _) = listener.accept().await?;
            Ok(Connection::Tcp(stream))
        }
        Listener::Unix {
            listener, ..
        } => {
            let (stream, _) = listener.accept().await?;
            Ok(Connection::Unix(stream))
        }
    }
}

fn log_connection_result<E: fmt::Display>(result: Result<(), E>) {
    if let Err(error) = result {
        debug!(%error, "connection closed with error");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::Mutex,
    };

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn failed_accepts_are_retried_after_a_pause() {
        let attempts = Mutex::new(Vec::new());
        let start = Instant::now();

        let connection = next_connection(|| {
            let attempt = {
                let mut attempts = attempts.lock().unwrap();
                attempts.push(start.elapsed());
                attempts.len()
            };
            async move {
                if attempt < 3 {
                    Err(io::Error::new(io::ErrorKind::Other, "too many open files"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(3, connection);
        let attempts = attempts.into_inner().unwrap();
        assert_eq!(
            vec![
                Duration::ZERO,
                ACCEPT_ERROR_BACKOFF,
                ACCEPT_ERROR_BACKOFF * 2
            ],
            attempts,
        );
    }
}
