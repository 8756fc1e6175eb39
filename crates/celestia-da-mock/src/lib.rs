//! An in-memory stand-in for the blob and header APIs of a Celestia node.
//!
//! Blobs submitted to [`MockCelestiaNode`] are included at a new height each. The mock hands out
//! a single row proof per blob whose only node binds the blob's namespace to its commitment, and
//! accepts exactly that proof for inclusion.
use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

use celestia_da::{
    celestia::{
        blob,
        BlobApiServer,
        BlobProof,
        Namespace,
        ShareCommitment,
        WireBlob,
    },
    fee::SubmitOptions,
};
use jsonrpsee::{
    core::{
        async_trait,
        RpcResult,
    },
    server::{
        Server,
        ServerHandle,
    },
    types::ErrorObjectOwned,
};
use tracing::debug;

const BLOB_NOT_FOUND: &str = "blob: not found";
const INVALID_PROOF: &str = "blob: invalid proof";
const INVALID_BLOB: &str = "blob: invalid commitment";

// Mirrors the error code the node uses for errors returned from its modules.
const NODE_ERROR_CODE: i32 = 1;

/// A `blob.Submit` call as seen by the mock.
#[derive(Clone, Debug)]
pub struct Submission {
    pub height: u64,
    pub blobs: Vec<WireBlob>,
    pub options: SubmitOptions,
}

#[derive(Default)]
struct State {
    height: u64,
    blobs: BTreeMap<u64, Vec<WireBlob>>,
    submissions: Vec<Submission>,
}

impl State {
    fn find(
        &self,
        height: u64,
        namespace: Namespace,
        commitment: ShareCommitment,
    ) -> Option<&WireBlob> {
        self.blobs.get(&height)?.iter().find(|blob| {
            blob.namespace == namespace && blob.commitment == commitment
        })
    }
}

struct BlobApiImpl {
    state: Arc<Mutex<State>>,
    response_delay: Duration,
}

impl BlobApiImpl {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn delay(&self) {
        if !self.response_delay.is_zero() {
            tokio::time::sleep(self.response_delay).await;
        }
    }
}

fn node_error(message: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(NODE_ERROR_CODE, message.to_string(), None::<()>)
}

/// The proof the mock hands out for `blob`, binding its namespace to its commitment.
fn proof_for(blob: &WireBlob) -> Result<BlobProof, ErrorObjectOwned> {
    let mut node = Vec::with_capacity(90);
    node.extend_from_slice(blob.namespace.as_bytes());
    node.extend_from_slice(blob.namespace.as_bytes());
    node.extend_from_slice(&blob.commitment.0);
    let end = blob::shares_needed(blob.data.len()) as u64;
    BlobProof::from_range(0, end, &[node]).map_err(|error| node_error(&error.to_string()))
}

#[async_trait]
impl BlobApiServer for BlobApiImpl {
    async fn blob_submit(&self, blobs: Vec<WireBlob>, options: SubmitOptions) -> RpcResult<u64> {
        self.delay().await;
        for blob in &blobs {
            let expected = blob::commit(blob.namespace, &blob.data)
                .map_err(|error| node_error(&error.to_string()))?;
            if expected != blob.commitment {
                return Err(node_error(INVALID_BLOB));
            }
        }
        let mut state = self.state();
        state.height += 1;
        let height = state.height;
        debug!(height, blob_count = blobs.len(), "including blobs");
        state.blobs.insert(height, blobs.clone());
        state.submissions.push(Submission {
            height,
            blobs,
            options,
        });
        Ok(height)
    }

    async fn blob_get(
        &self,
        height: u64,
        namespace: Namespace,
        commitment: ShareCommitment,
    ) -> RpcResult<WireBlob> {
        self.delay().await;
        self.state()
            .find(height, namespace, commitment)
            .cloned()
            .ok_or_else(|| node_error(&format!("getting blob: {BLOB_NOT_FOUND}")))
    }

    async fn blob_get_all(
        &self,
        height: u64,
        namespaces: Vec<Namespace>,
    ) -> RpcResult<Option<Vec<WireBlob>>> {
        self.delay().await;
        let state = self.state();
        let blobs: Vec<_> = state
            .blobs
            .get(&height)
            .into_iter()
            .flatten()
            .filter(|blob| namespaces.contains(&blob.namespace))
            .cloned()
            .collect();
        if blobs.is_empty() {
            return Ok(None);
        }
        Ok(Some(blobs))
    }

    async fn blob_get_proof(
        &self,
        height: u64,
        namespace: Namespace,
        commitment: ShareCommitment,
    ) -> RpcResult<BlobProof> {
        self.delay().await;
        let state = self.state();
        let blob = state
            .find(height, namespace, commitment)
            .ok_or_else(|| node_error(&format!("getting proof: {BLOB_NOT_FOUND}")))?;
        proof_for(blob)
    }

    async fn blob_included(
        &self,
        height: u64,
        namespace: Namespace,
        proof: BlobProof,
        commitment: ShareCommitment,
    ) -> RpcResult<bool> {
        self.delay().await;
        let state = self.state();
        let blob = state
            .find(height, namespace, commitment)
            .ok_or_else(|| node_error(&format!("checking inclusion: {BLOB_NOT_FOUND}")))?;
        if proof.same_as(&proof_for(blob)?) {
            Ok(true)
        } else {
            Err(node_error(INVALID_PROOF))
        }
    }

    async fn header_network_head(&self) -> RpcResult<serde_json::Value> {
        let height = self.state().height;
        Ok(serde_json::json!({
            "header": {
                "height": height.to_string(),
            },
        }))
    }
}

/// A running mock node, stopped when dropped.
pub struct MockCelestiaNode {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    server_handle: ServerHandle,
}

impl MockCelestiaNode {
    /// Starts a mock node on a random local port.
    ///
    /// # Errors
    /// Returns an error if the server cannot be started.
    pub async fn spawn() -> eyre::Result<Self> {
        Self::spawn_with_response_delay("127.0.0.1:0", Duration::ZERO).await
    }

    /// Starts a mock node on `addr` which waits `response_delay` before answering any `blob.*`
    /// request.
    ///
    /// # Errors
    /// Returns an error if the server cannot be started.
    pub async fn spawn_with_response_delay(
        addr: &str,
        response_delay: Duration,
    ) -> eyre::Result<Self> {
        let server = Server::builder().build(addr).await?;
        let addr = server.local_addr()?;
        let state = Arc::new(Mutex::new(State::default()));
        let rpc = BlobApiImpl {
            state: state.clone(),
            response_delay,
        }
        .into_rpc();
        let server_handle = server.start(rpc);
        Ok(Self {
            addr,
            state,
            server_handle,
        })
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The endpoint to configure a node client with.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// All `blob.Submit` calls the mock accepted, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<Submission> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .submissions
            .clone()
    }

    /// Waits for the server to stop after [`MockCelestiaNode::stop`].
    pub async fn stopped(self) {
        self.server_handle.clone().stopped().await;
    }

    pub fn stop(&self) {
        let _ = self.server_handle.stop();
    }
}

impl Drop for MockCelestiaNode {
    fn drop(&mut self) {
        let _ = self.server_handle.stop();
    }
}
