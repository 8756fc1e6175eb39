//! The subset of the Celestia node's JSON-RPC API used for data availability.
//!
//! The trait is generated for both sides: the client is used to talk to a real node, the server
//! is implemented by the in-memory mock node used in tests.
use jsonrpsee::{
    core::RpcResult,
    proc_macros::rpc,
};

use super::{
    BlobProof,
    Namespace,
    ShareCommitment,
    WireBlob,
};
use crate::fee::SubmitOptions;

#[rpc(client, server)]
pub trait BlobApi {
    /// Submits blobs in a single pay-for-blob transaction, returning the inclusion height.
    #[method(name = "blob.Submit")]
    async fn blob_submit(&self, blobs: Vec<WireBlob>, options: SubmitOptions) -> RpcResult<u64>;

    #[method(name = "blob.Get")]
    async fn blob_get(
        &self,
        height: u64,
        namespace: Namespace,
        commitment: ShareCommitment,
    ) -> RpcResult<WireBlob>;

    /// Returns all blobs under the given namespaces at `height`.
    ///
    /// Depending on its version the node answers an empty height with `null` or with a
    /// "blob: not found" error.
    #[method(name = "blob.GetAll")]
    async fn blob_get_all(
        &self,
        height: u64,
        namespaces: Vec<Namespace>,
    ) -> RpcResult<Option<Vec<WireBlob>>>;

    #[method(name = "blob.GetProof")]
    async fn blob_get_proof(
        &self,
        height: u64,
        namespace: Namespace,
        commitment: ShareCommitment,
    ) -> RpcResult<BlobProof>;

    #[method(name = "blob.Included")]
    async fn blob_included(
        &self,
        height: u64,
        namespace: Namespace,
        proof: BlobProof,
        commitment: ShareCommitment,
    ) -> RpcResult<bool>;

    /// Returns the node's view of the network head; only used to check reachability.
    #[method(name = "header.NetworkHead")]
    async fn header_network_head(&self) -> RpcResult<serde_json::Value>;
}
