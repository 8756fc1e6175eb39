//! Inclusion proofs as returned by the Celestia node's blob API.
use base64::{
    engine::general_purpose::STANDARD,
    Engine as _,
};
pub use celestia_types::nmt::NamespaceProof;
use serde::{
    Deserialize,
    Serialize,
};

/// The proof that a blob is included at a height: one range proof per row the blob spans.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobProof(pub Vec<NamespaceProof>);

impl BlobProof {
    /// Constructs a single row proof of the shares in `start..end` from its raw tree nodes.
    ///
    /// # Errors
    /// Returns an error if a node is not a namespaced hash of 90 bytes.
    pub fn from_range(start: u64, end: u64, nodes: &[Vec<u8>]) -> Result<Self, serde_json::Error> {
        let nodes: Vec<String> = nodes.iter().map(|node| STANDARD.encode(node)).collect();
        let row = serde_json::json!({
            "start": start,
            "end": end,
            "nodes": nodes,
            "leaf_hash": "",
            "is_max_namespace_id_ignored": true,
        });
        serde_json::from_value(serde_json::Value::Array(vec![row]))
    }

    /// Decodes a proof from the JSON bytes produced by [`BlobProof::to_bytes`].
    ///
    /// # Errors
    /// Returns an error if `bytes` is not a JSON encoded blob proof.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Encodes the proof as JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails, which is not expected for this type.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Whether two proofs have the same encoding.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        matches!(
            (serde_json::to_value(self), serde_json::to_value(other)),
            (Ok(this), Ok(that)) if this == that
        )
    }
}
