//! The generic data availability interface served to rollup nodes.
use async_trait::async_trait;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::Error,
    serde::Base64Standard,
};

macro_rules! bytes_newtype {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(#[serde(with = "Base64Standard")] pub Vec<u8>);

        impl $name {
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }
        }

        impl From<&[u8]> for $name {
            fn from(bytes: &[u8]) -> Self {
                Self(bytes.to_vec())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

bytes_newtype!(
    /// An opaque payload stored on the data availability layer.
    Blob
);
bytes_newtype!(
    /// Identifies a blob: its inclusion height followed by its commitment.
    Id
);
bytes_newtype!(Commitment);
bytes_newtype!(
    /// A serialized inclusion proof.
    Proof
);
bytes_newtype!(
    /// The raw bytes of a namespace passed by a caller to override the configured default.
    NamespaceBytes
);

/// A data availability layer.
///
/// Every operation takes an optional namespace that overrides the implementation's default for
/// that call only. Batch operations return results in input order and fail as a whole if any
/// single item fails.
#[async_trait]
pub trait DataAvailability: Send + Sync {
    /// The largest blob in bytes that can be submitted.
    async fn max_blob_size(&self) -> Result<u64, Error>;

    async fn get(&self, ids: &[Id], namespace: Option<&[u8]>) -> Result<Vec<Blob>, Error>;

    /// Returns the ids of all blobs at `height`; a height without blobs yields no ids.
    async fn get_ids(&self, height: u64, namespace: Option<&[u8]>) -> Result<Vec<Id>, Error>;

    async fn get_proofs(&self, ids: &[Id], namespace: Option<&[u8]>)
        -> Result<Vec<Proof>, Error>;

    /// Computes the commitments of `blobs` without submitting them.
    async fn commit(
        &self,
        blobs: &[Blob],
        namespace: Option<&[u8]>,
    ) -> Result<Vec<Commitment>, Error>;

    /// Submits `blobs` atomically, returning one id per blob.
    ///
    /// A negative `gas_price` leaves the price to the implementation's default.
    async fn submit(
        &self,
        blobs: &[Blob],
        gas_price: f64,
        namespace: Option<&[u8]>,
    ) -> Result<Vec<Id>, Error>;

    /// Checks each proof against the id at the same position.
    async fn validate(
        &self,
        ids: &[Id],
        proofs: &[Proof],
        namespace: Option<&[u8]>,
    ) -> Result<Vec<bool>, Error>;
}
