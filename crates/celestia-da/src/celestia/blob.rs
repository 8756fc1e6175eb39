//! Blobs as submitted to and returned by a Celestia node.
//!
//! Share layout and the share commitment are computed by [`celestia_types::Blob`]. This module
//! only adds the size limits enforced before a blob is handed to the node.
pub use celestia_types::{
    consts::appconsts::{
        CONTINUATION_SPARSE_SHARE_CONTENT_SIZE,
        FIRST_SPARSE_SHARE_CONTENT_SIZE,
        SHARE_SIZE,
    },
    Blob as WireBlob,
    Commitment as ShareCommitment,
};
use celestia_types::nmt::Namespace;

/// The largest blob accepted for submission, in bytes.
///
/// This is the number of bytes that fit into the shares of a 64x64 square after accounting
/// for the pay-for-blob transaction and share headers.
pub const MAX_BLOB_SIZE: usize = 1_842_714;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob data must not be empty")]
    Empty,
    #[error("blob of {size} bytes exceeds the maximum blob size of {MAX_BLOB_SIZE} bytes")]
    TooLarge { size: usize },
    #[error("failed constructing celestia blob")]
    Invalid(#[source] celestia_types::Error),
}

/// The version of the share format a blob is encoded with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShareVersion {
    #[default]
    V0,
}

impl ShareVersion {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::V0 => 0,
        }
    }

    /// Constructs a blob of `data` under `namespace` encoded with this share version.
    ///
    /// # Errors
    /// Returns an error if `data` is empty, larger than [`MAX_BLOB_SIZE`], or rejected by
    /// [`celestia_types::Blob::new`].
    pub fn new_blob(self, namespace: Namespace, data: Vec<u8>) -> Result<WireBlob, BlobError> {
        if data.is_empty() {
            return Err(BlobError::Empty);
        }
        if data.len() > MAX_BLOB_SIZE {
            return Err(BlobError::TooLarge {
                size: data.len(),
            });
        }
        match self {
            Self::V0 => WireBlob::new(namespace, data).map_err(BlobError::Invalid),
        }
    }
}

impl TryFrom<u8> for ShareVersion {
    type Error = u8;

    fn try_from(version: u8) -> Result<Self, Self::Error> {
        match version {
            0 => Ok(Self::V0),
            other => Err(other),
        }
    }
}

/// The number of shares a blob of `len` bytes occupies.
#[must_use]
pub fn shares_needed(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let continuation_bytes = len.saturating_sub(FIRST_SPARSE_SHARE_CONTENT_SIZE);
    1 + continuation_bytes.div_ceil(CONTINUATION_SPARSE_SHARE_CONTENT_SIZE)
}

/// Computes the share commitment of `data` published under `namespace`.
///
/// # Errors
/// Returns an error under the conditions of [`ShareVersion::new_blob`].
pub fn commit(namespace: Namespace, data: &[u8]) -> Result<ShareCommitment, BlobError> {
    ShareVersion::V0
        .new_blob(namespace, data.to_vec())
        .map(|blob| blob.commitment)
}

/// Reads a share commitment from its raw bytes.
///
/// Returns `None` if `bytes` is not exactly 32 bytes long.
#[must_use]
pub fn commitment_from_slice(bytes: &[u8]) -> Option<ShareCommitment> {
    <[u8; 32]>::try_from(bytes).ok().map(ShareCommitment)
}
