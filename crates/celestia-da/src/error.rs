use std::time::Duration;

use jsonrpsee::core::ClientError;

use crate::{
    celestia::{
        BlobError,
        NamespaceError,
    },
    fee::FeeError,
};

/// The broad class of an [`Error`], used to map failures onto wire error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Encoding,
    NotFound,
    Transport,
    Cancelled,
    DeadlineExceeded,
}

/// Errors returned by data availability operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to encode or decode a data availability object")]
    Encoding(#[from] EncodingError),
    #[error("blob not found in namespace `{namespace}` at height `{height}`")]
    NotFound {
        height: u64,
        namespace: String,
        #[source]
        source: ClientError,
    },
    #[error("`{method}` request to the celestia node failed")]
    Transport {
        method: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("`{method}` was cancelled")]
    Cancelled { method: &'static str },
    #[error("`{method}` did not complete within {timeout:?}")]
    DeadlineExceeded {
        method: &'static str,
        timeout: Duration,
    },
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::NotFound {
                ..
            } => ErrorKind::NotFound,
            Self::Transport {
                ..
            } => ErrorKind::Transport,
            Self::Cancelled {
                ..
            } => ErrorKind::Cancelled,
            Self::DeadlineExceeded {
                ..
            } => ErrorKind::DeadlineExceeded,
        }
    }

    pub(crate) fn from_client(method: &'static str, timeout: Duration, source: ClientError) -> Self {
        if matches!(source, ClientError::RequestTimeout) {
            Self::DeadlineExceeded {
                method,
                timeout,
            }
        } else {
            Self::Transport {
                method,
                source,
            }
        }
    }
}

/// Malformed inputs: ids, namespaces, blobs, proofs, or gas prices.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("invalid namespace")]
    Namespace(#[from] NamespaceError),
    #[error("invalid blob at index `{index}`")]
    Blob {
        index: usize,
        #[source]
        source: BlobError,
    },
    #[error(
        "id of {len} bytes at index `{index}` is malformed; ids are an 8 byte height followed \
         by a commitment"
    )]
    MalformedId { index: usize, len: usize },
    #[error("commitment of {len} bytes at index `{index}` is not 32 bytes long")]
    MalformedCommitment { index: usize, len: usize },
    #[error("failed to decode proof at index `{index}`")]
    MalformedProof {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode proof at index `{index}`")]
    ProofEncoding {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("received {ids} ids but {proofs} proofs")]
    LengthMismatch { ids: usize, proofs: usize },
    #[error("invalid gas price or fee")]
    Fee(#[from] FeeError),
}
