//! Types and encodings of the Celestia blob API.
pub mod blob;
pub mod namespace;
pub mod proof;
pub mod rpc;

pub use blob::{
    BlobError,
    ShareCommitment,
    ShareVersion,
    WireBlob,
    MAX_BLOB_SIZE,
};
pub use celestia_types::nmt::Namespace;
pub use namespace::NamespaceError;
pub use proof::{
    BlobProof,
    NamespaceProof,
};
pub use rpc::{
    BlobApiClient,
    BlobApiServer,
};
