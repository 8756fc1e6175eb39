//! Validation of the namespaces blobs are published under.
//!
//! Blobs may only be published under version 0 namespaces that are not reserved for protocol
//! use. The namespace type itself is [`celestia_types::nmt::Namespace`].
use celestia_types::nmt::{
    Namespace,
    NS_ID_SIZE,
    NS_ID_V0_SIZE,
};

#[derive(Debug, thiserror::Error)]
pub enum NamespaceError {
    #[error(
        "a user namespace id must be between 1 and {NS_ID_V0_SIZE} bytes, but got {actual} bytes"
    )]
    InvalidIdLength { actual: usize },
    #[error("namespace version `{0}` is not supported for blobs; only version 0 is")]
    UnsupportedVersion(u8),
    #[error("namespace is reserved for protocol use")]
    Reserved,
    #[error("namespace id is not valid hex")]
    Hex(#[source] hex::FromHexError),
    #[error("bytes are not a valid celestia namespace")]
    Invalid(#[source] celestia_types::Error),
}

/// Constructs a version 0 namespace from up to 10 user bytes, left padding them with zeros.
///
/// # Errors
/// Returns an error if `id` is empty, longer than 10 bytes, or if the resulting namespace is
/// reserved.
pub fn new_v0(id: &[u8]) -> Result<Namespace, NamespaceError> {
    if id.is_empty() || id.len() > NS_ID_V0_SIZE {
        return Err(NamespaceError::InvalidIdLength {
            actual: id.len(),
        });
    }
    Namespace::new_v0(id)
        .map_err(NamespaceError::Invalid)
        .and_then(ensure_user_namespace)
}

/// Constructs a namespace from its hex encoded user bytes.
///
/// # Errors
/// Returns an error if `id` is not hex, or under the conditions of [`new_v0`].
pub fn from_hex_id(id: &str) -> Result<Namespace, NamespaceError> {
    let id = hex::decode(id).map_err(NamespaceError::Hex)?;
    new_v0(&id)
}

/// Validates the 29 raw bytes of a namespace passed in by a caller.
///
/// # Errors
/// Returns an error if `bytes` is not a namespace, is not version 0, or is reserved.
pub fn from_raw(bytes: &[u8]) -> Result<Namespace, NamespaceError> {
    Namespace::from_raw(bytes)
        .map_err(NamespaceError::Invalid)
        .and_then(ensure_user_namespace)
}

fn ensure_user_namespace(namespace: Namespace) -> Result<Namespace, NamespaceError> {
    let bytes = namespace.as_bytes();
    if bytes[0] != 0 {
        return Err(NamespaceError::UnsupportedVersion(bytes[0]));
    }
    // Primary reserved namespaces only differ in the last byte of their id.
    if bytes[1..NS_ID_SIZE].iter().all(|byte| *byte == 0) {
        return Err(NamespaceError::Reserved);
    }
    Ok(namespace)
}
