//! Blob identifiers.
//!
//! An id is the little endian height a blob was included at, followed by the blob's commitment.
use crate::da::Id;

/// The length of the height prefix of an id.
pub const HEIGHT_LEN: usize = 8;

/// Builds the id of a blob with `commitment` included at `height`.
#[must_use]
pub fn make_id(height: u64, commitment: &[u8]) -> Id {
    let mut id = Vec::with_capacity(HEIGHT_LEN + commitment.len());
    id.extend_from_slice(&height.to_le_bytes());
    id.extend_from_slice(commitment);
    Id(id)
}

/// Splits an id into its height and commitment.
///
/// Ids of [`HEIGHT_LEN`] bytes or fewer carry no commitment and are returned as height `0`
/// with an empty commitment. Callers must treat that as an invalid id.
#[must_use]
pub fn split_id(id: &[u8]) -> (u64, &[u8]) {
    if id.len() <= HEIGHT_LEN {
        return (0, &[]);
    }
    let (height, commitment) = id.split_at(HEIGHT_LEN);
    let mut height_bytes = [0u8; HEIGHT_LEN];
    height_bytes.copy_from_slice(height);
    (u64::from_le_bytes(height_bytes), commitment)
}
