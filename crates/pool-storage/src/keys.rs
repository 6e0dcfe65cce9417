//! Physical key layout for nested buckets.
//!
//! RocksDB only offers flat column families, so the bucket tree is expressed
//! with numeric bucket ids:
//!
//! - `buckets` maps `parent_id ++ name` to the child's id
//! - `entries` maps `bucket_id ++ key` to the stored value
//! - `meta` holds the bucket id sequence
//!
//! Ids are fixed-width big-endian, so every bucket's entries form one
//! contiguous, prefix-addressable range.

use crate::error::{StorageError, StorageResult};

/// Width of an encoded bucket id
pub const BUCKET_ID_LEN: usize = 8;

/// Meta key holding the next unassigned bucket id
pub const NEXT_BUCKET_ID_KEY: &[u8] = b"next_bucket_id";

/// Identifier of a bucket inside the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketId(u64);

impl BucketId {
    /// Pseudo-bucket that parents every top-level bucket
    pub const TOP: BucketId = BucketId(0);

    /// First id handed out to a real bucket
    pub const FIRST: BucketId = BucketId(1);

    /// Raw id value
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// The id following this one
    pub fn successor(self) -> StorageResult<BucketId> {
        self.0
            .checked_add(1)
            .map(BucketId)
            .ok_or_else(|| StorageError::InvalidFormat("bucket id overflow".into()))
    }

    /// Encode as big-endian bytes
    pub fn to_bytes(self) -> [u8; BUCKET_ID_LEN] {
        self.0.to_be_bytes()
    }

    /// Decode from big-endian bytes
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        let raw: [u8; BUCKET_ID_LEN] = bytes.try_into().map_err(|_| {
            StorageError::InvalidFormat(format!(
                "bucket id must be {} bytes, got {}",
                BUCKET_ID_LEN,
                bytes.len()
            ))
        })?;
        Ok(BucketId(u64::from_be_bytes(raw)))
    }
}

impl From<u64> for BucketId {
    fn from(id: u64) -> Self {
        BucketId(id)
    }
}

/// Catalog key of bucket `name` under `parent`
pub fn bucket_key(parent: BucketId, name: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(BUCKET_ID_LEN + name.len());
    key.extend_from_slice(&parent.to_bytes());
    key.extend_from_slice(name);
    key
}

/// Physical key of `key` inside `bucket`
pub fn entry_key(bucket: BucketId, key: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(BUCKET_ID_LEN + key.len());
    encoded.extend_from_slice(&bucket.to_bytes());
    encoded.extend_from_slice(key);
    encoded
}

/// Prefix shared by every entry of `bucket`
pub fn entry_prefix(bucket: BucketId) -> [u8; BUCKET_ID_LEN] {
    bucket.to_bytes()
}

/// Strip the bucket prefix from a physical entry key.
///
/// Returns `None` if the key does not belong to `bucket`.
pub fn decode_entry_key(bucket: BucketId, encoded: &[u8]) -> Option<&[u8]> {
    encoded.strip_prefix(entry_prefix(bucket).as_slice())
}
