//! Bucket access traits shared by read-only and read-write transactions

use crate::db::cf;
use crate::error::{StorageError, StorageResult};
use crate::keys::{bucket_key, entry_key, BucketId, NEXT_BUCKET_ID_KEY};
use tracing::debug;

/// Read access to buckets and their entries
pub(crate) trait BucketReader {
    /// Raw get from a column family
    fn get_raw(&self, cf_name: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Resolve bucket `name` under `parent`
    fn bucket(&self, parent: BucketId, name: &[u8]) -> StorageResult<Option<BucketId>> {
        match self.get_raw(cf::BUCKETS, &bucket_key(parent, name))? {
            Some(raw) => Ok(Some(BucketId::from_bytes(&raw)?)),
            None => Ok(None),
        }
    }

    /// Get the value of `key` in `bucket`
    fn get(&self, bucket: BucketId, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.get_raw(cf::ENTRIES, &entry_key(bucket, key))
    }
}

/// Write access to buckets and their entries
pub(crate) trait BucketWriter: BucketReader {
    /// Raw put into a column family
    fn put_raw(&mut self, cf_name: &str, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Raw delete from a column family
    fn delete_raw(&mut self, cf_name: &str, key: &[u8]) -> StorageResult<()>;

    /// Create bucket `name` under `parent` unless it already exists
    fn create_bucket_if_not_exists(&mut self, parent: BucketId, name: &[u8]) -> StorageResult<BucketId> {
        if name.is_empty() {
            return Err(StorageError::BucketNameRequired);
        }
        if let Some(existing) = self.bucket(parent, name)? {
            return Ok(existing);
        }

        let id = self.allocate_bucket_id()?;
        self.put_raw(cf::BUCKETS, &bucket_key(parent, name), &id.to_bytes())?;
        debug!(
            parent = parent.as_u64(),
            id = id.as_u64(),
            "created bucket '{}'",
            String::from_utf8_lossy(name)
        );
        Ok(id)
    }

    /// Take the next bucket id from the sequence
    fn allocate_bucket_id(&mut self) -> StorageResult<BucketId> {
        let id = match self.get_raw(cf::META, NEXT_BUCKET_ID_KEY)? {
            Some(raw) => BucketId::from_bytes(&raw)?,
            None => BucketId::FIRST,
        };
        self.put_raw(cf::META, NEXT_BUCKET_ID_KEY, &id.successor()?.to_bytes())?;
        Ok(id)
    }

    /// Insert or overwrite `key` in `bucket`
    fn put(&mut self, bucket: BucketId, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.put_raw(cf::ENTRIES, &entry_key(bucket, key), value)
    }

    /// Remove `key` from `bucket`; absent keys are a no-op
    fn delete(&mut self, bucket: BucketId, key: &[u8]) -> StorageResult<()> {
        self.delete_raw(cf::ENTRIES, &entry_key(bucket, key))
    }
}
