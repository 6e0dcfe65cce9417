//! Namespace-scoped access to the mining pool store

use crate::db::{Database, DbConfig};
use crate::error::{StorageError, StorageResult};
use crate::keys::BucketId;
use crate::schema::{self, Namespace, Schema};
use crate::traits::{BucketReader, BucketWriter};
use std::path::Path;

/// Mining pool store: a database handle bound to its bucket layout.
///
/// Every read, write and delete runs in its own transaction and addresses a
/// bucket nested under the schema's root bucket.
pub struct PoolStore {
    db: Database,
    schema: Schema,
}

impl PoolStore {
    /// Open the store at `path` with the default config and mining pool layout
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_config(path, DbConfig::default(), Schema::mining_pool())
    }

    /// Open the store with a custom config and layout
    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: DbConfig,
        schema: Schema,
    ) -> StorageResult<Self> {
        let db = Database::open_with_config(path, config)?;
        Ok(Self::new(db, schema))
    }

    /// Bind an open database to a layout
    pub fn new(db: Database, schema: Schema) -> Self {
        Self { db, schema }
    }

    /// Create any missing buckets of the layout
    pub fn ensure_schema(&self) -> StorageResult<()> {
        schema::ensure_schema(&self.db, &self.schema)
    }

    /// Version stamped when the store was first initialized.
    ///
    /// Not compared against the layout's own version.
    pub fn schema_version(&self) -> StorageResult<Option<u32>> {
        schema::read_version(&self.db, &self.schema)
    }

    /// Get the value of `key`, `None` if the key is absent
    pub fn get(&self, namespace: &Namespace, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.db.view(|tx| {
            let bucket = self.resolve(tx, namespace)?;
            tx.get(bucket, key)
        })
    }

    /// Get the value of `key`, failing with `ValueNotFound` if absent
    pub fn fetch(&self, namespace: &Namespace, key: &[u8]) -> StorageResult<Vec<u8>> {
        self.get(namespace, key)?
            .ok_or_else(|| StorageError::value_not_found(key))
    }

    /// Check if `key` has a value
    pub fn contains(&self, namespace: &Namespace, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(namespace, key)?.is_some())
    }

    /// All entries of a namespace in key order, read from one snapshot
    pub fn entries(&self, namespace: &Namespace) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.db.view(|tx| {
            let bucket = self.resolve(tx, namespace)?;
            tx.entries(bucket)
        })
    }

    /// Insert or overwrite `key`
    pub fn put(&self, namespace: &Namespace, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.db.update(|tx| {
            let bucket = self.resolve(&*tx, namespace)?;
            tx.put(bucket, key, value)
        })
    }

    /// Remove `key`; absent keys are not an error
    pub fn delete(&self, namespace: &Namespace, key: &[u8]) -> StorageResult<()> {
        self.db.update(|tx| {
            let bucket = self.resolve(&*tx, namespace)?;
            tx.delete(bucket, key)
        })
    }

    /// Bucket layout
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get database path
    pub fn path(&self) -> &Path {
        self.db.path()
    }

    /// Close the store, releasing its lock
    pub fn close(self) {
        self.db.close();
    }

    /// Resolve the root bucket, then `namespace` under it
    fn resolve<R: BucketReader>(&self, tx: &R, namespace: &Namespace) -> StorageResult<BucketId> {
        let root = tx
            .bucket(BucketId::TOP, self.schema.root().as_bytes())?
            .ok_or_else(|| StorageError::bucket_not_found(namespace))?;
        tx.bucket(root, namespace.as_bytes())?
            .ok_or_else(|| StorageError::bucket_not_found(namespace))
    }
}
