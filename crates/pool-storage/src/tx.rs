//! Read-only and read-write transactions

use crate::db::{cf, get_cf, RocksDB};
use crate::error::StorageResult;
use crate::keys::{decode_entry_key, entry_prefix, BucketId};
use crate::traits::{BucketReader, BucketWriter};
use parking_lot::MutexGuard;
use rocksdb::{Direction, IteratorMode, SnapshotWithThreadMode, Transaction};
use tracing::warn;

/// Read-only transaction over a point-in-time snapshot.
///
/// Writes committed after the snapshot was taken are not visible.
pub(crate) struct ReadTx<'a> {
    db: &'a RocksDB,
    snapshot: SnapshotWithThreadMode<'a, RocksDB>,
}

impl<'a> ReadTx<'a> {
    pub(crate) fn new(db: &'a RocksDB) -> Self {
        Self {
            db,
            snapshot: db.snapshot(),
        }
    }

    /// All entries of `bucket` in key order
    pub(crate) fn entries(&self, bucket: BucketId) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = get_cf(self.db, cf::ENTRIES)?;
        let prefix = entry_prefix(bucket);
        let mut entries = Vec::new();

        for item in self
            .snapshot
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, value) = item?;
            match decode_entry_key(bucket, &key) {
                Some(user_key) => entries.push((user_key.to_vec(), value.into_vec())),
                None => break,
            }
        }
        Ok(entries)
    }
}

impl BucketReader for ReadTx<'_> {
    fn get_raw(&self, cf_name: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let cf = get_cf(self.db, cf_name)?;
        Ok(self.snapshot.get_cf(&cf, key)?)
    }
}

/// Read-write transaction. Holds the writer lock until committed or rolled back.
pub(crate) struct WriteTx<'a> {
    db: &'a RocksDB,
    txn: Transaction<'a, RocksDB>,
    _writer: MutexGuard<'a, ()>,
}

impl<'a> WriteTx<'a> {
    pub(crate) fn new(db: &'a RocksDB, writer: MutexGuard<'a, ()>) -> Self {
        Self {
            db,
            txn: db.transaction(),
            _writer: writer,
        }
    }

    /// Make all changes durable
    pub(crate) fn commit(self) -> StorageResult<()> {
        self.txn.commit()?;
        Ok(())
    }

    /// Discard all changes
    pub(crate) fn rollback(self) {
        if let Err(e) = self.txn.rollback() {
            warn!("transaction rollback failed: {}", e);
        }
    }
}

impl BucketReader for WriteTx<'_> {
    fn get_raw(&self, cf_name: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let cf = get_cf(self.db, cf_name)?;
        Ok(self.txn.get_cf(&cf, key)?)
    }
}

impl BucketWriter for WriteTx<'_> {
    fn put_raw(&mut self, cf_name: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let cf = get_cf(self.db, cf_name)?;
        self.txn.put_cf(&cf, key, value)?;
        Ok(())
    }

    fn delete_raw(&mut self, cf_name: &str, key: &[u8]) -> StorageResult<()> {
        let cf = get_cf(self.db, cf_name)?;
        self.txn.delete_cf(&cf, key)?;
        Ok(())
    }
}
