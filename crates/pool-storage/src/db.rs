//! RocksDB wrapper

use crate::error::{StorageError, StorageResult};
use crate::tx::{ReadTx, WriteTx};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, ErrorKind, MultiThreaded, Options, TransactionDB,
    TransactionDBOptions,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Column family names
pub mod cf {
    /// Bucket catalog: parent id ++ name -> bucket id
    pub const BUCKETS: &str = "buckets";
    /// Bucket entries: bucket id ++ key -> value
    pub const ENTRIES: &str = "entries";
    /// Metadata
    pub const META: &str = "meta";
}

/// All column family names
pub const ALL_CFS: &[&str] = &[cf::BUCKETS, cf::ENTRIES, cf::META];

pub(crate) type RocksDB = TransactionDB<MultiThreaded>;

/// Database configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Create database if missing
    pub create_if_missing: bool,
    /// How long to wait for a lock held by another handle
    pub lock_timeout: Duration,
    /// Pause between lock attempts
    pub lock_retry_interval: Duration,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size
    pub write_buffer_size: usize,
    /// Maximum write buffers
    pub max_write_buffer_number: i32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            lock_timeout: Duration::from_secs(1),
            lock_retry_interval: Duration::from_millis(50),
            max_open_files: 512,
            write_buffer_size: 64 * 1024 * 1024, // 64MB
            max_write_buffer_number: 3,
        }
    }
}

/// Exclusive handle on a transactional RocksDB store.
///
/// The lock on the store is held until the handle is closed or dropped.
pub struct Database {
    db: RocksDB,
    writer: Mutex<()>,
    path: PathBuf,
}

impl Database {
    /// Open the database with default config
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_config(path, DbConfig::default())
    }

    /// Open the database with custom config
    pub fn open_with_config(path: impl AsRef<Path>, config: DbConfig) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if config.create_if_missing {
            fs::create_dir_all(&path)?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);

        let txn_opts = TransactionDBOptions::default();
        let deadline = Instant::now() + config.lock_timeout;
        let mut contended = false;

        let db = loop {
            let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
                .iter()
                .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
                .collect();

            match RocksDB::open_cf_descriptors(&opts, &txn_opts, &path, cf_descriptors) {
                Ok(db) => break db,
                Err(e) if is_lock_error(&e) && Instant::now() < deadline => {
                    if !contended {
                        warn!(path = %path.display(), "database locked, waiting: {}", e);
                        contended = true;
                    }
                    thread::sleep(config.lock_retry_interval);
                }
                Err(source) => return Err(StorageError::Open { path, source }),
            }
        };

        info!(path = %path.display(), "database opened");
        Ok(Self {
            db,
            writer: Mutex::new(()),
            path,
        })
    }

    /// Close the database, releasing its lock
    pub fn close(self) {
        info!(path = %self.path.display(), "database closed");
    }

    /// Get database path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin a read-only transaction over a snapshot of the current state
    pub(crate) fn begin_read(&self) -> ReadTx<'_> {
        ReadTx::new(&self.db)
    }

    /// Run `f` in a read-only transaction
    pub(crate) fn view<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&ReadTx<'_>) -> StorageResult<T>,
    {
        let tx = self.begin_read();
        f(&tx)
    }

    /// Run `f` in a read-write transaction.
    ///
    /// Commits if `f` returns `Ok`, rolls back otherwise. Only one read-write
    /// transaction runs at a time.
    pub(crate) fn update<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut WriteTx<'_>) -> StorageResult<T>,
    {
        let guard = self.writer.lock();
        let mut tx = WriteTx::new(&self.db, guard);
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                debug!("rolling back transaction: {}", e);
                tx.rollback();
                Err(e)
            }
        }
    }
}

/// Get column family handle
pub(crate) fn get_cf<'a>(db: &'a RocksDB, name: &str) -> StorageResult<Arc<BoundColumnFamily<'a>>> {
    db.cf_handle(name)
        .ok_or_else(|| StorageError::InvalidColumnFamily(name.to_string()))
}

fn is_lock_error(e: &rocksdb::Error) -> bool {
    e.kind() == ErrorKind::IOError && e.to_string().to_lowercase().contains("lock")
}
