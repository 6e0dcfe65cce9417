//! # pool-storage
//!
//! Storage layer for the mining pool using RocksDB.
//!
//! This crate provides:
//! - Exclusive, lock-waiting store handle
//! - Nested buckets on top of RocksDB column families
//! - Versioned bucket layout (accounts, name index, shares, work, payments)
//! - Namespace-scoped get/put/delete, each in its own transaction
//!
//! ```no_run
//! use pool_storage::{ns, PoolStore};
//!
//! # fn main() -> pool_storage::StorageResult<()> {
//! let store = PoolStore::open("/var/lib/pool/db")?;
//! store.ensure_schema()?;
//! store.put(&ns::ACCOUNTS, b"acct1", b"balance:0")?;
//! assert_eq!(store.get(&ns::ACCOUNTS, b"acct1")?, Some(b"balance:0".to_vec()));
//! store.close();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod db;
pub mod error;
pub mod keys;
pub mod pool;
pub mod schema;
mod traits;
mod tx;

pub use db::{Database, DbConfig};
pub use error::{StorageError, StorageResult};
pub use pool::PoolStore;
pub use schema::{ensure_schema, ns, read_version, Namespace, Schema, DB_VERSION, VERSION_KEY};
