//! Storage error types

use crate::schema::Namespace;
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be created or locked within the wait bound
    #[error("failed to open database at '{}': {source}", .path.display())]
    Open {
        /// Store location
        path: PathBuf,
        /// Underlying engine failure
        #[source]
        source: rocksdb::Error,
    },

    /// A namespace of the schema could not be created
    #[error("failed to create '{namespace}' bucket: {source}")]
    SchemaCreation {
        /// Namespace that failed
        namespace: Namespace,
        /// Underlying failure
        #[source]
        source: Box<StorageError>,
    },

    /// Requested namespace does not exist under the root namespace
    #[error("bucket '{0}' not found")]
    NamespaceNotFound(Namespace),

    /// Key does not map to any value
    #[error("associated value for key '{}' not found", String::from_utf8_lossy(.0))]
    ValueNotFound(Vec<u8>),

    /// Bucket names must not be empty
    #[error("bucket name required")]
    BucketNameRequired,

    /// RocksDB error
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Invalid column family
    #[error("invalid column family: {0}")]
    InvalidColumnFamily(String),

    /// Invalid data format
    #[error("invalid data format: {0}")]
    InvalidFormat(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Error for a namespace that cannot be resolved
    pub fn bucket_not_found(namespace: &Namespace) -> Self {
        Self::NamespaceNotFound(namespace.clone())
    }

    /// Error for a key with no associated value
    pub fn value_not_found(key: &[u8]) -> Self {
        Self::ValueNotFound(key.to_vec())
    }

    /// Wrap a failure raised while creating `namespace`
    pub(crate) fn schema_creation(namespace: &Namespace, source: StorageError) -> Self {
        Self::SchemaCreation {
            namespace: namespace.clone(),
            source: Box::new(source),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
