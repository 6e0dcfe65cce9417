//! Namespace tree of the mining pool store

use crate::db::Database;
use crate::error::{StorageError, StorageResult};
use crate::keys::BucketId;
use crate::traits::{BucketReader, BucketWriter};
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, info};

/// Current version of the persisted layout
pub const DB_VERSION: u32 = 1;

/// Name of a bucket
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(Cow<'static, [u8]>);

impl Namespace {
    /// Namespace backed by a static name
    pub const fn from_static(name: &'static [u8]) -> Self {
        Namespace(Cow::Borrowed(name))
    }

    /// Raw name bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Namespace {
    fn from(name: Vec<u8>) -> Self {
        Namespace(Cow::Owned(name))
    }
}

impl From<&str> for Namespace {
    fn from(name: &str) -> Self {
        Namespace(Cow::Owned(name.as_bytes().to_vec()))
    }
}

impl AsRef<[u8]> for Namespace {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Bucket names of the mining pool
pub mod ns {
    use super::Namespace;

    /// Main bucket, all other buckets are nested within it
    pub const POOL: Namespace = Namespace::from_static(b"poolbkt");
    /// Registered accounts
    pub const ACCOUNTS: Namespace = Namespace::from_static(b"accountbkt");
    /// Account names mapped to their ids
    pub const NAME_INDEX: Namespace = Namespace::from_static(b"nameidxbkt");
    /// Client shares
    pub const SHARES: Namespace = Namespace::from_static(b"sharebkt");
    /// Work accepted by the network, pruned by chain tip height
    pub const WORK: Namespace = Namespace::from_static(b"workbkt");
    /// Payments
    pub const PAYMENTS: Namespace = Namespace::from_static(b"paymentbkt");
}

/// Key of the version marker inside the root bucket
pub const VERSION_KEY: &[u8] = b"version";

/// Layout of the store: a root bucket, the buckets nested in it and the
/// version stamped on first creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    root: Namespace,
    children: Vec<Namespace>,
    version_key: Cow<'static, [u8]>,
    version: u32,
}

impl Schema {
    /// Create a schema descriptor with the version marker under `VERSION_KEY`
    pub fn new(root: Namespace, children: Vec<Namespace>, version: u32) -> Self {
        Self {
            root,
            children,
            version_key: Cow::Borrowed(VERSION_KEY),
            version,
        }
    }

    /// Keep the version marker under `key` instead
    pub fn with_version_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.version_key = Cow::Owned(key.into());
        self
    }

    /// The mining pool layout
    pub fn mining_pool() -> Self {
        Self::new(
            ns::POOL,
            vec![
                ns::ACCOUNTS,
                ns::SHARES,
                ns::NAME_INDEX,
                ns::WORK,
                ns::PAYMENTS,
            ],
            DB_VERSION,
        )
    }

    /// Root bucket
    pub fn root(&self) -> &Namespace {
        &self.root
    }

    /// Buckets nested in the root
    pub fn children(&self) -> &[Namespace] {
        &self.children
    }

    /// Layout version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Version marker key
    pub fn version_key(&self) -> &[u8] {
        &self.version_key
    }

    /// Encoded version marker value
    pub fn version_bytes(&self) -> [u8; 4] {
        self.version.to_le_bytes()
    }

    /// Check if `namespace` is one of the nested buckets
    pub fn contains(&self, namespace: &Namespace) -> bool {
        self.children.contains(namespace)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::mining_pool()
    }
}

/// Create the bucket tree described by `schema`.
///
/// Runs as one read-write transaction. The root bucket and version marker are
/// written only when the root is missing; nested buckets are created whenever
/// absent, so this is safe to call on every startup.
pub fn ensure_schema(db: &Database, schema: &Schema) -> StorageResult<()> {
    db.update(|tx| {
        let root = match tx.bucket(BucketId::TOP, schema.root().as_bytes())? {
            Some(root) => root,
            None => {
                let root = tx
                    .create_bucket_if_not_exists(BucketId::TOP, schema.root().as_bytes())
                    .map_err(|e| StorageError::schema_creation(schema.root(), e))?;
                tx.put(root, schema.version_key(), &schema.version_bytes())
                    .map_err(|e| StorageError::schema_creation(schema.root(), e))?;
                info!(version = schema.version(), "created '{}' bucket", schema.root());
                root
            }
        };

        for child in schema.children() {
            tx.create_bucket_if_not_exists(root, child.as_bytes())
                .map_err(|e| StorageError::schema_creation(child, e))?;
        }
        debug!(buckets = schema.children().len(), "schema ensured");
        Ok(())
    })
}

/// Read the version marker stamped when the root bucket was created.
///
/// Returns `None` if the root bucket or the marker does not exist.
pub fn read_version(db: &Database, schema: &Schema) -> StorageResult<Option<u32>> {
    db.view(|tx| {
        let Some(root) = tx.bucket(BucketId::TOP, schema.root().as_bytes())? else {
            return Ok(None);
        };
        match tx.get(root, schema.version_key())? {
            Some(raw) => {
                let bytes: [u8; 4] = raw.as_slice().try_into().map_err(|_| {
                    StorageError::InvalidFormat(format!(
                        "version marker must be 4 bytes, got {}",
                        raw.len()
                    ))
                })?;
                Ok(Some(u32::from_le_bytes(bytes)))
            }
            None => Ok(None),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mining_pool_schema() {
        let schema = Schema::mining_pool();
        assert_eq!(schema.root(), &ns::POOL);
        assert_eq!(schema.children().len(), 5);
        assert_eq!(schema.version(), DB_VERSION);
        assert_eq!(schema.version_key(), b"version");
        for child in [ns::ACCOUNTS, ns::NAME_INDEX, ns::SHARES, ns::WORK, ns::PAYMENTS] {
            assert!(schema.contains(&child));
        }
        assert!(!schema.contains(&ns::POOL));
    }

    #[test]
    fn test_version_bytes_little_endian() {
        let schema = Schema::new(ns::POOL, Vec::new(), 0x0102_0304);
        assert_eq!(schema.version_bytes(), [4, 3, 2, 1]);
        assert_eq!(Schema::default().version_bytes(), [1, 0, 0, 0]);
    }

    #[test]
    fn test_namespace_conversions() {
        let owned = Namespace::from("accountbkt");
        assert_eq!(owned, ns::ACCOUNTS);
        assert_eq!(Namespace::from(b"workbkt".to_vec()), ns::WORK);
        assert_eq!(ns::SHARES.to_string(), "sharebkt");
        assert_eq!(ns::PAYMENTS.as_ref(), b"paymentbkt");
    }

    fn open_temp() -> (Database, tempfile::TempDir) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db = Database::open(temp_dir.path()).unwrap();
        (db, temp_dir)
    }

    fn child_ids(db: &Database, schema: &Schema) -> Vec<Option<BucketId>> {
        db.view(|tx| {
            let root = tx.bucket(BucketId::TOP, schema.root().as_bytes())?;
            schema
                .children()
                .iter()
                .map(|child| match root {
                    Some(root) => tx.bucket(root, child.as_bytes()),
                    None => Ok(None),
                })
                .collect()
        })
        .unwrap()
    }

    #[test]
    fn test_fresh_store_has_no_version() {
        let (db, _temp) = open_temp();
        assert_eq!(read_version(&db, &Schema::default()).unwrap(), None);
    }

    #[test]
    fn test_ensure_schema_creates_tree() {
        let (db, _temp) = open_temp();
        let schema = Schema::mining_pool();

        ensure_schema(&db, &schema).unwrap();

        assert_eq!(read_version(&db, &schema).unwrap(), Some(DB_VERSION));
        let ids = child_ids(&db, &schema);
        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(Option::is_some));
    }

    #[test]
    fn test_ensure_schema_idempotent() {
        let (db, _temp) = open_temp();
        let schema = Schema::mining_pool();

        ensure_schema(&db, &schema).unwrap();
        let ids = child_ids(&db, &schema);
        ensure_schema(&db, &schema).unwrap();

        assert_eq!(child_ids(&db, &schema), ids);
        assert_eq!(read_version(&db, &schema).unwrap(), Some(DB_VERSION));
    }

    #[test]
    fn test_version_not_rewritten() {
        let (db, _temp) = open_temp();
        ensure_schema(&db, &Schema::mining_pool()).unwrap();

        // A newer layout on an initialized store keeps the original stamp
        let newer = Schema::new(ns::POOL, Schema::mining_pool().children().to_vec(), 7);
        ensure_schema(&db, &newer).unwrap();
        assert_eq!(read_version(&db, &newer).unwrap(), Some(DB_VERSION));
    }

    #[test]
    fn test_new_child_added_on_existing_root() {
        let (db, _temp) = open_temp();
        ensure_schema(&db, &Schema::mining_pool()).unwrap();

        let mut children = Schema::mining_pool().children().to_vec();
        children.push(Namespace::from("blockbkt"));
        let extended = Schema::new(ns::POOL, children, DB_VERSION);
        ensure_schema(&db, &extended).unwrap();

        let ids = child_ids(&db, &extended);
        assert_eq!(ids.len(), 6);
        assert!(ids.iter().all(Option::is_some));
    }

    #[test]
    fn test_custom_version_key() {
        let (db, _temp) = open_temp();
        let schema = Schema::mining_pool().with_version_key("layout");
        assert_eq!(schema.version_key(), b"layout");

        ensure_schema(&db, &schema).unwrap();
        assert_eq!(read_version(&db, &schema).unwrap(), Some(DB_VERSION));

        // Nothing was stamped under the default key
        assert_eq!(read_version(&db, &Schema::mining_pool()).unwrap(), None);
    }

    #[test]
    fn test_failed_root_writes_nothing() {
        let (db, _temp) = open_temp();
        let broken = Schema::new(
            Namespace::from(Vec::new()),
            Schema::mining_pool().children().to_vec(),
            DB_VERSION,
        );

        match ensure_schema(&db, &broken) {
            Err(StorageError::SchemaCreation { namespace, source }) => {
                assert_eq!(&namespace, broken.root());
                assert!(matches!(*source, StorageError::BucketNameRequired));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert_eq!(read_version(&db, &broken).unwrap(), None);
        let bucket_count = db
            .view(|tx| {
                let mut found = 0;
                for child in broken.children() {
                    if tx.bucket(BucketId::TOP, child.as_bytes())?.is_some() {
                        found += 1;
                    }
                }
                Ok(found)
            })
            .unwrap();
        assert_eq!(bucket_count, 0);
        // The id sequence was rolled back too
        let first = db
            .update(|tx| tx.create_bucket_if_not_exists(BucketId::TOP, b"poolbkt"))
            .unwrap();
        assert_eq!(first, BucketId::FIRST);
    }

    #[test]
    fn test_failed_child_aborts_everything() {
        let (db, _temp) = open_temp();
        let broken = Schema::new(
            ns::POOL,
            vec![ns::ACCOUNTS, Namespace::from(Vec::new())],
            DB_VERSION,
        );

        let result = ensure_schema(&db, &broken);
        match result {
            Err(StorageError::SchemaCreation { namespace, source }) => {
                assert!(namespace.as_bytes().is_empty());
                assert!(matches!(*source, StorageError::BucketNameRequired));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        // Root and version were rolled back along with the children
        assert_eq!(read_version(&db, &broken).unwrap(), None);
    }
}
