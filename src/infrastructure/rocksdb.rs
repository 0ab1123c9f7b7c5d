use crate::domain::ports::OffsetStore;
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing the last handled offset per party.
pub const CF_OFFSETS: &str = "offsets";

/// A persistent checkpoint store using RocksDB.
///
/// Lets a restarted bridge resume its subscription after the last fully handled transaction
/// instead of replaying the whole ledger (and re-sending every notification).
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBOffsetStore {
    db: Arc<DB>,
}

impl RocksDBOffsetStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_offsets = ColumnFamilyDescriptor::new(CF_OFFSETS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_offsets])
            .map_err(|e| BridgeError::StorageError(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl OffsetStore for RocksDBOffsetStore {
    async fn load(&self, party: &str) -> Result<Option<String>> {
        let cf = self
            .db
            .cf_handle(CF_OFFSETS)
            .ok_or_else(|| BridgeError::StorageError("Offsets column family not found".into()))?;

        let value = self
            .db
            .get_cf(&cf, party.as_bytes())
            .map_err(|e| BridgeError::StorageError(e.to_string()))?;

        value
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|e| BridgeError::StorageError(format!("Corrupt offset: {e}")))
            })
            .transpose()
    }

    async fn commit(&self, party: &str, offset: &str) -> Result<()> {
        let cf = self
            .db
            .cf_handle(CF_OFFSETS)
            .ok_or_else(|| BridgeError::StorageError("Offsets column family not found".into()))?;

        self.db
            .put_cf(&cf, party.as_bytes(), offset.as_bytes())
            .map_err(|e| BridgeError::StorageError(e.to_string()))
    }
}
