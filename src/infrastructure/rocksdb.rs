use crate::domain::ports::PreferenceStore;
use crate::domain::preferences::{
    KEY_IS_SUBSCRIPTION_PURCHASE, KEY_PRODUCT_ID, KEY_PURCHASE_EXPIRY, KEY_PURCHASE_TOKEN,
    KEY_SERVER_REGION, StoredPreferences,
};
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family holding one entry per preference key.
pub const CF_PREFERENCES: &str = "preferences";

impl From<rocksdb::Error> for ProvisionError {
    fn from(e: rocksdb::Error) -> Self {
        ProvisionError::Storage(e.to_string())
    }
}

/// A persistent preference store backed by RocksDB.
///
/// Each preference lives under its own key with a JSON-encoded value, so the
/// on-disk layout matches the key-value shape of platform preference stores.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbPreferenceStore {
    db: Arc<DB>,
}

impl RocksDbPreferenceStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "preferences" column family exists. Keys that were
    /// never written load as their defaults.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the preferences will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_PREFERENCES, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_PREFERENCES)
            .ok_or_else(|| ProvisionError::Storage("Preferences column family not found".into()))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.db.get_cf(self.cf()?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, batch: &mut WriteBatch, key: &str, value: &T) -> Result<()> {
        batch.put_cf(self.cf()?, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn write_purchase(&self, batch: &mut WriteBatch, prefs: &StoredPreferences) -> Result<()> {
        self.put(batch, KEY_PURCHASE_TOKEN, &prefs.purchase_token)?;
        self.put(batch, KEY_PRODUCT_ID, &prefs.product_id)?;
        self.put(batch, KEY_PURCHASE_EXPIRY, &prefs.purchase_expiry)?;
        self.put(batch, KEY_IS_SUBSCRIPTION_PURCHASE, &prefs.is_subscription_purchase)
    }
}

#[async_trait]
impl PreferenceStore for RocksDbPreferenceStore {
    async fn load(&self) -> Result<StoredPreferences> {
        let defaults = StoredPreferences::default();
        Ok(StoredPreferences {
            purchase_token: self
                .read(KEY_PURCHASE_TOKEN)?
                .unwrap_or(defaults.purchase_token),
            product_id: self.read(KEY_PRODUCT_ID)?.unwrap_or(defaults.product_id),
            purchase_expiry: self
                .read(KEY_PURCHASE_EXPIRY)?
                .unwrap_or(defaults.purchase_expiry),
            is_subscription_purchase: self
                .read(KEY_IS_SUBSCRIPTION_PURCHASE)?
                .unwrap_or(defaults.is_subscription_purchase),
            server_region: self
                .read(KEY_SERVER_REGION)?
                .unwrap_or(defaults.server_region),
        })
    }

    async fn save(&self, prefs: StoredPreferences) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.write_purchase(&mut batch, &prefs)?;
        self.put(&mut batch, KEY_SERVER_REGION, &prefs.server_region)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn set_server_region(&self, region: &str) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.put(&mut batch, KEY_SERVER_REGION, &region)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn reset_purchase(&self) -> Result<()> {
        let mut cleared = StoredPreferences::default();
        cleared.reset_purchase();
        let mut batch = WriteBatch::default();
        self.write_purchase(&mut batch, &cleared)?;
        self.db.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::preferences::AUTOMATIC_REGION;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbPreferenceStore::open(dir.path()).expect("Failed to open RocksDB");
        assert!(store.db.cf_handle(CF_PREFERENCES).is_some());
        assert_eq!(store.load().await.unwrap(), StoredPreferences::default());
    }

    #[tokio::test]
    async fn test_rocksdb_preferences_survive_reopen() {
        let dir = tempdir().unwrap();
        let prefs = StoredPreferences {
            purchase_token: "token".into(),
            product_id: "monthly".into(),
            purchase_expiry: 99,
            is_subscription_purchase: true,
            server_region: AUTOMATIC_REGION.into(),
        };
        {
            let store = RocksDbPreferenceStore::open(dir.path()).unwrap();
            store.save(prefs.clone()).await.unwrap();
            store.set_server_region("eu-west").await.unwrap();
        }

        let store = RocksDbPreferenceStore::open(dir.path()).unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.purchase_token, "token");
        assert_eq!(loaded.server_region, "eu-west");

        store.reset_purchase().await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.purchase_token, "");
        assert_eq!(loaded.purchase_expiry, 0);
        assert!(!loaded.is_subscription_purchase);
        assert_eq!(loaded.server_region, "eu-west");
    }
}
