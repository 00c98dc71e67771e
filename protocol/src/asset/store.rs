//! # Persistent Asset Store
//!
//! A sled-backed [`AssetResolver`]. Two trees:
//!
//! | Tree            | Key              | Value             |
//! |-----------------|------------------|-------------------|
//! | `assets`        | asset ID (UTF-8) | `bincode(Asset)`  |
//! | `asset_aliases` | alias (UTF-8)    | asset ID (UTF-8)  |
//!
//! Registration writes both trees in one sled transaction, so an alias can
//! never point at an asset that was not stored. A record that fails to
//! decode is reported as [`StoreError::Corrupt`], never as "not found".

use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tracing::debug;

use super::registry::{AssetResolver, StoreError};
use super::{Asset, AssetId};

/// Persistent asset registry on sled.
///
/// sled trees are safe for concurrent readers, so one store can be shared
/// by every concurrent build through an `Arc`.
#[derive(Debug, Clone)]
pub struct SledAssetStore {
    db: Db,
    assets: Tree,
    aliases: Tree,
}

impl SledAssetStore {
    /// Open or create a store at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory store that disappears on drop. For tests.
    pub fn open_temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        let assets = db.open_tree("assets")?;
        let aliases = db.open_tree("asset_aliases")?;
        Ok(Self {
            db,
            assets,
            aliases,
        })
    }

    /// Store an asset and its alias atomically, then flush.
    pub fn insert(&self, asset: &Asset) -> Result<(), StoreError> {
        let record = bincode::serialize(asset).map_err(|e| StoreError::Corrupt {
            key: asset.id.to_string(),
            reason: e.to_string(),
        })?;
        let id = asset.id.as_str().as_bytes();

        (&self.assets, &self.aliases)
            .transaction(|(assets, aliases)| {
                if let Some(alias) = &asset.alias {
                    if let Some(owner) = aliases.get(alias.as_bytes())? {
                        if owner.as_ref() != id {
                            return Err(ConflictableTransactionError::Abort(
                                StoreError::DuplicateAlias(alias.clone()),
                            ));
                        }
                    }
                }

                // Re-registration releases an alias the asset no longer uses.
                if let Some(bytes) = assets.get(id)? {
                    let previous = Self::decode(asset.id.as_str(), &bytes)
                        .map_err(ConflictableTransactionError::Abort)?;
                    if let Some(old) = previous.alias {
                        let held = aliases
                            .get(old.as_bytes())?
                            .map_or(false, |owner| owner.as_ref() == id);
                        if asset.alias.as_ref() != Some(&old) && held {
                            aliases.remove(old.as_bytes())?;
                        }
                    }
                }

                if let Some(alias) = &asset.alias {
                    aliases.insert(alias.as_bytes(), id)?;
                }
                assets.insert(id, record.as_slice())?;
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => StoreError::from(e),
            })?;

        self.db.flush()?;
        debug!(asset_id = %asset.id, alias = ?asset.alias, "asset stored");
        Ok(())
    }

    /// Number of stored assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<Asset, StoreError> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    #[cfg(test)]
    fn put_raw(&self, key: &str, bytes: &[u8]) {
        self.assets.insert(key.as_bytes(), bytes).unwrap();
    }
}

#[async_trait]
impl AssetResolver for SledAssetStore {
    async fn find_by_id(&self, id: &AssetId) -> Result<Asset, StoreError> {
        match self.assets.get(id.as_str().as_bytes())? {
            Some(bytes) => Self::decode(id.as_str(), &bytes),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn find_by_alias(&self, alias: &str) -> Result<Asset, StoreError> {
        let id = self
            .aliases
            .get(alias.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(alias.to_string()))?;
        let id = String::from_utf8(id.to_vec()).map_err(|e| StoreError::Corrupt {
            key: alias.to_string(),
            reason: e.to_string(),
        })?;
        self.find_by_id(&AssetId::new(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Hash, XPrv};
    use crate::signers::Signer;

    fn asset(alias: Option<&str>, seed: u8) -> Asset {
        let xpubs = (0..2u8)
            .map(|i| XPrv::from_seed(&[seed, i]).xpub())
            .collect();
        let signer = Signer::new(xpubs, 2, 1).unwrap();
        Asset::define(alias.map(str::to_string), signer, Hash::ZERO).unwrap()
    }

    #[tokio::test]
    async fn insert_and_find() {
        let store = SledAssetStore::open_temporary().unwrap();
        let a = asset(Some("silver"), 1);
        store.insert(&a).unwrap();

        assert_eq!(store.find_by_id(&a.id).await.unwrap(), a);
        assert_eq!(store.find_by_alias("silver").await.unwrap(), a);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = SledAssetStore::open_temporary().unwrap();
        let err = store.find_by_id(&AssetId::from("AST404")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn garbage_record_is_corrupt_not_missing() {
        let store = SledAssetStore::open_temporary().unwrap();
        store.put_raw("AST1", b"\x01");
        let err = store.find_by_id(&AssetId::from("AST1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == "AST1"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn alias_conflict_aborts_whole_insert() {
        let store = SledAssetStore::open_temporary().unwrap();
        store.insert(&asset(Some("silver"), 1)).unwrap();

        let other = asset(Some("silver"), 2);
        let err = store.insert(&other).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateAlias(_)));
        assert_eq!(store.len(), 1, "asset must not land without its alias");
    }

    #[tokio::test]
    async fn realiasing_releases_old_alias() {
        let store = SledAssetStore::open_temporary().unwrap();
        let mut a = asset(Some("gold"), 1);
        store.insert(&a).unwrap();

        a.alias = Some("silver".into());
        store.insert(&a).unwrap();
        assert_eq!(store.find_by_alias("silver").await.unwrap(), a);
        assert!(store.find_by_alias("gold").await.unwrap_err().is_not_found());

        let other = asset(Some("gold"), 2);
        store.insert(&other).unwrap();
        assert_eq!(store.find_by_alias("gold").await.unwrap(), other);

        a.alias = None;
        store.insert(&a).unwrap();
        assert!(store.find_by_alias("silver").await.unwrap_err().is_not_found());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn reopen_keeps_assets() {
        let dir = tempfile::tempdir().unwrap();
        let a = asset(None, 3);
        {
            let store = SledAssetStore::open(dir.path()).unwrap();
            store.insert(&a).unwrap();
        }
        let store = SledAssetStore::open(dir.path()).unwrap();
        assert_eq!(store.find_by_id(&a.id).await.unwrap(), a);
    }
}
