//! The asset-resolver seam and an in-memory registry.
//!
//! Resolvers must keep "this asset does not exist" apart from every other
//! failure. The issuance action enriches only the former with the requested
//! identifier; connectivity or corruption errors pass through untouched.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

use super::{Asset, AssetId};

/// Errors returned by asset lookups and registrations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No asset matches the key. Carries the key as looked up.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend could not answer (I/O, connectivity).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored record exists but cannot be decoded.
    #[error("corrupt asset record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Registration would give two assets the same alias.
    #[error("alias {0:?} is already taken")]
    DuplicateAlias(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Looks assets up by identifier or alias.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    async fn find_by_id(&self, id: &AssetId) -> Result<Asset, StoreError>;

    async fn find_by_alias(&self, alias: &str) -> Result<Asset, StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryRegistry
// ---------------------------------------------------------------------------

/// Process-local registry. Lookups are lock-free through `DashMap`; the
/// alias index takes a short write lock on registration only.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    assets: DashMap<AssetId, Asset>,
    aliases: RwLock<HashMap<String, AssetId>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asset. Re-registering the same ID replaces it and
    /// releases its previous alias; an alias held by a different asset is
    /// refused.
    pub fn insert(&self, asset: Asset) -> Result<(), StoreError> {
        let mut aliases = self.aliases.write();
        if let Some(alias) = &asset.alias {
            if let Some(owner) = aliases.get(alias) {
                if owner != &asset.id {
                    return Err(StoreError::DuplicateAlias(alias.clone()));
                }
            }
        }

        let previous = self
            .assets
            .get(&asset.id)
            .and_then(|entry| entry.value().alias.clone());
        if let Some(old) = previous {
            if asset.alias.as_ref() != Some(&old) && aliases.get(&old) == Some(&asset.id) {
                aliases.remove(&old);
            }
        }

        if let Some(alias) = &asset.alias {
            aliases.insert(alias.clone(), asset.id.clone());
        }
        self.assets.insert(asset.id.clone(), asset);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[async_trait]
impl AssetResolver for MemoryRegistry {
    async fn find_by_id(&self, id: &AssetId) -> Result<Asset, StoreError> {
        self.assets
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn find_by_alias(&self, alias: &str) -> Result<Asset, StoreError> {
        let id = self
            .aliases
            .read()
            .get(alias)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(alias.to_string()))?;
        self.find_by_id(&id).await
    }
}
