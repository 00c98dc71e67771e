//! # Assets
//!
//! An asset is defined by its issuance program, the signer that governs it,
//! and the initial block of the chain it lives on. The builder only ever
//! reads assets; defining and storing them belongs to the registry side,
//! which is why [`Asset::define`] lives here and not in `action`.
//!
//! ```text
//! mod.rs       — AssetId, AssetAmount, Asset
//! registry.rs  — AssetResolver trait, StoreError, in-memory registry
//! store.rs     — sled-backed persistent store
//! ```

pub mod registry;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::CURRENT_VM_VERSION;
use crate::crypto::encoding::hex_bytes;
use crate::crypto::{tagged_sha256, Hash};
use crate::program::{p2sp_multisig_program, ProgramError};
use crate::signers::{self, KeySpace, Signer};

pub use registry::{AssetResolver, MemoryRegistry, StoreError};
pub use store::SledAssetStore;

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Opaque asset identifier.
///
/// Assets defined through [`Asset::define`] get a hex SHA-256 identifier;
/// the builder itself treats the value as an uninterpreted string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Canonical identifier of an asset definition.
    pub fn derive(initial_block_hash: &Hash, vm_version: u64, issuance_program: &[u8]) -> Self {
        let hash = tagged_sha256(
            "tessera/asset-id",
            &[
                initial_block_hash.as_bytes().as_slice(),
                vm_version.to_le_bytes().as_slice(),
                issuance_program,
            ],
        );
        Self(hash.to_hex())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// AssetAmount
// ---------------------------------------------------------------------------

/// A quantity of one asset, in its smallest unit. No floats near money.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetAmount {
    pub asset_id: AssetId,
    pub amount: u64,
}

impl AssetAmount {
    pub fn new(asset_id: impl Into<AssetId>, amount: u64) -> Self {
        Self {
            asset_id: asset_id.into(),
            amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for AssetAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.amount, self.asset_id)
    }
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// A registered asset as the resolver returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,

    /// Optional human-friendly name, unique within a registry.
    pub alias: Option<String>,

    pub vm_version: u64,

    /// Program that must be satisfied to issue units of this asset.
    #[serde(with = "hex_bytes")]
    pub issuance_program: Vec<u8>,

    /// Governing key set; issuance witnesses derive from it.
    pub signer: Signer,

    /// Hash of the initial block of the chain the asset is bound to.
    pub initial_block_hash: Hash,
}

impl Asset {
    /// Defines a new asset governed by `signer`.
    ///
    /// The issuance program is a `signer.quorum`-of-n multisig over the
    /// signer's keys derived at the asset-level path, which is exactly what
    /// an issuance build later expects to find.
    pub fn define(
        alias: Option<String>,
        signer: Signer,
        initial_block_hash: Hash,
    ) -> Result<Self, ProgramError> {
        let path = signers::path(&signer, KeySpace::Asset, &[]);
        let keys: Vec<_> = signer
            .xpubs
            .iter()
            .map(|xpub| xpub.derive_path(&path).public_key())
            .collect();
        let issuance_program = p2sp_multisig_program(&keys, signer.quorum)?;
        let id = AssetId::derive(&initial_block_hash, CURRENT_VM_VERSION, &issuance_program);

        Ok(Self {
            id,
            alias,
            vm_version: CURRENT_VM_VERSION,
            issuance_program,
            signer,
            initial_block_hash,
        })
    }
}
