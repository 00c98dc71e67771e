//! # Signers
//!
//! A signer is the governing key set of an asset or account: an ordered set
//! of extended public keys, the quorum required among them, and a key index
//! that keeps its derivation paths apart from every other signer built from
//! the same root keys.
//!
//! Paths are lists of byte-string selectors:
//!
//! ```text
//! [ [key_space], key_index (u64 LE), item_index (u64 LE)* ]
//! ```
//!
//! Issuance uses the asset-level path with no item index. Per-output
//! derivation (control programs for account change, etc.) appends one.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{ACCOUNT_KEY_SPACE, ASSET_KEY_SPACE, MAX_MULTISIG_KEYS};
use crate::crypto::{tagged_sha256, XPub};

/// A derivation path: one selector per level.
pub type DerivationPath = Vec<Vec<u8>>;

/// Errors raised when assembling a signer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("at least one xpub is required")]
    NoXPubs,

    #[error("too many xpubs: {0} (max {max})", max = MAX_MULTISIG_KEYS)]
    TooManyXPubs(usize),

    #[error("quorum must be between 1 and {keys}, got {quorum}")]
    BadQuorum { quorum: usize, keys: usize },

    #[error("duplicate xpub: {0}")]
    DuplicateXPub(String),
}

// ---------------------------------------------------------------------------
// KeySpace
// ---------------------------------------------------------------------------

/// Which family of keys a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeySpace {
    /// Issuance keys of an asset.
    Asset,
    /// Control keys of an account.
    Account,
}

impl KeySpace {
    /// The one-byte tag that opens every path in this space.
    pub fn tag(self) -> u8 {
        match self {
            Self::Asset => ASSET_KEY_SPACE,
            Self::Account => ACCOUNT_KEY_SPACE,
        }
    }
}

impl fmt::Display for KeySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset => write!(f, "asset"),
            Self::Account => write!(f, "account"),
        }
    }
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// The governing key set of an asset or account.
///
/// XPubs are kept sorted so that the signer, and every witness derived from
/// it, is independent of the order keys were supplied in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// Stable identifier: hex of a tagged hash over keys, quorum and index.
    pub id: String,

    /// Root extended public keys, sorted.
    pub xpubs: Vec<XPub>,

    /// Number of signatures required among `xpubs`.
    pub quorum: usize,

    /// Separates this signer's paths from other signers on the same keys.
    pub key_index: u64,
}

impl Signer {
    /// Validates and assembles a signer.
    pub fn new(mut xpubs: Vec<XPub>, quorum: usize, key_index: u64) -> Result<Self, SignerError> {
        if xpubs.is_empty() {
            return Err(SignerError::NoXPubs);
        }
        if xpubs.len() > MAX_MULTISIG_KEYS {
            return Err(SignerError::TooManyXPubs(xpubs.len()));
        }
        if quorum == 0 || quorum > xpubs.len() {
            return Err(SignerError::BadQuorum {
                quorum,
                keys: xpubs.len(),
            });
        }

        xpubs.sort();
        if let Some(dupe) = xpubs.windows(2).find(|w| w[0] == w[1]) {
            return Err(SignerError::DuplicateXPub(dupe[0].to_hex()));
        }

        let id = signer_id(&xpubs, quorum, key_index);
        Ok(Self {
            id,
            xpubs,
            quorum,
            key_index,
        })
    }
}

fn signer_id(xpubs: &[XPub], quorum: usize, key_index: u64) -> String {
    let keys: Vec<[u8; 64]> = xpubs.iter().map(XPub::to_bytes).collect();
    let mut parts: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();
    let quorum = (quorum as u64).to_le_bytes();
    let index = key_index.to_le_bytes();
    parts.push(&quorum);
    parts.push(&index);
    tagged_sha256("tessera/signer", &parts).to_hex()
}

/// Builds the derivation path for `signer` in `key_space`.
///
/// `item_indexes` are appended one level each; issuance passes none.
pub fn path(signer: &Signer, key_space: KeySpace, item_indexes: &[u64]) -> DerivationPath {
    let mut path = Vec::with_capacity(2 + item_indexes.len());
    path.push(vec![key_space.tag()]);
    path.push(signer.key_index.to_le_bytes().to_vec());
    for idx in item_indexes {
        path.push(idx.to_le_bytes().to_vec());
    }
    path
}
