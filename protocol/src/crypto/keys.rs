//! # Extended Keys
//!
//! Hierarchical keys over the Ed25519 group. An extended key is a 32-byte
//! key plus a 32-byte chain code; children are derived by selector byte
//! strings rather than integer indexes, so a derivation path is simply a
//! list of byte strings (see [`crate::signers::path`]).
//!
//! ## Derivation
//!
//! ```text
//! out      = BLAKE3-XOF(key = chain_code, "N" || pubkey || selector)[..64]
//! offset   = scalar(out[..32])          (reduced mod ℓ)
//! child    = pubkey + offset·G
//! child_cc = out[32..]
//! ```
//!
//! Public derivation only needs the parent `XPub`, which is what lets the
//! builder compute witness keys without ever touching secret material. The
//! `XPrv` side adds the same offset to the secret scalar, so
//! `xprv.child(s).xpub() == xprv.xpub().child(s)`.
//!
//! Secret bytes are never logged. Don't add `Debug` output that prints them.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::encoding::decode_array;
use crate::config::{CHAIN_CODE_LENGTH, PUBLIC_KEY_LENGTH};

/// Context string for root-key derivation from a seed.
const ROOT_KEY_CONTEXT: &str = "tessera 2026-01-01 extended root key";

/// Errors that can occur during key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid public key: not a valid compressed Edwards point")]
    InvalidPoint,

    #[error("invalid key encoding: {0}")]
    Encoding(#[from] hex::FromHexError),
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A compressed Ed25519 public key. Construction validates the point, so a
/// `PublicKey` in hand always decompresses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// Parses and validates 32 compressed bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Result<Self, KeyError> {
        CompressedEdwardsY(bytes)
            .decompress()
            .ok_or(KeyError::InvalidPoint)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn point(&self) -> EdwardsPoint {
        // Validated at construction.
        CompressedEdwardsY(self.0)
            .decompress()
            .unwrap_or_default()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(decode_array(s)?)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// XPub
// ---------------------------------------------------------------------------

/// An extended public key: public key plus chain code.
///
/// Hex form is 128 chars, key first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XPub {
    key: PublicKey,
    chain_code: [u8; CHAIN_CODE_LENGTH],
}

impl XPub {
    pub fn new(key: PublicKey, chain_code: [u8; CHAIN_CODE_LENGTH]) -> Self {
        Self { key, chain_code }
    }

    /// The non-extended public key at this node.
    pub fn public_key(&self) -> PublicKey {
        self.key
    }

    pub fn chain_code(&self) -> &[u8; CHAIN_CODE_LENGTH] {
        &self.chain_code
    }

    /// 64 bytes: key then chain code.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(self.key.as_bytes());
        out[32..].copy_from_slice(&self.chain_code);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Derives the child extended key for one selector.
    pub fn child(&self, selector: &[u8]) -> XPub {
        let (offset, chain_code) = child_offset(self.key.as_bytes(), &self.chain_code, selector);
        let point = self.key.point() + EdwardsPoint::mul_base(&offset);
        XPub {
            key: PublicKey(point.compress().to_bytes()),
            chain_code,
        }
    }

    /// Walks a full derivation path.
    pub fn derive_path(&self, path: &[Vec<u8>]) -> XPub {
        path.iter().fold(*self, |xpub, selector| xpub.child(selector))
    }
}

impl fmt::Debug for XPub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XPub({})", self.to_hex())
    }
}

impl fmt::Display for XPub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for XPub {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 64] = decode_array(s)?;
        let mut key = [0u8; 32];
        let mut chain_code = [0u8; 32];
        key.copy_from_slice(&bytes[..32]);
        chain_code.copy_from_slice(&bytes[32..]);
        Ok(XPub {
            key: PublicKey::from_bytes(key)?,
            chain_code,
        })
    }
}

impl Serialize for XPub {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for XPub {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// XPrv
// ---------------------------------------------------------------------------

/// An extended private key. Deliberately not `Serialize`; key custody is the
/// wallet's business, not the builder's.
#[derive(Clone)]
pub struct XPrv {
    scalar: Scalar,
    chain_code: [u8; CHAIN_CODE_LENGTH],
}

impl XPrv {
    /// Derives a root key deterministically from seed bytes.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut out = [0u8; 64];
        let mut hasher = blake3::Hasher::new_derive_key(ROOT_KEY_CONTEXT);
        hasher.update(seed);
        hasher.finalize_xof().fill(&mut out);
        let (scalar, chain_code) = split_output(&out);
        Self { scalar, chain_code }
    }

    /// Generates a fresh root key from 32 bytes of OS entropy.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    pub fn xpub(&self) -> XPub {
        XPub {
            key: PublicKey(EdwardsPoint::mul_base(&self.scalar).compress().to_bytes()),
            chain_code: self.chain_code,
        }
    }

    pub fn child(&self, selector: &[u8]) -> XPrv {
        let xpub = self.xpub();
        let (offset, chain_code) = child_offset(xpub.key.as_bytes(), &self.chain_code, selector);
        XPrv {
            scalar: self.scalar + offset,
            chain_code,
        }
    }

    pub fn derive_path(&self, path: &[Vec<u8>]) -> XPrv {
        path.iter()
            .fold(self.clone(), |xprv, selector| xprv.child(selector))
    }
}

impl fmt::Debug for XPrv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XPrv").field("xpub", &self.xpub()).finish_non_exhaustive()
    }
}

fn child_offset(
    key: &[u8; PUBLIC_KEY_LENGTH],
    chain_code: &[u8; CHAIN_CODE_LENGTH],
    selector: &[u8],
) -> (Scalar, [u8; CHAIN_CODE_LENGTH]) {
    let mut out = [0u8; 64];
    let mut hasher = blake3::Hasher::new_keyed(chain_code);
    hasher.update(b"N");
    hasher.update(key);
    hasher.update(selector);
    hasher.finalize_xof().fill(&mut out);
    split_output(&out)
}

fn split_output(out: &[u8; 64]) -> (Scalar, [u8; CHAIN_CODE_LENGTH]) {
    let mut left = [0u8; 32];
    let mut right = [0u8; CHAIN_CODE_LENGTH];
    left.copy_from_slice(&out[..32]);
    right.copy_from_slice(&out[32..]);
    (Scalar::from_bytes_mod_order(left), right)
}
