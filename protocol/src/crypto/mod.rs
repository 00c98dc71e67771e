//! # Cryptographic Primitives
//!
//! Everything the builder needs from cryptography, and nothing more:
//!
//! - **SHA-256** for identifiers (asset IDs, issuance hashes).
//! - **BLAKE3** for extended-key derivation.
//! - **Edwards25519** point arithmetic for public child derivation.
//! - **OS entropy** for issuance nonces.
//!
//! Signing is not here. The builder emits signing *instructions*; a
//! downstream signer holding the private keys fulfills them.

pub mod encoding;
pub mod hash;
pub mod keys;
pub mod nonce;

pub use hash::{sha256_array, tagged_sha256, Hash};
pub use keys::{KeyError, PublicKey, XPrv, XPub};
pub use nonce::{draw_nonce, NonceError, NonceSource, OsNonceSource};
