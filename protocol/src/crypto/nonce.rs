//! Issuance nonces.
//!
//! An issuance input has no previous output to spend, so nothing else makes
//! two issuances of the same amount distinguishable. The nonce does that job.
//! Uniqueness is probabilistic: 64 bits from the OS CSPRNG, no collision
//! bookkeeping.
//!
//! The source is a trait so tests can starve the builder of entropy and
//! check that the failure propagates instead of being retried.

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use crate::config::NONCE_LENGTH;

/// The random source could not deliver.
#[derive(Debug, Error)]
pub enum NonceError {
    #[error("random source failed: {0}")]
    Unavailable(String),
}

/// A thread-safe supplier of cryptographically secure random bytes.
///
/// Implementations must be callable concurrently from several builds
/// without external locking.
pub trait NonceSource: Send + Sync {
    /// Fill `dest` completely or fail.
    fn fill(&self, dest: &mut [u8]) -> Result<(), NonceError>;
}

/// The operating system's CSPRNG (`getrandom` under the hood).
///
/// `OsRng` is a stateless handle, so every call is independent and no lock
/// is ever taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsNonceSource;

impl NonceSource for OsNonceSource {
    fn fill(&self, dest: &mut [u8]) -> Result<(), NonceError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| NonceError::Unavailable(e.to_string()))
    }
}

/// Draw one issuance nonce.
pub fn draw_nonce(source: &dyn NonceSource) -> Result<[u8; NONCE_LENGTH], NonceError> {
    let mut nonce = [0u8; NONCE_LENGTH];
    source.fill(&mut nonce)?;
    Ok(nonce)
}
