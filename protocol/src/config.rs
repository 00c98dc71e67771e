//! # Protocol Configuration & Constants
//!
//! Every magic number the transaction builder relies on lives here. If you
//! are hardcoding a TTL or a key-space tag somewhere else, move it here.
//!
//! Some of these values are consensus-adjacent: validators trust the time
//! bounds and the nonce length that builders produce, so changing them is a
//! coordinated upgrade, not a refactor.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full protocol version string of this builder core.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// VM version stamped on newly defined assets. The issuance program format
/// understood by [`crate::program`] is the version-1 format.
pub const CURRENT_VM_VERSION: u64 = 1;

// ---------------------------------------------------------------------------
// Issuance Parameters
// ---------------------------------------------------------------------------

/// Issuance nonce length in bytes. Eight bytes of OS entropy make two
/// issuances of the same amount distinguishable. Not 4. Not 16. Eight.
pub const NONCE_LENGTH: usize = 8;

/// Expiration window applied when an action does not carry its own TTL.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// How far behind "now" an action places the transaction's minimum time.
/// Absorbs clock skew between the building machine and whichever validator
/// eventually checks the transaction.
pub const MIN_TIME_SKEW: Duration = Duration::from_secs(5 * 60);

// ---------------------------------------------------------------------------
// Key Spaces
// ---------------------------------------------------------------------------

/// Derivation-path tag for asset issuance keys.
pub const ASSET_KEY_SPACE: u8 = 0;

/// Derivation-path tag for account control keys.
pub const ACCOUNT_KEY_SPACE: u8 = 1;

// ---------------------------------------------------------------------------
// Spending Programs
// ---------------------------------------------------------------------------

/// Upper bound on the number of keys in a threshold-multisig program.
pub const MAX_MULTISIG_KEYS: usize = 255;

/// Length of a compressed Edwards public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of an extended-key chain code.
pub const CHAIN_CODE_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// ActionConfig
// ---------------------------------------------------------------------------

/// Tunable time-validity policy shared by every action of a build request.
///
/// Defaults mirror the protocol constants above. Tests shrink or stretch
/// them; production deployments should leave them alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionConfig {
    /// TTL used when an action has none (or a zero one).
    pub default_ttl: Duration,

    /// Distance between "now" and the reported minimum time.
    pub min_time_skew: Duration,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            min_time_skew: MIN_TIME_SKEW,
        }
    }
}
