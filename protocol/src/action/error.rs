use thiserror::Error;

use super::context::CancelCause;
use crate::asset::{AssetId, StoreError};
use crate::crypto::NonceError;
use crate::program::ProgramError;

/// Everything that can stop an action from producing its fragment.
///
/// No variant is recovered from inside the builder: each one is returned to
/// the caller as is, without retries.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The resolver has no asset with this identifier.
    #[error("missing asset with ID {id:?}")]
    AssetNotFound {
        id: String,
        #[source]
        source: StoreError,
    },

    /// The resolver has no asset with this alias.
    #[error("missing asset with alias {alias:?}")]
    AliasNotFound {
        alias: String,
        #[source]
        source: StoreError,
    },

    /// Any other resolver failure, passed through unchanged.
    #[error(transparent)]
    Resolver(StoreError),

    #[error("entropy unavailable: {0}")]
    EntropyUnavailable(#[from] NonceError),

    #[error("malformed spending program: {0}")]
    MalformedSpendingProgram(#[from] ProgramError),

    #[error("build cancelled: {0}")]
    Cancelled(#[from] CancelCause),

    /// Issuing nothing is refused at construction.
    #[error("refusing to issue zero units of asset {0}")]
    ZeroAmount(AssetId),

    #[error("request names neither an asset ID nor an alias")]
    MissingAsset,
}

impl ActionError {
    /// Maps a lookup-by-identifier failure, enriching only "not found".
    pub(crate) fn from_id_lookup(id: &AssetId, err: StoreError) -> Self {
        if err.is_not_found() {
            Self::AssetNotFound {
                id: id.to_string(),
                source: err,
            }
        } else {
            Self::Resolver(err)
        }
    }

    /// Maps a lookup-by-alias failure, enriching only "not found".
    pub(crate) fn from_alias_lookup(alias: &str, err: StoreError) -> Self {
        if err.is_not_found() {
            Self::AliasNotFound {
                alias: alias.to_string(),
                source: err,
            }
        } else {
            Self::Resolver(err)
        }
    }

    /// Stable snake_case tag for log fields and exit reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AssetNotFound { .. } => "asset_not_found",
            Self::AliasNotFound { .. } => "alias_not_found",
            Self::Resolver(_) => "resolver",
            Self::EntropyUnavailable(_) => "entropy_unavailable",
            Self::MalformedSpendingProgram(_) => "malformed_spending_program",
            Self::Cancelled(_) => "cancelled",
            Self::ZeroAmount(_) => "zero_amount",
            Self::MissingAsset => "missing_asset",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
