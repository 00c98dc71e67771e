//! Transaction fragments produced by actions.
//!
//! These are the pieces an action hands back to the template assembler:
//! inputs, outputs and the opaque reference data that rides along with
//! them. None of them are mutated after construction.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use std::fmt;

use crate::asset::{AssetAmount, AssetId};
use crate::config::NONCE_LENGTH;
use crate::crypto::encoding::hex_bytes;
use crate::crypto::{tagged_sha256, Hash};

// ---------------------------------------------------------------------------
// ReferenceData
// ---------------------------------------------------------------------------

/// Application data attached to an input or output: a JSON object whose
/// bytes are kept exactly as received.
///
/// Key order, whitespace and number formatting all survive a serde round
/// trip, because the value is stored as raw JSON and never re-encoded. The
/// builder does not interpret it.
pub struct ReferenceData(Box<RawValue>);

impl ReferenceData {
    /// The empty object `{}`.
    pub fn empty() -> Self {
        Self::from_json("{}").unwrap_or_else(|_| unreachable!("`{{}}` is a JSON object"))
    }

    /// Accepts any JSON text that is an object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw = RawValue::from_string(json.to_string())?;
        Self::from_raw(raw)
    }

    /// Encodes an ordered map.
    pub fn from_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        // A `Map` always serializes to a valid object.
        let raw = serde_json::value::to_raw_value(map)
            .unwrap_or_else(|_| unreachable!("serializing a JSON map cannot fail"));
        Self(raw)
    }

    fn from_raw(raw: Box<RawValue>) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw.get())?;
        Ok(Self(raw))
    }

    /// The exact JSON text.
    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.get().as_bytes()
    }

    /// Decodes into an insertion-ordered map.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::from_str(self.0.get()).unwrap_or_default()
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::empty()
    }
}

impl Clone for ReferenceData {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl PartialEq for ReferenceData {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ReferenceData {}

impl fmt::Debug for ReferenceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReferenceData({})", self.as_str())
    }
}

impl Serialize for ReferenceData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReferenceData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Self::from_raw(raw).map_err(|_| D::Error::custom("reference data must be a JSON object"))
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// An input that creates new units of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceInput {
    /// Random bytes that make this issuance unique.
    #[serde(with = "hex_bytes")]
    pub nonce: Vec<u8>,

    pub asset_amount: AssetAmount,

    pub reference_data: ReferenceData,

    /// Initial block of the chain the asset is bound to.
    pub initial_block_hash: Hash,

    /// The asset's issuance program, which the witness must satisfy.
    #[serde(with = "hex_bytes")]
    pub issuance_program: Vec<u8>,

    /// Witness arguments. Empty until a signer fills them in.
    pub arguments: Vec<String>,
}

impl IssuanceInput {
    pub fn new(
        nonce: [u8; NONCE_LENGTH],
        asset_amount: AssetAmount,
        reference_data: ReferenceData,
        initial_block_hash: Hash,
        issuance_program: Vec<u8>,
    ) -> Self {
        Self {
            nonce: nonce.to_vec(),
            asset_amount,
            reference_data,
            initial_block_hash,
            issuance_program,
            arguments: Vec::new(),
        }
    }

    /// The value that distinguishes this issuance from every other one of
    /// the same asset: nonce, asset, chain and program. Amount and reference
    /// data are deliberately outside it.
    pub fn issuance_hash(&self) -> Hash {
        tagged_sha256(
            "tessera/issuance",
            &[
                self.nonce.as_slice(),
                self.asset_amount.asset_id.as_str().as_bytes(),
                self.initial_block_hash.as_bytes().as_slice(),
                self.issuance_program.as_slice(),
            ],
        )
    }
}

/// A transaction input. Issuance is the only kind this core builds; spends
/// of previous outputs come from other actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxInput {
    Issuance(IssuanceInput),
}

impl TxInput {
    pub fn asset_amount(&self) -> &AssetAmount {
        match self {
            Self::Issuance(input) => &input.asset_amount,
        }
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_amount().asset_id
    }

    pub fn reference_data(&self) -> &ReferenceData {
        match self {
            Self::Issuance(input) => &input.reference_data,
        }
    }

    pub fn as_issuance(&self) -> Option<&IssuanceInput> {
        match self {
            Self::Issuance(input) => Some(input),
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// A transaction output: value locked under a control program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub asset_amount: AssetAmount,

    #[serde(with = "hex_bytes")]
    pub control_program: Vec<u8>,

    #[serde(default)]
    pub reference_data: ReferenceData,
}
