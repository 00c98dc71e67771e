//! Hex helpers for serde.
//!
//! Byte fields (programs, derivation paths, keys) are hex strings in JSON so
//! that fragments stay readable when printed or logged. bincode stores the
//! same strings, which keeps a single serde representation per type.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Decode a hex string into a fixed-size array, rejecting wrong lengths.
pub(crate) fn decode_array<const N: usize>(s: &str) -> Result<[u8; N], hex::FromHexError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(s, &mut out)?;
    Ok(out)
}

/// `#[serde(with = "hex_bytes")]` for `Vec<u8>` fields.
pub mod hex_bytes {
    use super::*;

    pub fn serialize<T: AsRef<[u8]>, S: Serializer>(bytes: T, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(&s).map_err(D::Error::custom)
    }
}

/// `#[serde(with = "hex_path")]` for derivation paths (`Vec<Vec<u8>>`).
pub mod hex_path {
    use super::*;

    pub fn serialize<S: Serializer>(path: &[Vec<u8>], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(path.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let parts = Vec::<String>::deserialize(d)?;
        parts
            .iter()
            .map(|p| hex::decode(p).map_err(D::Error::custom))
            .collect()
    }
}
