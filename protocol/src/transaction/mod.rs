//! # Transaction Fragments
//!
//! The low-level pieces an action contributes to a transaction template.
//! Assembling fragments into a full transaction, and encoding it for the
//! wire, happens outside this crate.
//!
//! ```text
//! types.rs    — TxInput, IssuanceInput, TxOutput, ReferenceData
//! signing.rs  — KeyId, WitnessComponent, SigningInstruction
//! ```

pub mod signing;
pub mod types;

pub use signing::{key_ids, KeyId, SigningInstruction, WitnessComponent};
pub use types::{IssuanceInput, ReferenceData, TxInput, TxOutput};
