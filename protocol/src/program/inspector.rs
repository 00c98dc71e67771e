//! The spending-program inspector seam.
//!
//! The issuance action never parses programs itself; it asks an inspector
//! for the keys and threshold a program demands. Swapping the inspector is
//! how a deployment teaches the builder a new program form.

use serde::{Deserialize, Serialize};

use super::{parse_p2sp_multisig_program, ProgramError};
use crate::crypto::PublicKey;

/// What a threshold-signature program requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigTerms {
    /// Keys named by the program, in program order.
    pub public_keys: Vec<PublicKey>,
    /// Signatures required among them.
    pub quorum: usize,
}

impl MultisigTerms {
    pub fn key_count(&self) -> usize {
        self.public_keys.len()
    }
}

/// Extracts signing requirements from a spending program.
pub trait ProgramInspector: Send + Sync {
    /// Fails when the program is not a recognized threshold-signature form.
    fn inspect(&self, program: &[u8]) -> Result<MultisigTerms, ProgramError>;
}

/// Recognizes the version-1 pay-to-signed-predicate multisig form.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultisigInspector;

impl ProgramInspector for MultisigInspector {
    fn inspect(&self, program: &[u8]) -> Result<MultisigTerms, ProgramError> {
        let (public_keys, quorum) = parse_p2sp_multisig_program(program)?;
        Ok(MultisigTerms {
            public_keys,
            quorum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::XPrv;
    use crate::program::p2sp_multisig_program;

    #[test]
    fn inspector_reports_terms() {
        let keys: Vec<_> = (0..3u8)
            .map(|i| XPrv::from_seed(&[i]).xpub().public_key())
            .collect();
        let program = p2sp_multisig_program(&keys, 2).unwrap();
        let terms = MultisigInspector.inspect(&program).unwrap();
        assert_eq!(terms.quorum, 2);
        assert_eq!(terms.key_count(), 3);
    }

    #[test]
    fn inspector_rejects_non_multisig() {
        assert!(MultisigInspector.inspect(b"\x76\x76").is_err());
    }
}
