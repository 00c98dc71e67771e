//! Signing instructions: what a wallet must sign to make a fragment valid.
//!
//! An instruction does not carry signatures. It names the asset amount being
//! authorized and, per witness component, which derived keys may sign and
//! how many of them must. Wallets turn each [`KeyId`] back into a signing key
//! by walking the same derivation path from their private root.

use serde::{Deserialize, Serialize};

use crate::asset::AssetAmount;
use crate::crypto::encoding::hex_path;
use crate::crypto::{PublicKey, XPub};
use crate::signers::DerivationPath;

/// A root extended public key together with the path to the child key that
/// will actually sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyId {
    pub xpub: XPub,

    #[serde(with = "hex_path")]
    pub derivation_path: DerivationPath,
}

impl KeyId {
    pub fn new(xpub: XPub, derivation_path: DerivationPath) -> Self {
        Self {
            xpub,
            derivation_path,
        }
    }

    /// The child public key this identifier designates.
    pub fn derive_public_key(&self) -> PublicKey {
        self.xpub.derive_path(&self.derivation_path).public_key()
    }
}

/// One key identifier per xpub, all sharing `path`, in xpub order.
pub fn key_ids(xpubs: &[XPub], path: &[Vec<u8>]) -> Vec<KeyId> {
    xpubs
        .iter()
        .map(|xpub| KeyId::new(*xpub, path.to_vec()))
        .collect()
}

/// A threshold requirement: `quorum` signatures among `keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessComponent {
    pub quorum: usize,
    pub keys: Vec<KeyId>,
}

/// What must be signed, and by whom, for one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningInstruction {
    pub asset_amount: AssetAmount,
    pub witness_components: Vec<WitnessComponent>,
}

impl SigningInstruction {
    pub fn new(asset_amount: AssetAmount) -> Self {
        Self {
            asset_amount,
            witness_components: Vec::new(),
        }
    }

    /// Appends a threshold witness component. Key order is preserved.
    pub fn add_witness_keys(&mut self, keys: Vec<KeyId>, quorum: usize) {
        debug_assert!(
            quorum <= keys.len(),
            "quorum {quorum} exceeds {} keys",
            keys.len()
        );
        self.witness_components
            .push(WitnessComponent { quorum, keys });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::XPrv;
    use crate::signers::{self, KeySpace, Signer};

    fn xpubs(n: u8) -> Vec<XPub> {
        (0..n).map(|i| XPrv::from_seed(&[i, 7]).xpub()).collect()
    }

    #[test]
    fn key_ids_follow_xpub_order() {
        let xs = xpubs(3);
        let path = vec![vec![0u8], 1u64.to_le_bytes().to_vec()];
        let ids = key_ids(&xs, &path);

        assert_eq!(ids.len(), 3);
        for (id, x) in ids.iter().zip(&xs) {
            assert_eq!(&id.xpub, x);
            assert_eq!(id.derivation_path, path);
        }
    }

    #[test]
    fn key_id_derives_the_child_key() {
        let root = XPrv::from_seed(b"signing-root");
        let path = vec![vec![0u8], 9u64.to_le_bytes().to_vec()];
        let id = KeyId::new(root.xpub(), path.clone());

        // Public and private derivation agree.
        assert_eq!(id.derive_public_key(), root.derive_path(&path).xpub().public_key());
        assert_ne!(id.derive_public_key(), root.xpub().public_key());
    }

    #[test]
    fn key_ids_match_signer_asset_path() {
        let signer = Signer::new(xpubs(2), 1, 4).unwrap();
        let path = signers::path(&signer, KeySpace::Asset, &[]);
        let ids = key_ids(&signer.xpubs, &path);
        assert!(ids.iter().all(|id| id.derivation_path[0] == vec![0u8]));
    }

    #[test]
    fn add_witness_keys_appends_component() {
        let mut instr = SigningInstruction::new(AssetAmount::new("AST1", 100));
        assert!(instr.witness_components.is_empty());

        let ids = key_ids(&xpubs(3), &[vec![0u8]]);
        instr.add_witness_keys(ids.clone(), 2);

        assert_eq!(instr.witness_components.len(), 1);
        assert_eq!(instr.witness_components[0].quorum, 2);
        assert_eq!(instr.witness_components[0].keys, ids);
        assert_eq!(instr.asset_amount.amount, 100);
    }

    #[test]
    fn instruction_json_shape() {
        let mut instr = SigningInstruction::new(AssetAmount::new("AST1", 5));
        instr.add_witness_keys(key_ids(&xpubs(1), &[vec![0u8], vec![1, 0]]), 1);

        let json = serde_json::to_value(&instr).unwrap();
        let key = &json["witness_components"][0]["keys"][0];
        assert_eq!(key["derivation_path"], serde_json::json!(["00", "0100"]));
        assert_eq!(key["xpub"].as_str().unwrap().len(), 128);

        let back: SigningInstruction = serde_json::from_value(json).unwrap();
        assert_eq!(back, instr);
    }
}
