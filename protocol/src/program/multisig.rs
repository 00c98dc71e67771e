//! Pay-to-signed-predicate threshold multisig.
//!
//! The program verifies `quorum` signatures over the SHA3 of a predicate
//! supplied by the spender, then runs that predicate:
//!
//! ```text
//! DUP TOALTSTACK SHA3
//! <pubkey_1> ... <pubkey_n> <quorum> <n> CHECKMULTISIG VERIFY
//! FROMALTSTACK 0 SWAP CHECKPREDICATE
//! ```
//!
//! Parameter rules: `quorum <= n`, `n <= MAX_MULTISIG_KEYS`, and a zero
//! quorum is only allowed for the degenerate zero-key program.

use super::{
    tokenize, Instruction, ProgramBuilder, ProgramError, OP_CHECKMULTISIG, OP_CHECKPREDICATE,
    OP_DUP, OP_FROMALTSTACK, OP_SHA3, OP_SWAP, OP_TOALTSTACK, OP_VERIFY,
};
use crate::config::{MAX_MULTISIG_KEYS, PUBLIC_KEY_LENGTH};
use crate::crypto::PublicKey;

/// Instructions before the first key.
const PREFIX: [u8; 3] = [OP_DUP, OP_TOALTSTACK, OP_SHA3];

/// Instructions after the key count.
const SUFFIX: [u8; 3] = [OP_CHECKMULTISIG, OP_VERIFY, OP_FROMALTSTACK];

/// Prefix + quorum + count + suffix + `0 SWAP CHECKPREDICATE`.
const FIXED_INSTRUCTIONS: usize = PREFIX.len() + 2 + SUFFIX.len() + 3;

fn check_params(quorum: u64, keys: u64) -> Result<(), ProgramError> {
    if quorum > keys || (quorum == 0 && keys > 0) || keys > MAX_MULTISIG_KEYS as u64 {
        return Err(ProgramError::InvalidParams { quorum, keys });
    }
    Ok(())
}

/// Writes a `quorum`-of-`keys.len()` program.
pub fn p2sp_multisig_program(keys: &[PublicKey], quorum: usize) -> Result<Vec<u8>, ProgramError> {
    check_params(quorum as u64, keys.len() as u64)?;

    let mut builder = PREFIX
        .iter()
        .fold(ProgramBuilder::new(), |b, op| b.add_op(*op));
    for key in keys {
        builder = builder.add_data(key.as_bytes());
    }
    builder = builder.add_int(quorum as u64).add_int(keys.len() as u64);
    builder = SUFFIX.iter().fold(builder, |b, op| b.add_op(*op));

    Ok(builder
        .add_int(0)
        .add_op(OP_SWAP)
        .add_op(OP_CHECKPREDICATE)
        .build())
}

/// Recognizes a program written by [`p2sp_multisig_program`] and returns its
/// keys and quorum.
///
/// Only the exact bytes the writer emits are accepted: a program that
/// encodes the same terms with non-minimal pushes is [`ProgramError::NonCanonical`].
pub fn parse_p2sp_multisig_program(
    program: &[u8],
) -> Result<(Vec<PublicKey>, usize), ProgramError> {
    let ins = tokenize(program)?;
    if ins.len() < FIXED_INSTRUCTIONS {
        return Err(ProgramError::UnexpectedInstruction {
            position: ins.len(),
            expected: "a complete multisig program",
        });
    }

    for (i, op) in PREFIX.iter().enumerate() {
        expect_op(&ins, i, *op, "multisig prefix")?;
    }

    let n = ins.len() - FIXED_INSTRUCTIONS;
    let quorum_at = PREFIX.len() + n;
    let count_at = quorum_at + 1;

    let quorum = ins[quorum_at]
        .as_int(quorum_at)?
        .ok_or(ProgramError::UnexpectedInstruction {
            position: quorum_at,
            expected: "quorum",
        })?;
    let count = ins[count_at]
        .as_int(count_at)?
        .ok_or(ProgramError::UnexpectedInstruction {
            position: count_at,
            expected: "key count",
        })?;
    if count != n as u64 {
        return Err(ProgramError::UnexpectedInstruction {
            position: count_at,
            expected: "key count matching the pushed keys",
        });
    }
    check_params(quorum, count)?;

    for (i, op) in SUFFIX.iter().enumerate() {
        expect_op(&ins, count_at + 1 + i, *op, "CHECKMULTISIG VERIFY FROMALTSTACK")?;
    }
    let zero_at = count_at + 1 + SUFFIX.len();
    if ins[zero_at].as_int(zero_at)? != Some(0) {
        return Err(ProgramError::UnexpectedInstruction {
            position: zero_at,
            expected: "0",
        });
    }
    expect_op(&ins, zero_at + 1, OP_SWAP, "SWAP")?;
    expect_op(&ins, zero_at + 2, OP_CHECKPREDICATE, "CHECKPREDICATE")?;

    let mut keys = Vec::with_capacity(n);
    for (offset, instr) in ins[PREFIX.len()..quorum_at].iter().enumerate() {
        let position = PREFIX.len() + offset;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = match instr {
            Instruction::Push(data) => (*data)
                .try_into()
                .map_err(|_| ProgramError::BadPublicKey(position))?,
            _ => return Err(ProgramError::BadPublicKey(position)),
        };
        keys.push(PublicKey::from_bytes(bytes).map_err(|_| ProgramError::BadPublicKey(position))?);
    }

    let quorum = quorum as usize;
    if p2sp_multisig_program(&keys, quorum)? != program {
        return Err(ProgramError::NonCanonical);
    }
    Ok((keys, quorum))
}

fn expect_op(
    ins: &[Instruction<'_>],
    position: usize,
    op: u8,
    expected: &'static str,
) -> Result<(), ProgramError> {
    match ins.get(position) {
        Some(Instruction::Op(found)) if *found == op => Ok(()),
        _ => Err(ProgramError::UnexpectedInstruction { position, expected }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::XPrv;

    fn keys(n: usize) -> Vec<PublicKey> {
        (0..n)
            .map(|i| XPrv::from_seed(&[i as u8; 8]).xpub().public_key())
            .collect()
    }

    #[test]
    fn two_of_three_roundtrip() {
        let k = keys(3);
        let program = p2sp_multisig_program(&k, 2).unwrap();
        let (parsed, quorum) = parse_p2sp_multisig_program(&program).unwrap();
        assert_eq!(parsed, k);
        assert_eq!(quorum, 2);
    }

    #[test]
    fn zero_of_zero_is_allowed() {
        let program = p2sp_multisig_program(&[], 0).unwrap();
        assert_eq!(parse_p2sp_multisig_program(&program).unwrap(), (vec![], 0));
    }

    #[test]
    fn bad_params_are_rejected_on_write() {
        let k = keys(2);
        assert_eq!(
            p2sp_multisig_program(&k, 3),
            Err(ProgramError::InvalidParams { quorum: 3, keys: 2 })
        );
        assert_eq!(
            p2sp_multisig_program(&k, 0),
            Err(ProgramError::InvalidParams { quorum: 0, keys: 2 })
        );
    }

    #[test]
    fn seventeen_keys_use_data_push_for_count() {
        let k = keys(17);
        let program = p2sp_multisig_program(&k, 17).unwrap();
        let (parsed, quorum) = parse_p2sp_multisig_program(&program).unwrap();
        assert_eq!(parsed.len(), 17);
        assert_eq!(quorum, 17);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_p2sp_multisig_program(&[]).is_err());
        assert!(parse_p2sp_multisig_program(&[0xff; 40]).is_err());
    }

    #[test]
    fn tampered_count_is_rejected() {
        let k = keys(3);
        let mut program = p2sp_multisig_program(&k, 2).unwrap();
        // The count is OP_3 right after OP_2; bump it to OP_4.
        let pos = program.len() - 7;
        assert_eq!(program[pos], super::super::OP_1 + 2);
        program[pos] += 1;
        assert!(matches!(
            parse_p2sp_multisig_program(&program),
            Err(ProgramError::UnexpectedInstruction { .. })
        ));
    }

    #[test]
    fn off_curve_key_is_rejected() {
        let mut program = p2sp_multisig_program(&keys(1), 1).unwrap();
        // First key starts after the 3-op prefix and its 1-byte length.
        // y = 2 has no matching x on edwards25519.
        let mut off_curve = [0u8; 32];
        off_curve[0] = 2;
        program[4..36].copy_from_slice(&off_curve);
        assert_eq!(
            parse_p2sp_multisig_program(&program),
            Err(ProgramError::BadPublicKey(3))
        );
    }

    #[test]
    fn non_minimal_pushes_are_rejected() {
        let k = keys(3);
        let canonical = p2sp_multisig_program(&k, 2).unwrap();
        let tail = canonical.len() - 8;

        // Same 2-of-3 terms, but quorum, count and the trailing zero pushed
        // as padded little-endian data.
        let mut padded = canonical[..tail].to_vec();
        padded.extend_from_slice(&[0x03, 0x02, 0x00, 0x00]);
        padded.extend_from_slice(&[0x02, 0x03, 0x00]);
        padded.extend_from_slice(&SUFFIX);
        padded.extend_from_slice(&[0x01, 0x00, OP_SWAP, OP_CHECKPREDICATE]);
        assert_ne!(padded, canonical);
        assert_eq!(
            parse_p2sp_multisig_program(&padded),
            Err(ProgramError::NonCanonical)
        );

        // A key behind OP_PUSHDATA1 instead of OP_DATA_32.
        let mut wide = canonical[..3].to_vec();
        wide.extend_from_slice(&[super::super::OP_PUSHDATA1, 32]);
        wide.extend_from_slice(&canonical[4..]);
        assert_eq!(
            parse_p2sp_multisig_program(&wide),
            Err(ProgramError::NonCanonical)
        );
    }

    #[test]
    fn trailing_instruction_is_rejected() {
        let mut program = p2sp_multisig_program(&keys(2), 1).unwrap();
        program.push(OP_VERIFY);
        assert!(parse_p2sp_multisig_program(&program).is_err());
    }
}
