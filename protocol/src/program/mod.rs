//! # Spending Programs
//!
//! Issuance and control programs are short stack-machine programs. This
//! module knows just enough of the version-1 instruction set to write and
//! recognize the one form the builder cares about: the pay-to-signed-
//! predicate threshold multisig (see [`multisig`]).
//!
//! Executing programs is the VM's job. Nothing here evaluates anything.
//!
//! ## Encoding
//!
//! ```text
//! 0x00                OP_0 (pushes the empty string / zero)
//! 0x01..=0x4b         OP_DATA_n, push the next n bytes
//! 0x4c len:u8         OP_PUSHDATA1
//! 0x4d len:u16le      OP_PUSHDATA2
//! 0x4e len:u32le      OP_PUSHDATA4
//! 0x51..=0x60         OP_1..OP_16
//! anything else       a plain opcode
//! ```

pub mod inspector;
pub mod multisig;

use thiserror::Error;

pub use inspector::{MultisigInspector, MultisigTerms, ProgramInspector};
pub use multisig::{p2sp_multisig_program, parse_p2sp_multisig_program};

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const OP_0: u8 = 0x00;
pub const OP_DATA_75: u8 = 0x4b;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_VERIFY: u8 = 0x69;
pub const OP_TOALTSTACK: u8 = 0x6b;
pub const OP_FROMALTSTACK: u8 = 0x6c;
pub const OP_DUP: u8 = 0x76;
pub const OP_SWAP: u8 = 0x7c;
pub const OP_SHA3: u8 = 0xaa;
pub const OP_CHECKMULTISIG: u8 = 0xad;
pub const OP_CHECKPREDICATE: u8 = 0xc0;

/// Errors raised while writing or recognizing a program.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    #[error("program truncated at byte {0}")]
    Truncated(usize),

    #[error("unexpected instruction {position}: expected {expected}")]
    UnexpectedInstruction {
        position: usize,
        expected: &'static str,
    },

    #[error("integer push at instruction {0} does not fit in 64 bits")]
    IntegerOverflow(usize),

    #[error("bad multisig parameters: quorum {quorum} of {keys} keys")]
    InvalidParams { quorum: u64, keys: u64 },

    #[error("instruction {0} is not a valid public key")]
    BadPublicKey(usize),

    #[error("program is not in canonical form")]
    NonCanonical,

    #[error("program names {program} keys but the signer derives {signer}")]
    KeyCountMismatch { program: usize, signer: usize },
}

// ---------------------------------------------------------------------------
// Instruction
// ---------------------------------------------------------------------------

/// One decoded instruction. Pushes borrow their data from the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// `OP_0`, `OP_DATA_n`, `OP_PUSHDATAn`.
    Push(&'a [u8]),
    /// `OP_1..OP_16`.
    SmallInt(u8),
    /// Any other opcode.
    Op(u8),
}

impl Instruction<'_> {
    /// Interprets the instruction as a non-negative integer.
    ///
    /// Pushes are little-endian, at most 8 bytes.
    pub fn as_int(&self, position: usize) -> Result<Option<u64>, ProgramError> {
        match *self {
            Instruction::SmallInt(n) => Ok(Some(n as u64)),
            Instruction::Push(data) => {
                if data.len() > 8 {
                    return Err(ProgramError::IntegerOverflow(position));
                }
                let mut buf = [0u8; 8];
                buf[..data.len()].copy_from_slice(data);
                Ok(Some(u64::from_le_bytes(buf)))
            }
            Instruction::Op(_) => Ok(None),
        }
    }
}

/// Splits a program into instructions.
pub fn tokenize(program: &[u8]) -> Result<Vec<Instruction<'_>>, ProgramError> {
    let mut out = Vec::new();
    let mut pc = 0usize;

    while pc < program.len() {
        let op = program[pc];
        pc += 1;

        let len = match op {
            OP_0 => 0,
            0x01..=OP_DATA_75 => op as usize,
            OP_PUSHDATA1 => read_len(program, &mut pc, 1)?,
            OP_PUSHDATA2 => read_len(program, &mut pc, 2)?,
            OP_PUSHDATA4 => read_len(program, &mut pc, 4)?,
            OP_1..=OP_16 => {
                out.push(Instruction::SmallInt(op - OP_1 + 1));
                continue;
            }
            _ => {
                out.push(Instruction::Op(op));
                continue;
            }
        };

        let end = pc.checked_add(len).ok_or(ProgramError::Truncated(pc))?;
        let data = program.get(pc..end).ok_or(ProgramError::Truncated(pc))?;
        out.push(Instruction::Push(data));
        pc = end;
    }

    Ok(out)
}

fn read_len(program: &[u8], pc: &mut usize, width: usize) -> Result<usize, ProgramError> {
    let bytes = program
        .get(*pc..*pc + width)
        .ok_or(ProgramError::Truncated(*pc))?;
    let mut buf = [0u8; 4];
    buf[..width].copy_from_slice(bytes);
    *pc += width;
    Ok(u32::from_le_bytes(buf) as usize)
}

// ---------------------------------------------------------------------------
// ProgramBuilder
// ---------------------------------------------------------------------------

/// Appends instructions using the shortest encoding for each push.
#[derive(Debug, Default, Clone)]
pub struct ProgramBuilder {
    program: Vec<u8>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_op(mut self, op: u8) -> Self {
        self.program.push(op);
        self
    }

    pub fn add_data(mut self, data: &[u8]) -> Self {
        let len = data.len();
        if len == 0 {
            self.program.push(OP_0);
        } else if len <= OP_DATA_75 as usize {
            self.program.push(len as u8);
        } else if len <= u8::MAX as usize {
            self.program.push(OP_PUSHDATA1);
            self.program.push(len as u8);
        } else if len <= u16::MAX as usize {
            self.program.push(OP_PUSHDATA2);
            self.program.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.program.push(OP_PUSHDATA4);
            self.program.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.program.extend_from_slice(data);
        self
    }

    /// `OP_0`/`OP_1..OP_16` for small values, a minimal little-endian push
    /// otherwise.
    pub fn add_int(self, n: u64) -> Self {
        match n {
            0 => self.add_op(OP_0),
            1..=16 => self.add_op(OP_1 + (n as u8) - 1),
            _ => {
                let bytes = n.to_le_bytes();
                let used = 8 - (n.leading_zeros() as usize / 8);
                self.add_data(&bytes[..used])
            }
        }
    }

    pub fn build(self) -> Vec<u8> {
        self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ints_use_single_byte_ops() {
        let p = ProgramBuilder::new().add_int(0).add_int(1).add_int(16).build();
        assert_eq!(p, vec![OP_0, OP_1, OP_16]);
    }

    #[test]
    fn large_ints_are_minimal_pushes() {
        let p = ProgramBuilder::new().add_int(17).add_int(0x1234).build();
        assert_eq!(p, vec![0x01, 17, 0x02, 0x34, 0x12]);
    }

    #[test]
    fn tokenize_reads_back_builder_output() {
        let p = ProgramBuilder::new()
            .add_op(OP_DUP)
            .add_data(&[0xab; 32])
            .add_int(300)
            .add_op(OP_CHECKPREDICATE)
            .build();
        let ins = tokenize(&p).unwrap();
        assert_eq!(ins.len(), 4);
        assert_eq!(ins[0], Instruction::Op(OP_DUP));
        assert_eq!(ins[1], Instruction::Push(&[0xab; 32]));
        assert_eq!(ins[2].as_int(2).unwrap(), Some(300));
        assert_eq!(ins[3], Instruction::Op(OP_CHECKPREDICATE));
    }

    #[test]
    fn pushdata_lengths() {
        let long = vec![7u8; 300];
        let p = ProgramBuilder::new().add_data(&long).build();
        assert_eq!(p[0], OP_PUSHDATA2);
        assert_eq!(tokenize(&p).unwrap(), vec![Instruction::Push(&long)]);

        let medium = vec![1u8; 100];
        let p = ProgramBuilder::new().add_data(&medium).build();
        assert_eq!(&p[..2], &[OP_PUSHDATA1, 100]);
    }

    #[test]
    fn truncated_push_is_rejected() {
        assert_eq!(tokenize(&[0x05, 1, 2]), Err(ProgramError::Truncated(1)));
        assert_eq!(tokenize(&[OP_PUSHDATA2, 1]), Err(ProgramError::Truncated(1)));
    }

    #[test]
    fn oversized_integer_push() {
        let ins = Instruction::Push(&[1u8; 9]);
        assert_eq!(ins.as_int(4), Err(ProgramError::IntegerOverflow(4)));
        assert_eq!(Instruction::Op(OP_DUP).as_int(0), Ok(None));
    }
}
