//! Instruction decoder for the GraphX 64-bit instruction word.
//!
//! Field layout (big-endian bit numbering):
//!
//! | Bits   | Field |
//! |--------|-------|
//! | 63..56 | opcode |
//! | 55..48 | mode flags (`I` bit 0, `F` bit 1) |
//! | 47..40 | destination register |
//! | 39..32 | source-1 register |
//! | 31..0  | source-2 register (`I=0`) or 32-bit immediate (`I=1`) |
//!
//! When `I` and `F` are both set, the immediate field carries an IEEE-754
//! single-precision bit pattern.

use crate::fault::Fault;
use crate::isa::Opcode;

/// Mode-flag bit selecting immediate addressing for the source-2 field.
pub const MODE_IMMEDIATE: u8 = 0b0000_0001;
/// Mode-flag bit selecting the float banks and float immediates.
pub const MODE_FLOAT: u8 = 0b0000_0010;

/// Fully extracted instruction, passed by value to the executor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedInstruction {
    /// Resolved opcode.
    pub opcode: Opcode,
    /// Raw mode-flag byte (bits 55..48); upper bits are reserved.
    pub flags: u8,
    /// Destination register field.
    pub dest: u8,
    /// Source-1 register field.
    pub src1: u8,
    /// Source-2 register field or raw immediate, by [`Self::immediate`].
    pub src2_imm: u32,
    /// Immediate reinterpreted as an IEEE-754 single.
    ///
    /// Meaningful only when both `I` and `F` are set; 0.0 otherwise.
    pub float_imm: f32,
}

impl DecodedInstruction {
    /// Returns true when the source-2 field carries an immediate.
    #[must_use]
    pub const fn immediate(&self) -> bool {
        self.flags & MODE_IMMEDIATE != 0
    }

    /// Returns true when the instruction operates on the float banks.
    #[must_use]
    pub const fn floating(&self) -> bool {
        self.flags & MODE_FLOAT != 0
    }

    /// Re-encodes this instruction to a 64-bit word.
    #[must_use]
    pub fn encode(&self) -> u64 {
        encode_word(self.opcode, self.flags, self.dest, self.src1, self.src2_imm)
    }
}

/// Instruction decoder.
///
/// Stateless: the decoder never touches graph, frontier, or register state.
/// The only decode fault is an opcode byte outside the assignment table.
pub struct Decoder;

impl Decoder {
    /// Decodes a 64-bit instruction word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownOpcode`] when the opcode byte is not in the
    /// instruction set.
    pub fn decode(word: u64) -> Result<DecodedInstruction, Fault> {
        let opcode_byte = (word >> 56) as u8;
        let Some(opcode) = Opcode::from_u8(opcode_byte) else {
            return Err(Fault::UnknownOpcode {
                opcode: opcode_byte,
            });
        };

        let flags = (word >> 48) as u8;
        let dest = (word >> 40) as u8;
        let src1 = (word >> 32) as u8;
        let src2_imm = word as u32;

        let float_imm = if flags & MODE_IMMEDIATE != 0 && flags & MODE_FLOAT != 0 {
            f32::from_bits(src2_imm)
        } else {
            0.0
        };

        Ok(DecodedInstruction {
            opcode,
            flags,
            dest,
            src1,
            src2_imm,
            float_imm,
        })
    }
}

/// Builds an instruction word from its fields. Encoding aid for tests and
/// host tooling; the inverse of [`Decoder::decode`].
#[must_use]
pub fn encode_word(opcode: Opcode, flags: u8, dest: u8, src1: u8, src2_imm: u32) -> u64 {
    u64::from(opcode.as_u8()) << 56
        | u64::from(flags) << 48
        | u64::from(dest) << 40
        | u64::from(src1) << 32
        | u64::from(src2_imm)
}
