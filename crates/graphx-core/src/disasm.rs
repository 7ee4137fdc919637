//! Instruction formatting for debug traces and fault reports.

use crate::decoder::{DecodedInstruction, Decoder};
use crate::isa::{Opcode, OpcodeGroup};
use crate::state::{float_register_name, int_register_name};

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasmRow {
    /// Program-counter word index of this instruction.
    pub pc: u32,
    /// Raw 64-bit instruction word.
    pub raw_word: u64,
    /// Mnemonic, or `.word` for an illegal encoding.
    pub mnemonic: &'static str,
    /// Formatted operands.
    pub operands: String,
    /// True when the word did not decode.
    pub illegal: bool,
}

impl DisasmRow {
    /// Renders the row as a single trace line.
    #[must_use]
    pub fn render(&self) -> String {
        if self.operands.is_empty() {
            format!("{:4}: {}", self.pc, self.mnemonic)
        } else {
            format!("{:4}: {} {}", self.pc, self.mnemonic, self.operands)
        }
    }
}

/// Disassembles one program word.
#[must_use]
pub fn disassemble_word(pc: u32, word: u64) -> DisasmRow {
    match Decoder::decode(word) {
        Ok(instr) => DisasmRow {
            pc,
            raw_word: word,
            mnemonic: instr.opcode.mnemonic(),
            operands: format_operands(&instr),
            illegal: false,
        },
        Err(_) => DisasmRow {
            pc,
            raw_word: word,
            mnemonic: ".word",
            operands: format!("{word:#018X} ; ILLEGAL"),
            illegal: true,
        },
    }
}

/// Formats the operand list of a decoded instruction.
#[must_use]
pub fn format_operands(instr: &DecodedInstruction) -> String {
    match instr.opcode.group() {
        OpcodeGroup::Control => match instr.opcode {
            Opcode::Halt => String::new(),
            _ => format!("#{}", instr.src2_imm),
        },
        OpcodeGroup::Arithmetic => match instr.opcode {
            Opcode::Cmp => format!("{}, {}", scalar_name(instr, instr.src1), operand2(instr)),
            Opcode::Mov => format!(
                "{}, {}",
                scalar_name(instr, instr.dest),
                if instr.immediate() {
                    operand2(instr)
                } else {
                    scalar_name(instr, instr.src1)
                }
            ),
            Opcode::Movc => {
                if instr.floating() {
                    format!(
                        "{}, {}",
                        float_register_name(instr.dest),
                        int_register_name(instr.src1)
                    )
                } else {
                    format!(
                        "{}, {}",
                        int_register_name(instr.dest),
                        float_register_name(instr.src1)
                    )
                }
            }
            _ => format!(
                "{}, {}, {}",
                scalar_name(instr, instr.dest),
                scalar_name(instr, instr.src1),
                operand2(instr)
            ),
        },
        OpcodeGroup::Memory => format!("{}, {}", scalar_name(instr, instr.dest), address(instr)),
        OpcodeGroup::Graph => match instr.opcode {
            Opcode::Niter | Opcode::Nnext => instr.dest.to_string(),
            Opcode::Deg => int_register_name(instr.dest),
            _ => String::new(),
        },
        OpcodeGroup::Frontier => match instr.opcode {
            Opcode::Fpush | Opcode::Fpop => int_register_name(instr.dest),
            _ => String::new(),
        },
        OpcodeGroup::Vector => match instr.opcode {
            Opcode::Vld | Opcode::Vst => {
                format!("{}, {}", vector_name(instr, instr.dest), address(instr))
            }
            Opcode::Vset => format!("{}, {}", vector_name(instr, instr.dest), {
                if instr.immediate() {
                    operand2(instr)
                } else {
                    scalar_name(instr, instr.src1)
                }
            }),
            Opcode::Vsum => format!(
                "{}, {}",
                scalar_name(instr, instr.dest),
                vector_name(instr, instr.src1)
            ),
            _ => format!(
                "{}, {}, {}",
                vector_name(instr, instr.dest),
                vector_name(instr, instr.src1),
                vector_name(instr, instr.src2_imm as u8)
            ),
        },
        OpcodeGroup::Multicore => String::new(),
    }
}

fn scalar_name(instr: &DecodedInstruction, index: u8) -> String {
    if instr.floating() {
        float_register_name(index)
    } else {
        int_register_name(index)
    }
}

fn vector_name(instr: &DecodedInstruction, index: u8) -> String {
    if instr.floating() {
        format!("VF{index}")
    } else {
        format!("VR{index}")
    }
}

/// Second operand: immediate literal or register name.
fn operand2(instr: &DecodedInstruction) -> String {
    if instr.immediate() {
        if instr.floating() {
            format!("#{}", instr.float_imm)
        } else {
            format!("#{}", instr.src2_imm as i32)
        }
    } else {
        scalar_name(instr, instr.src2_imm as u8)
    }
}

/// Memory operand: immediate address or address register.
fn address(instr: &DecodedInstruction) -> String {
    if instr.immediate() {
        format!("[{}]", instr.src2_imm)
    } else {
        format!("[{}]", int_register_name(instr.src1))
    }
}
