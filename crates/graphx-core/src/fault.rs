use thiserror::Error;

/// Fault classes used for diagnostics aggregation and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Decoder rejected an instruction word.
    Decode,
    /// Branch target, memory address, iterator, or register index out of range.
    Bounds,
    /// Arithmetic violation (integer divide-by-zero).
    Arithmetic,
    /// Frontier capacity or backend violation.
    Frontier,
}

/// Register banks addressable by instruction register fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterBank {
    /// Scalar integer bank (24 registers).
    Int,
    /// Scalar float bank (18 registers).
    Float,
    /// Integer vector bank (16 registers, 4 lanes).
    VectorInt,
    /// Float vector bank (16 registers, 4 lanes).
    VectorFloat,
}

impl RegisterBank {
    /// Lowercase bank label used in fault messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Int => "integer",
            Self::Float => "float",
            Self::VectorInt => "integer vector",
            Self::VectorFloat => "float vector",
        }
    }
}

/// Stable execute/decode fault taxonomy.
///
/// Every fault is fatal to the run: the pipeline latches it and stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// Opcode byte is outside the enumerated instruction set.
    #[error("unknown opcode {opcode:#04X}")]
    UnknownOpcode {
        /// Raw opcode byte from the instruction word.
        opcode: u8,
    },
    /// Branch or jump target is outside program memory.
    #[error("branch target {target} outside program memory")]
    BranchOutOfRange {
        /// Requested target word index.
        target: u32,
    },
    /// Data memory address is outside the 65536-word array.
    #[error("memory address {address} outside data memory")]
    MemoryOutOfRange {
        /// Requested word address (sign-extended from the source register).
        address: i64,
    },
    /// Neighbor iterator index is outside `0..4`.
    #[error("iterator index {index} outside 0..4")]
    IteratorOutOfRange {
        /// Requested iterator index.
        index: u8,
    },
    /// Register field addresses past the end of its bank.
    #[error("{} register index {index} out of range", .bank.label())]
    RegisterOutOfRange {
        /// Bank the field addressed.
        bank: RegisterBank,
        /// Requested register index.
        index: u32,
    },
    /// Integer division by zero (scalar `DIV` or a `VDIV` lane).
    #[error("integer division by zero")]
    DivideByZero,
    /// Push onto a full frontier.
    #[error("frontier push overflow")]
    FrontierOverflow,
    /// Pop from an empty frontier.
    #[error("frontier pop underflow")]
    FrontierUnderflow,
    /// Frontier operation on a backend kind with no implementation.
    #[error("frontier backend not implemented")]
    FrontierUnsupported,
}

impl Fault {
    /// Converts a fault to its stable low-byte report code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::UnknownOpcode { .. } => 0x01,
            Self::BranchOutOfRange { .. } => 0x02,
            Self::MemoryOutOfRange { .. } => 0x03,
            Self::IteratorOutOfRange { .. } => 0x04,
            Self::RegisterOutOfRange { .. } => 0x05,
            Self::DivideByZero => 0x06,
            Self::FrontierOverflow => 0x07,
            Self::FrontierUnderflow => 0x08,
            Self::FrontierUnsupported => 0x09,
        }
    }

    /// Returns the diagnostics class for this fault.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::UnknownOpcode { .. } => FaultClass::Decode,
            Self::BranchOutOfRange { .. }
            | Self::MemoryOutOfRange { .. }
            | Self::IteratorOutOfRange { .. }
            | Self::RegisterOutOfRange { .. } => FaultClass::Bounds,
            Self::DivideByZero => FaultClass::Arithmetic,
            Self::FrontierOverflow | Self::FrontierUnderflow | Self::FrontierUnsupported => {
                FaultClass::Frontier
            }
        }
    }
}
