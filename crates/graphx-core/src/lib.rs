//! Core VM crate for the GraphX graph-processing accelerator.
//!
//! GraphX executes a fixed-width 64-bit instruction set tailored to
//! frontier-based graph algorithms. This crate is the software VM: the
//! decoder, the typed register files, the graph-aware opcodes over an
//! immutable CSR store, the double-buffered frontier subsystem, the 4-lane
//! vector unit, and the fetch–decode–execute pipeline.

/// Immutable CSR adjacency store and its queries.
pub mod graph;
pub use graph::{CsrGraph, GraphShapeError};

/// Frontier containers and the level-synchronous pair.
pub mod frontier;
pub use frontier::{Frontier, FrontierError, FrontierKind, FrontierPair, FRONTIER_CAPACITY};

/// Architectural register banks, condition flags, and data memory.
pub mod state;
pub use state::{
    float_register_name, int_register_name, DataMemory, RegisterFile, FLAG_NEGATIVE,
    FLAG_POSITIVE, FLAG_ZERO, FLOAT_REGISTER_COUNT, F_ACC, F_TMP1, F_ZERO, INT_REGISTER_COUNT,
    MEMORY_WORDS, NEIGHBOR_CURSOR_COUNT, R_ACC, R_CORE, R_NBR, R_NODE, R_TMP1, R_VAL, R_ZERO,
    VECTOR_LANES, VECTOR_REGISTER_COUNT,
};

/// Instruction-set assignment tables.
pub mod isa;
pub use isa::{Opcode, OpcodeGroup, OPCODE_TABLE};

/// Instruction decoder and the decoded value type.
pub mod decoder;
pub use decoder::{encode_word, DecodedInstruction, Decoder, MODE_FLOAT, MODE_IMMEDIATE};

/// Decode/execute fault taxonomy.
pub mod fault;
pub use fault::{Fault, FaultClass, RegisterBank};

/// Instruction execution.
pub mod execute;
pub use execute::{execute_instruction, ExecOutcome};

/// Fetch–decode–execute pipeline and the VM owner type.
pub mod pipeline;
pub use pipeline::{Vm, VmObserver, VmStatus, PROGRAM_WORDS};

/// Binary program image loader.
pub mod loader;
pub use loader::{LoadError, ProgramImage, GRAPH_SECTION_WORDS, HEADER_BYTES};

/// Instruction formatting for traces and fault reports.
pub mod disasm;
pub use disasm::{disassemble_word, format_operands, DisasmRow};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
