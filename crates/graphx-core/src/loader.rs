//! Binary program image loader.
//!
//! Image layout (little-endian, packed, no padding):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0  | 4 | `code_len` (u32, 64-bit words) |
//! | 4  | 4 | `row_index_len` (u32, equals `n + 1`) |
//! | 8  | 4 | `col_index_len` (u32, equals edge count) |
//! | 12 | 4 | `values_len` (u32) |
//! | 16 | 4 | `mem_len` (u32, initial 32-bit data words) |
//! | 20 | 8·code_len | program words |
//! | ...  | 4·each | row index, column index, values, initial memory |
//!
//! Trailing bytes after the last section are tolerated.

use thiserror::Error;

use crate::graph::{CsrGraph, GraphShapeError};
use crate::pipeline::PROGRAM_WORDS;
use crate::state::MEMORY_WORDS;

/// Fixed header size in bytes.
pub const HEADER_BYTES: usize = 20;

/// Capacity of each graph section in 32-bit entries.
pub const GRAPH_SECTION_WORDS: usize = 65536;

/// Image rejection taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Image ended before a section was fully read.
    #[error("truncated {section} section: need {needed} bytes, have {available}")]
    Truncated {
        /// Section that could not be read.
        section: &'static str,
        /// Bytes the section requires.
        needed: usize,
        /// Bytes remaining in the image.
        available: usize,
    },
    /// Program section exceeds the 8192-word program memory.
    #[error("program section of {words} words exceeds program memory (8192 words)")]
    ProgramTooLarge {
        /// Declared program length in words.
        words: u32,
    },
    /// Memory section exceeds the 65536-word data memory.
    #[error("memory section of {words} words exceeds data memory (65536 words)")]
    MemoryTooLarge {
        /// Declared memory length in words.
        words: u32,
    },
    /// A graph section exceeds its 65536-entry capacity.
    #[error("{section} section of {words} words exceeds graph capacity (65536 words)")]
    GraphSectionTooLarge {
        /// Offending section name.
        section: &'static str,
        /// Declared section length in entries.
        words: u32,
    },
    /// Graph sections parsed but violate CSR shape invariants.
    #[error(transparent)]
    Graph(#[from] GraphShapeError),
}

/// A parsed and validated program image, ready to install into a VM.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramImage {
    /// Program words, at most 8192.
    pub code: Vec<u64>,
    /// Validated CSR graph.
    pub graph: CsrGraph,
    /// Initial data-memory words, at most 65536.
    pub memory: Vec<i32>,
}

impl ProgramImage {
    /// Parses an image from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] for a short header, capacity violations,
    /// truncated sections, or malformed CSR arrays.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut cursor = Cursor { bytes, offset: 0 };

        let code_len = cursor.read_u32("header")?;
        let row_index_len = cursor.read_u32("header")?;
        let col_index_len = cursor.read_u32("header")?;
        let values_len = cursor.read_u32("header")?;
        let mem_len = cursor.read_u32("header")?;

        if code_len as usize > PROGRAM_WORDS {
            return Err(LoadError::ProgramTooLarge { words: code_len });
        }
        if mem_len as usize > MEMORY_WORDS {
            return Err(LoadError::MemoryTooLarge { words: mem_len });
        }
        for (section, words) in [
            ("row index", row_index_len),
            ("column index", col_index_len),
            ("values", values_len),
        ] {
            if words as usize > GRAPH_SECTION_WORDS {
                return Err(LoadError::GraphSectionTooLarge { section, words });
            }
        }

        let code = cursor
            .take(code_len as usize * 8, "program")?
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0_u8; 8];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .collect();

        let row_index = cursor.read_u32_section(row_index_len, "row index")?;
        let col_index = cursor.read_u32_section(col_index_len, "column index")?;
        let values = cursor
            .read_u32_section(values_len, "values")?
            .into_iter()
            .map(|word| word as i32)
            .collect();
        let memory = cursor
            .read_u32_section(mem_len, "memory")?
            .into_iter()
            .map(|word| word as i32)
            .collect();

        let graph = if row_index.is_empty() && col_index.is_empty() {
            CsrGraph::empty()
        } else {
            CsrGraph::new(row_index, col_index, values)?
        };

        Ok(Self {
            code,
            graph,
            memory,
        })
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize, section: &'static str) -> Result<&'a [u8], LoadError> {
        let available = self.bytes.len() - self.offset;
        if len > available {
            return Err(LoadError::Truncated {
                section,
                needed: len,
                available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn read_u32(&mut self, section: &'static str) -> Result<u32, LoadError> {
        let chunk = self.take(4, section)?;
        let mut word = [0_u8; 4];
        word.copy_from_slice(chunk);
        Ok(u32::from_le_bytes(word))
    }

    fn read_u32_section(&mut self, count: u32, section: &'static str) -> Result<Vec<u32>, LoadError> {
        Ok(self
            .take(count as usize * 4, section)?
            .chunks_exact(4)
            .map(|chunk| {
                let mut word = [0_u8; 4];
                word.copy_from_slice(chunk);
                u32::from_le_bytes(word)
            })
            .collect())
    }
}
