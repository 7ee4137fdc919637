//! Immutable compressed-sparse-row adjacency store.
//!
//! Neighbors of node `u` occupy `col_index[row_index[u]..row_index[u + 1]]`,
//! with per-edge weights aligned in `values`. Rows are sorted by neighbor id
//! so edge lookup is a binary search.

use thiserror::Error;

/// CSR shape violations rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum GraphShapeError {
    /// `row_index` is missing the leading 0 sentinel entry.
    #[error("row index must contain at least one entry")]
    EmptyRowIndex,
    /// `row_index` decreased between consecutive rows.
    #[error("row index not non-decreasing at row {row}")]
    RowIndexNotMonotonic {
        /// First row whose prefix sum decreased.
        row: u32,
    },
    /// `col_index` length disagrees with the final prefix sum.
    #[error("edge array length {cols} does not match row index total {total}")]
    EdgeCountMismatch {
        /// Length of `col_index`.
        cols: usize,
        /// Final `row_index` entry.
        total: u32,
    },
    /// `values` length disagrees with `col_index` length.
    #[error("weight array length {values} does not match edge count {cols}")]
    WeightCountMismatch {
        /// Length of `values`.
        values: usize,
        /// Length of `col_index`.
        cols: usize,
    },
}

/// Immutable CSR graph owned by one VM and read-only during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrGraph {
    node_count: u32,
    row_index: Box<[u32]>,
    col_index: Box<[u32]>,
    values: Box<[i32]>,
}

impl Default for CsrGraph {
    fn default() -> Self {
        Self::empty()
    }
}

impl CsrGraph {
    /// Creates the zero-node graph.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            node_count: 0,
            row_index: vec![0].into_boxed_slice(),
            col_index: Box::default(),
            values: Box::default(),
        }
    }

    /// Builds a graph from raw CSR arrays, validating shape invariants.
    ///
    /// `row_index` must hold `n + 1` non-decreasing prefix sums whose final
    /// entry equals the edge count. Row-local neighbor ordering is the
    /// producer's contract and is not re-sorted here.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphShapeError`] naming the violated invariant.
    pub fn new(
        row_index: Vec<u32>,
        col_index: Vec<u32>,
        values: Vec<i32>,
    ) -> Result<Self, GraphShapeError> {
        let Some((&total, _)) = row_index.split_last() else {
            return Err(GraphShapeError::EmptyRowIndex);
        };

        for (row, pair) in row_index.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(GraphShapeError::RowIndexNotMonotonic { row: row as u32 });
            }
        }

        if col_index.len() != total as usize {
            return Err(GraphShapeError::EdgeCountMismatch {
                cols: col_index.len(),
                total,
            });
        }

        if values.len() != col_index.len() {
            return Err(GraphShapeError::WeightCountMismatch {
                values: values.len(),
                cols: col_index.len(),
            });
        }

        Ok(Self {
            node_count: (row_index.len() - 1) as u32,
            row_index: row_index.into_boxed_slice(),
            col_index: col_index.into_boxed_slice(),
            values: values.into_boxed_slice(),
        })
    }

    /// Number of nodes.
    #[must_use]
    pub const fn node_count(&self) -> u32 {
        self.node_count
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> u32 {
        self.row_index[self.node_count as usize]
    }

    /// Out-degree of `u`. Nodes outside `0..node_count` have degree 0.
    #[must_use]
    pub fn degree(&self, u: u32) -> u32 {
        let Some((start, end)) = self.row_bounds(u) else {
            return 0;
        };
        (end - start) as u32
    }

    /// Neighbor slice of `u`, empty for out-of-range nodes.
    #[must_use]
    pub fn neighbors(&self, u: u32) -> &[u32] {
        match self.row_bounds(u) {
            Some((start, end)) => &self.col_index[start..end],
            None => &[],
        }
    }

    /// True when the directed edge `u -> v` exists.
    #[must_use]
    pub fn has_edge(&self, u: u32, v: u32) -> bool {
        self.neighbors(u).binary_search(&v).is_ok()
    }

    /// Weight of edge `u -> v`, or 0 on miss.
    ///
    /// Zero therefore doubles as "no edge"; callers that allow zero-weight
    /// edges must gate on [`Self::has_edge`] first.
    #[must_use]
    pub fn weight(&self, u: u32, v: u32) -> i32 {
        let Some((start, end)) = self.row_bounds(u) else {
            return 0;
        };
        match self.col_index[start..end].binary_search(&v) {
            Ok(offset) => self.values[start + offset],
            Err(_) => 0,
        }
    }

    /// Neighbor and weight at `offset` within u's row, `None` past the end.
    #[must_use]
    pub fn neighbor_at(&self, u: u32, offset: u32) -> Option<(u32, i32)> {
        let (start, end) = self.row_bounds(u)?;
        let index = start.checked_add(offset as usize)?;
        if index >= end {
            return None;
        }
        Some((self.col_index[index], self.values[index]))
    }

    fn row_bounds(&self, u: u32) -> Option<(usize, usize)> {
        if u >= self.node_count {
            return None;
        }
        let u = u as usize;
        Some((self.row_index[u] as usize, self.row_index[u + 1] as usize))
    }
}
