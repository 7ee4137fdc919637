//! Frontier containers for level-synchronous graph traversal.
//!
//! A frontier is a kind-tagged node container. Only the FIFO queue backend
//! is implemented; the other kinds are declarable for forward compatibility
//! and fail every operation. The queue is a power-of-two ring buffer with
//! monotonically increasing `front`/`back` counters, so emptiness
//! (`front == back`) and fullness (`back - front == capacity`) need no
//! modulo arithmetic.

use thiserror::Error;

/// Fixed frontier capacity in nodes; a power of two so indices mask.
pub const FRONTIER_CAPACITY: usize = 1024;

/// Backend kind of a frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FrontierKind {
    /// FIFO ring buffer, the level-synchronous BFS workhorse.
    #[default]
    Queue,
    /// Priority queue, reserved for weighted traversals.
    PriorityQueue,
    /// Bucket queue, reserved for delta-stepping.
    BucketQueue,
    /// Membership set, reserved for sparse-dense switching.
    Set,
}

/// Frontier operation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum FrontierError {
    /// Push attempted while `back - front == capacity`.
    #[error("frontier is full")]
    Full,
    /// Pop attempted while `front == back`.
    #[error("frontier is empty")]
    Empty,
    /// Operation on a backend kind that has no implementation yet.
    #[error("frontier kind {0:?} is not implemented")]
    Unsupported(FrontierKind),
}

/// A single frontier buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontier {
    kind: FrontierKind,
    data: Box<[u32]>,
    front: u64,
    back: u64,
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new(FrontierKind::Queue)
    }
}

impl Frontier {
    /// Creates an empty frontier of the given kind.
    #[must_use]
    pub fn new(kind: FrontierKind) -> Self {
        Self {
            kind,
            data: vec![0; FRONTIER_CAPACITY].into_boxed_slice(),
            front: 0,
            back: 0,
        }
    }

    /// Resets to empty and records the kind. Clears in place, no reallocation.
    pub fn init(&mut self, kind: FrontierKind) {
        self.kind = kind;
        self.data.fill(0);
        self.front = 0;
        self.back = 0;
    }

    /// Backend kind of this frontier.
    #[must_use]
    pub const fn kind(&self) -> FrontierKind {
        self.kind
    }

    /// Number of queued nodes.
    #[must_use]
    pub const fn len(&self) -> usize {
        (self.back - self.front) as usize
    }

    /// True when no nodes are queued.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.front == self.back
    }

    /// Enqueues a node id.
    ///
    /// # Errors
    ///
    /// [`FrontierError::Full`] at capacity, [`FrontierError::Unsupported`]
    /// for non-queue kinds.
    pub fn push(&mut self, node: u32) -> Result<(), FrontierError> {
        self.require_queue()?;
        if self.len() == FRONTIER_CAPACITY {
            return Err(FrontierError::Full);
        }
        self.data[(self.back as usize) & (FRONTIER_CAPACITY - 1)] = node;
        self.back += 1;
        Ok(())
    }

    /// Dequeues the oldest node id.
    ///
    /// # Errors
    ///
    /// [`FrontierError::Empty`] when drained, [`FrontierError::Unsupported`]
    /// for non-queue kinds.
    pub fn pop(&mut self) -> Result<u32, FrontierError> {
        self.require_queue()?;
        if self.is_empty() {
            return Err(FrontierError::Empty);
        }
        let node = self.data[(self.front as usize) & (FRONTIER_CAPACITY - 1)];
        self.front += 1;
        Ok(node)
    }

    const fn require_queue(&self) -> Result<(), FrontierError> {
        match self.kind {
            FrontierKind::Queue => Ok(()),
            other => Err(FrontierError::Unsupported(other)),
        }
    }
}

/// The VM's double-buffered frontier pair.
///
/// `current` is drained by `FPOP`/`FEMPTY`/`FFILL`, `next` is filled by
/// `FPUSH`; `swap` exchanges the roles and clears the fresh `next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierPair {
    buffers: [Frontier; 2],
    current: usize,
}

impl Default for FrontierPair {
    fn default() -> Self {
        Self::new(FrontierKind::Queue)
    }
}

impl FrontierPair {
    /// Creates a pair of empty frontiers of the given kind.
    #[must_use]
    pub fn new(kind: FrontierKind) -> Self {
        Self {
            buffers: [Frontier::new(kind), Frontier::new(kind)],
            current: 0,
        }
    }

    /// The frontier being drained this level.
    #[must_use]
    pub fn current(&self) -> &Frontier {
        &self.buffers[self.current]
    }

    /// Mutable access to the frontier being drained this level.
    pub fn current_mut(&mut self) -> &mut Frontier {
        &mut self.buffers[self.current]
    }

    /// The frontier being filled for the next level.
    #[must_use]
    pub fn next(&self) -> &Frontier {
        &self.buffers[1 - self.current]
    }

    /// Mutable access to the frontier being filled for the next level.
    pub fn next_mut(&mut self) -> &mut Frontier {
        &mut self.buffers[1 - self.current]
    }

    /// Exchanges the roles and re-initializes the fresh `next` to empty of
    /// the same kind. Contents swap by role flip, not by copying.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
        let kind = self.next().kind();
        self.next_mut().init(kind);
    }

    /// Re-initializes both buffers to empty queues of the given kind and
    /// restores the initial role assignment.
    pub fn reset(&mut self, kind: FrontierKind) {
        self.current = 0;
        self.buffers[0].init(kind);
        self.buffers[1].init(kind);
    }
}
