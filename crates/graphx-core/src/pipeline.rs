//! Fetch–decode–execute pipeline and the VM owner type.
//!
//! The VM owns program memory, data memory, the CSR graph, the frontier
//! pair, and the register file. Execution is synchronous: one instruction
//! per `step`, no suspension. A program counter at or past the end of
//! program memory halts gracefully; decode and execute faults latch an
//! error status and stop the run.

use crate::decoder::{DecodedInstruction, Decoder};
use crate::execute::{execute_instruction, ExecOutcome};
use crate::fault::Fault;
use crate::frontier::{FrontierKind, FrontierPair};
use crate::graph::CsrGraph;
use crate::loader::{LoadError, ProgramImage};
use crate::state::{DataMemory, RegisterFile, MEMORY_WORDS};

/// Program memory size in 64-bit instruction words.
pub const PROGRAM_WORDS: usize = 8192;

/// Host-observable execution state of a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum VmStatus {
    /// Ready to execute the next instruction.
    #[default]
    Running,
    /// Stopped gracefully via `HALT` or the program-memory boundary.
    Halted,
    /// Fault is latched; no further progress without reset.
    Errored(Fault),
}

impl VmStatus {
    /// Returns the latched fault, if this status is errored.
    #[must_use]
    pub const fn fault(self) -> Option<Fault> {
        match self {
            Self::Errored(fault) => Some(fault),
            Self::Running | Self::Halted => None,
        }
    }
}

/// Observer hooks fired at step and exit boundaries.
///
/// Both methods default to no-ops; the CLI installs a printing observer
/// under `--debug` and tests install recording observers. Hooks are
/// synchronous and must not assume re-entrancy.
pub trait VmObserver {
    /// Fired after each instruction that reached the executor (including
    /// the halting or faulting one).
    fn on_step(&mut self, vm: &Vm) {
        let _ = vm;
    }

    /// Fired once when the run stops. The offending instruction for an
    /// error is at [`Vm::last_pc`], since the fetch already advanced.
    fn on_exit(&mut self, vm: &Vm, status: VmStatus) {
        let _ = (vm, status);
    }
}

struct NoopObserver;

impl VmObserver for NoopObserver {}

/// The GraphX virtual machine.
pub struct Vm {
    program: Box<[u64]>,
    pub(crate) memory: DataMemory,
    pub(crate) graph: CsrGraph,
    pub(crate) frontiers: FrontierPair,
    pub(crate) regs: RegisterFile,
    status: VmStatus,
    clock: u64,
    last_decoded: Option<DecodedInstruction>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Creates a VM with zeroed program and data memory, an empty graph,
    /// and an empty queue-kind frontier pair.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: vec![0; PROGRAM_WORDS].into_boxed_slice(),
            memory: DataMemory::new(),
            graph: CsrGraph::empty(),
            frontiers: FrontierPair::new(FrontierKind::Queue),
            regs: RegisterFile::default(),
            status: VmStatus::Running,
            clock: 0,
            last_decoded: None,
        }
    }

    /// Builds a VM from a program image.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when a hand-built image exceeds program or
    /// data-memory capacity (images from the loader are already bounded).
    pub fn from_image(image: ProgramImage) -> Result<Self, LoadError> {
        let mut vm = Self::new();
        vm.load_program(&image.code)?;
        vm.install_graph(image.graph);
        vm.init_memory(&image.memory)?;
        Ok(vm)
    }

    /// Installs a program, zero-filling the rest of program memory.
    ///
    /// Unwritten words decode as `HALT`, so running off the end of the
    /// loaded code stops gracefully.
    ///
    /// # Errors
    ///
    /// [`LoadError::ProgramTooLarge`] past 8192 words.
    pub fn load_program(&mut self, words: &[u64]) -> Result<(), LoadError> {
        if words.len() > PROGRAM_WORDS {
            return Err(LoadError::ProgramTooLarge {
                words: words.len() as u32,
            });
        }
        self.program.fill(0);
        self.program[..words.len()].copy_from_slice(words);
        Ok(())
    }

    /// Replaces the graph.
    pub fn install_graph(&mut self, graph: CsrGraph) {
        self.graph = graph;
    }

    /// Clears data memory and copies in an initial image.
    ///
    /// # Errors
    ///
    /// [`LoadError::MemoryTooLarge`] past 65536 words.
    pub fn init_memory(&mut self, words: &[i32]) -> Result<(), LoadError> {
        if words.len() > MEMORY_WORDS {
            return Err(LoadError::MemoryTooLarge {
                words: words.len() as u32,
            });
        }
        self.memory.clear();
        self.memory.load_initial(words);
        Ok(())
    }

    /// Current execution status.
    #[must_use]
    pub const fn status(&self) -> VmStatus {
        self.status
    }

    /// Retired-instruction counter. A faulting instruction does not retire.
    #[must_use]
    pub const fn clock(&self) -> u64 {
        self.clock
    }

    /// Register file, condition flags, and iteration cursors.
    #[must_use]
    pub const fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    /// Data memory.
    #[must_use]
    pub const fn memory(&self) -> &DataMemory {
        &self.memory
    }

    /// The CSR graph.
    #[must_use]
    pub const fn graph(&self) -> &CsrGraph {
        &self.graph
    }

    /// The frontier pair.
    #[must_use]
    pub const fn frontiers(&self) -> &FrontierPair {
        &self.frontiers
    }

    /// The most recently decoded instruction, retained for debug reporting.
    #[must_use]
    pub const fn last_decoded(&self) -> Option<DecodedInstruction> {
        self.last_decoded
    }

    /// Program counter of the most recently fetched instruction.
    ///
    /// The fetch auto-increments, so after a stop this addresses the word
    /// that halted or faulted.
    #[must_use]
    pub const fn last_pc(&self) -> u32 {
        self.regs.pc().saturating_sub(1)
    }

    /// Raw program word at `pc`, for disassembly in fault reports.
    #[must_use]
    pub fn program_word(&self, pc: u32) -> Option<u64> {
        self.program.get(pc as usize).copied()
    }

    /// Executes one pipeline tick. Returns the status afterwards.
    pub fn step(&mut self) -> VmStatus {
        self.step_internal();
        self.status
    }

    /// Runs to completion without observation.
    pub fn run(&mut self) -> VmStatus {
        self.run_with(&mut NoopObserver)
    }

    /// Runs to completion, firing the observer at step and exit boundaries.
    pub fn run_with(&mut self, observer: &mut dyn VmObserver) -> VmStatus {
        while matches!(self.status, VmStatus::Running) {
            if self.step_internal() {
                observer.on_step(self);
            }
        }
        observer.on_exit(self, self.status);
        self.status
    }

    /// Restores the post-construction state: registers, flags, iterators,
    /// data memory, frontiers, clock, and status. Program and graph are
    /// preserved.
    pub fn reset(&mut self) {
        self.regs = RegisterFile::default();
        self.memory.clear();
        self.frontiers.reset(FrontierKind::Queue);
        self.status = VmStatus::Running;
        self.clock = 0;
        self.last_decoded = None;
    }

    /// One fetch–decode–execute tick. Returns true when an instruction
    /// reached the executor (the observer's step-hook condition).
    fn step_internal(&mut self) -> bool {
        if !matches!(self.status, VmStatus::Running) {
            return false;
        }

        let pc = self.regs.pc();
        if pc as usize >= PROGRAM_WORDS {
            // Graceful end of program, not an error.
            self.status = VmStatus::Halted;
            return false;
        }

        let word = self.program[pc as usize];
        self.regs.set_pc(pc + 1);

        let instr = match Decoder::decode(word) {
            Ok(instr) => instr,
            Err(fault) => {
                self.status = VmStatus::Errored(fault);
                return false;
            }
        };
        self.last_decoded = Some(instr);

        match execute_instruction(self, &instr) {
            Ok(ExecOutcome::Continue) => {
                self.clock += 1;
            }
            Ok(ExecOutcome::Halt) => {
                self.clock += 1;
                self.status = VmStatus::Halted;
            }
            Err(fault) => {
                self.status = VmStatus::Errored(fault);
            }
        }
        true
    }
}
