//! Graph-iteration and frontier-control opcode handlers.
//!
//! Iteration state lives in the register file (`niter[0..4]`, `eiter`);
//! the handlers here only consult the CSR store read-only and signal
//! end/empty/miss conditions through the zero flag.

use super::ExecOutcome;
use crate::decoder::DecodedInstruction;
use crate::fault::Fault;
use crate::frontier::FrontierError;
use crate::pipeline::Vm;
use crate::state::NEIGHBOR_CURSOR_COUNT;

fn cursor_index(field: u8) -> Result<usize, Fault> {
    if (field as usize) < NEIGHBOR_CURSOR_COUNT {
        Ok(field as usize)
    } else {
        Err(Fault::IteratorOutOfRange { index: field })
    }
}

const fn frontier_fault(error: FrontierError) -> Fault {
    match error {
        FrontierError::Full => Fault::FrontierOverflow,
        FrontierError::Empty => Fault::FrontierUnderflow,
        FrontierError::Unsupported(_) => Fault::FrontierUnsupported,
    }
}

/// `NITER i`: rewind neighbor cursor `i`.
pub(super) fn neighbor_iter_init(
    vm: &mut Vm,
    instr: &DecodedInstruction,
) -> Result<ExecOutcome, Fault> {
    let i = cursor_index(instr.dest)?;
    vm.regs.set_niter(i, 0);
    Ok(ExecOutcome::Continue)
}

/// `NNEXT i`: load the next neighbor of `Rnode` into `Rnbr`/`Rval` and
/// advance cursor `i`, or set the zero flag at end of row.
pub(super) fn neighbor_next(
    vm: &mut Vm,
    instr: &DecodedInstruction,
) -> Result<ExecOutcome, Fault> {
    let i = cursor_index(instr.dest)?;
    let node = vm.regs.rnode() as u32;
    match vm.graph.neighbor_at(node, vm.regs.niter(i)) {
        Some((neighbor, weight)) => {
            vm.regs.set_rnbr(neighbor as i32);
            vm.regs.set_rval(weight);
            vm.regs.set_niter(i, vm.regs.niter(i) + 1);
            vm.regs.set_zero_flag(false);
        }
        None => vm.regs.set_zero_flag(true),
    }
    Ok(ExecOutcome::Continue)
}

/// `EITER`: start the global edge walk at node 0.
pub(super) fn edge_iter_init(vm: &mut Vm) -> Result<ExecOutcome, Fault> {
    vm.regs.set_eiter(0);
    vm.regs.set_rnode(0);
    Ok(ExecOutcome::Continue)
}

/// `ENEXT`: load the next edge of the global walk into `Rnode`/`Rnbr`/`Rval`,
/// skipping any run of empty rows, or set the zero flag past the last edge.
pub(super) fn edge_next(vm: &mut Vm) -> Result<ExecOutcome, Fault> {
    let node_count = vm.graph.node_count();
    let mut node = vm.regs.rnode() as u32;
    let mut cursor = vm.regs.eiter();

    loop {
        if node >= node_count {
            vm.regs.set_rnode(node as i32);
            vm.regs.set_eiter(cursor);
            vm.regs.set_zero_flag(true);
            return Ok(ExecOutcome::Continue);
        }
        if let Some((neighbor, weight)) = vm.graph.neighbor_at(node, cursor) {
            vm.regs.set_rnode(node as i32);
            vm.regs.set_rnbr(neighbor as i32);
            vm.regs.set_rval(weight);
            vm.regs.set_eiter(cursor + 1);
            vm.regs.set_zero_flag(false);
            return Ok(ExecOutcome::Continue);
        }
        node += 1;
        cursor = 0;
    }
}

/// `HASE`: clear the zero flag iff the edge `Rnode -> Rnbr` exists, so the
/// `HASE; BNZ` idiom branches on hit.
pub(super) fn has_edge(vm: &mut Vm) -> Result<ExecOutcome, Fault> {
    let exists = vm
        .graph
        .has_edge(vm.regs.rnode() as u32, vm.regs.rnbr() as u32);
    vm.regs.set_zero_flag(!exists);
    Ok(ExecOutcome::Continue)
}

/// `DEG r`: degree of node `R[r]` written to `Rval`.
pub(super) fn degree(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    let node = vm.regs.read_int(u32::from(instr.dest))? as u32;
    let degree = vm.graph.degree(node);
    vm.regs.set_rval(degree as i32);
    Ok(ExecOutcome::Continue)
}

/// `FPUSH r`: push `R[r]` onto the next frontier.
pub(super) fn frontier_push(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    let node = vm.regs.read_int(u32::from(instr.dest))?;
    vm.frontiers
        .next_mut()
        .push(node as u32)
        .map_err(frontier_fault)?;
    Ok(ExecOutcome::Continue)
}

/// `FPOP r`: pop the current frontier into `R[r]`.
pub(super) fn frontier_pop(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    let node = vm.frontiers.current_mut().pop().map_err(frontier_fault)?;
    vm.regs.write_int(u32::from(instr.dest), node as i32)?;
    Ok(ExecOutcome::Continue)
}

/// `FEMPTY`: set the zero flag iff the current frontier is empty.
pub(super) fn frontier_empty(vm: &mut Vm) -> Result<ExecOutcome, Fault> {
    let empty = vm.frontiers.current().is_empty();
    vm.regs.set_zero_flag(empty);
    Ok(ExecOutcome::Continue)
}

/// `FSWAP`: exchange frontier roles and clear the fresh next buffer.
pub(super) fn frontier_swap(vm: &mut Vm) -> Result<ExecOutcome, Fault> {
    vm.frontiers.swap();
    Ok(ExecOutcome::Continue)
}

/// `FFILL`: push every node id onto the current frontier.
pub(super) fn frontier_fill(vm: &mut Vm) -> Result<ExecOutcome, Fault> {
    for node in 0..vm.graph.node_count() {
        vm.frontiers
            .current_mut()
            .push(node)
            .map_err(frontier_fault)?;
    }
    Ok(ExecOutcome::Continue)
}

#[cfg(test)]
mod tests {
    use crate::decoder::DecodedInstruction;
    use crate::execute::{execute_instruction, ExecOutcome};
    use crate::fault::Fault;
    use crate::graph::CsrGraph;
    use crate::isa::Opcode;
    use crate::pipeline::Vm;
    use crate::state::{R_ACC, R_TMP1};

    fn instr(opcode: Opcode, dest: u8) -> DecodedInstruction {
        DecodedInstruction {
            opcode,
            flags: 0,
            dest,
            src1: 0,
            src2_imm: 0,
            float_imm: 0.0,
        }
    }

    /// Directed triangle 0->1 (w 10), 0->2 (w 20), 1->2 (w 30) plus an
    /// isolated node 3.
    fn triangle_vm() -> Vm {
        let graph = CsrGraph::new(
            vec![0, 2, 3, 3, 3],
            vec![1, 2, 2],
            vec![10, 20, 30],
        )
        .expect("triangle graph");
        let mut vm = Vm::new();
        vm.install_graph(graph);
        vm
    }

    #[test]
    fn niter_validates_the_cursor_index() {
        let mut vm = triangle_vm();
        assert_eq!(
            execute_instruction(&mut vm, &instr(Opcode::Niter, 3)),
            Ok(ExecOutcome::Continue)
        );
        assert_eq!(
            execute_instruction(&mut vm, &instr(Opcode::Niter, 4)),
            Err(Fault::IteratorOutOfRange { index: 4 })
        );
        assert_eq!(
            execute_instruction(&mut vm, &instr(Opcode::Nnext, 255)),
            Err(Fault::IteratorOutOfRange { index: 255 })
        );
    }

    #[test]
    fn nnext_walks_a_row_then_signals_end() {
        let mut vm = triangle_vm();
        vm.regs.set_rnode(0);
        execute_instruction(&mut vm, &instr(Opcode::Niter, 0)).expect("niter");

        execute_instruction(&mut vm, &instr(Opcode::Nnext, 0)).expect("nnext");
        assert!(!vm.regs.zero_flag());
        assert_eq!(vm.regs.rnbr(), 1);
        assert_eq!(vm.regs.read_int(2), Ok(10));

        execute_instruction(&mut vm, &instr(Opcode::Nnext, 0)).expect("nnext");
        assert_eq!(vm.regs.rnbr(), 2);
        assert_eq!(vm.regs.read_int(2), Ok(20));

        execute_instruction(&mut vm, &instr(Opcode::Nnext, 0)).expect("nnext");
        assert!(vm.regs.zero_flag());
        // Rnbr keeps its last loaded value at end of row.
        assert_eq!(vm.regs.rnbr(), 2);
    }

    #[test]
    fn independent_cursors_walk_the_same_row_independently() {
        let mut vm = triangle_vm();
        vm.regs.set_rnode(0);
        execute_instruction(&mut vm, &instr(Opcode::Niter, 0)).expect("niter");
        execute_instruction(&mut vm, &instr(Opcode::Niter, 1)).expect("niter");

        execute_instruction(&mut vm, &instr(Opcode::Nnext, 0)).expect("nnext");
        execute_instruction(&mut vm, &instr(Opcode::Nnext, 0)).expect("nnext");
        assert_eq!(vm.regs.niter(0), 2);
        assert_eq!(vm.regs.niter(1), 0);

        execute_instruction(&mut vm, &instr(Opcode::Nnext, 1)).expect("nnext");
        assert_eq!(vm.regs.rnbr(), 1);
    }

    #[test]
    fn enext_walks_every_edge_skipping_empty_rows() {
        let mut vm = triangle_vm();
        execute_instruction(&mut vm, &instr(Opcode::Eiter, 0)).expect("eiter");

        let mut edges = Vec::new();
        loop {
            execute_instruction(&mut vm, &instr(Opcode::Enext, 0)).expect("enext");
            if vm.regs.zero_flag() {
                break;
            }
            edges.push((vm.regs.rnode(), vm.regs.rnbr(), vm.regs.read_int(2).unwrap()));
        }

        assert_eq!(edges, vec![(0, 1, 10), (0, 2, 20), (1, 2, 30)]);
    }

    #[test]
    fn enext_on_an_empty_graph_signals_end_immediately() {
        let mut vm = Vm::new();
        execute_instruction(&mut vm, &instr(Opcode::Eiter, 0)).expect("eiter");
        execute_instruction(&mut vm, &instr(Opcode::Enext, 0)).expect("enext");
        assert!(vm.regs.zero_flag());
    }

    #[test]
    fn hase_clears_zero_on_hit_and_sets_it_on_miss() {
        let mut vm = triangle_vm();

        vm.regs.set_rnode(0);
        vm.regs.set_rnbr(2);
        execute_instruction(&mut vm, &instr(Opcode::Hase, 0)).expect("hase");
        assert!(!vm.regs.zero_flag());

        vm.regs.set_rnbr(3);
        execute_instruction(&mut vm, &instr(Opcode::Hase, 0)).expect("hase");
        assert!(vm.regs.zero_flag());

        // Directed store: the reverse edge 1 -> 0 does not exist.
        vm.regs.set_rnode(1);
        vm.regs.set_rnbr(0);
        execute_instruction(&mut vm, &instr(Opcode::Hase, 0)).expect("hase");
        assert!(vm.regs.zero_flag());
    }

    #[test]
    fn deg_reads_the_node_from_the_named_register() {
        let mut vm = triangle_vm();
        vm.regs.write_int(u32::from(R_TMP1), 0).expect("write");

        execute_instruction(&mut vm, &instr(Opcode::Deg, R_TMP1)).expect("deg");
        assert_eq!(vm.regs.read_int(2), Ok(2));

        vm.regs.write_int(u32::from(R_TMP1), 3).expect("write");
        execute_instruction(&mut vm, &instr(Opcode::Deg, R_TMP1)).expect("deg");
        assert_eq!(vm.regs.read_int(2), Ok(0));
    }

    #[test]
    fn fpush_targets_next_and_fpop_drains_current() {
        let mut vm = triangle_vm();

        vm.regs.write_int(u32::from(R_ACC), 2).expect("write");
        execute_instruction(&mut vm, &instr(Opcode::Fpush, R_ACC)).expect("fpush");

        // Current is still empty; pop must underflow.
        assert_eq!(
            execute_instruction(&mut vm, &instr(Opcode::Fpop, R_TMP1)),
            Err(Fault::FrontierUnderflow)
        );

        execute_instruction(&mut vm, &instr(Opcode::Fswap, 0)).expect("fswap");
        execute_instruction(&mut vm, &instr(Opcode::Fpop, R_TMP1)).expect("fpop");
        assert_eq!(vm.regs.read_int(u32::from(R_TMP1)), Ok(2));
    }

    #[test]
    fn fempty_tracks_the_current_frontier_only() {
        let mut vm = triangle_vm();

        execute_instruction(&mut vm, &instr(Opcode::Fempty, 0)).expect("fempty");
        assert!(vm.regs.zero_flag());

        vm.regs.write_int(u32::from(R_ACC), 1).expect("write");
        execute_instruction(&mut vm, &instr(Opcode::Fpush, R_ACC)).expect("fpush");
        execute_instruction(&mut vm, &instr(Opcode::Fempty, 0)).expect("fempty");
        assert!(vm.regs.zero_flag(), "push went to next, current still empty");

        execute_instruction(&mut vm, &instr(Opcode::Fswap, 0)).expect("fswap");
        execute_instruction(&mut vm, &instr(Opcode::Fempty, 0)).expect("fempty");
        assert!(!vm.regs.zero_flag());
    }

    #[test]
    fn ffill_seeds_current_with_every_node() {
        let mut vm = triangle_vm();
        execute_instruction(&mut vm, &instr(Opcode::Ffill, 0)).expect("ffill");

        let mut drained = Vec::new();
        while !vm.frontiers.current().is_empty() {
            execute_instruction(&mut vm, &instr(Opcode::Fpop, R_TMP1)).expect("fpop");
            drained.push(vm.regs.read_int(u32::from(R_TMP1)).unwrap());
        }
        assert_eq!(drained, vec![0, 1, 2, 3]);
    }
}
