//! 4-lane vector unit handlers.
//!
//! Lane arithmetic mirrors the scalar unit per lane, including the
//! divide-by-zero fault for any integer lane. `VLD`/`VST` move four
//! contiguous memory cells; `VSET` broadcasts a scalar; `VSUM` reduces
//! horizontally, accumulating into the scalar destination.

use super::{data_address, ArithOp, ExecOutcome};
use crate::decoder::DecodedInstruction;
use crate::fault::Fault;
use crate::pipeline::Vm;
use crate::state::VECTOR_LANES;

/// Element-wise `VADD`/`VSUB`/`VMUL`/`VDIV` over vector registers.
pub(super) fn lanewise(
    vm: &mut Vm,
    instr: &DecodedInstruction,
    op: ArithOp,
) -> Result<ExecOutcome, Fault> {
    if instr.floating() {
        let a = vm.regs.read_vec_float(u32::from(instr.src1))?;
        let b = vm.regs.read_vec_float(instr.src2_imm)?;
        let mut out = [0.0_f32; VECTOR_LANES];
        for (lane, slot) in out.iter_mut().enumerate() {
            *slot = match op {
                ArithOp::Add => a[lane] + b[lane],
                ArithOp::Sub => a[lane] - b[lane],
                ArithOp::Mul => a[lane] * b[lane],
                ArithOp::Div => a[lane] / b[lane],
            };
        }
        vm.regs.write_vec_float(u32::from(instr.dest), out)?;
    } else {
        let a = vm.regs.read_vec_int(u32::from(instr.src1))?;
        let b = vm.regs.read_vec_int(instr.src2_imm)?;
        let mut out = [0_i32; VECTOR_LANES];
        for (lane, slot) in out.iter_mut().enumerate() {
            *slot = match op {
                ArithOp::Add => a[lane].wrapping_add(b[lane]),
                ArithOp::Sub => a[lane].wrapping_sub(b[lane]),
                ArithOp::Mul => a[lane].wrapping_mul(b[lane]),
                ArithOp::Div => {
                    if b[lane] == 0 {
                        return Err(Fault::DivideByZero);
                    }
                    a[lane].wrapping_div(b[lane])
                }
            };
        }
        vm.regs.write_vec_int(u32::from(instr.dest), out)?;
    }
    Ok(ExecOutcome::Continue)
}

/// `VLD`: load four contiguous cells into a vector register.
pub(super) fn load(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    let base = data_address(vm, instr)?;
    let cells = vm.memory.read_lanes(base)?;
    if instr.floating() {
        let lanes = cells.map(|cell| f32::from_bits(cell as u32));
        vm.regs.write_vec_float(u32::from(instr.dest), lanes)?;
    } else {
        vm.regs.write_vec_int(u32::from(instr.dest), cells)?;
    }
    Ok(ExecOutcome::Continue)
}

/// `VST`: store a vector register to four contiguous cells.
pub(super) fn store(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    let base = data_address(vm, instr)?;
    let cells = if instr.floating() {
        vm.regs
            .read_vec_float(u32::from(instr.dest))?
            .map(|lane| lane.to_bits() as i32)
    } else {
        vm.regs.read_vec_int(u32::from(instr.dest))?
    };
    vm.memory.write_lanes(base, cells)?;
    Ok(ExecOutcome::Continue)
}

/// `VSET`: broadcast a scalar (register or immediate) to all four lanes.
pub(super) fn broadcast(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    if instr.floating() {
        let value = if instr.immediate() {
            instr.float_imm
        } else {
            vm.regs.read_float(u32::from(instr.src1))?
        };
        vm.regs
            .write_vec_float(u32::from(instr.dest), [value; VECTOR_LANES])?;
    } else {
        let value = if instr.immediate() {
            instr.src2_imm as i32
        } else {
            vm.regs.read_int(u32::from(instr.src1))?
        };
        vm.regs
            .write_vec_int(u32::from(instr.dest), [value; VECTOR_LANES])?;
    }
    Ok(ExecOutcome::Continue)
}

/// `VSUM`: horizontal reduction added into the scalar destination.
///
/// Accumulates: the destination is read, summed with the lanes, and written
/// back. Programs wanting a plain reduction clear the destination first.
pub(super) fn reduce(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    if instr.floating() {
        let lanes = vm.regs.read_vec_float(u32::from(instr.src1))?;
        let sum: f32 = lanes.iter().sum();
        let acc = vm.regs.read_float(u32::from(instr.dest))?;
        vm.regs.write_float(u32::from(instr.dest), acc + sum)?;
    } else {
        let lanes = vm.regs.read_vec_int(u32::from(instr.src1))?;
        let mut acc = vm.regs.read_int(u32::from(instr.dest))?;
        for lane in lanes {
            acc = acc.wrapping_add(lane);
        }
        vm.regs.write_int(u32::from(instr.dest), acc)?;
    }
    Ok(ExecOutcome::Continue)
}
