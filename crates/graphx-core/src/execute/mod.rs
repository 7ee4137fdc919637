//! Instruction execution for the GraphX ISA.
//!
//! Dispatch is exhaustive over [`Opcode`]: adding an opcode is a
//! compile-time obligation to handle it here. Every handler either returns
//! an outcome or a [`Fault`]; a faulting instruction leaves the pipeline to
//! latch the error and stop.

mod graph_ops;
mod vector;

use crate::decoder::DecodedInstruction;
use crate::fault::Fault;
use crate::isa::Opcode;
use crate::pipeline::{Vm, PROGRAM_WORDS};

/// Outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Instruction retired; the pipeline continues.
    Continue,
    /// `HALT` retired; the pipeline stops gracefully.
    Halt,
}

/// Scalar and vector arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Branch predicates over the condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchOp {
    Always,
    Zero,
    NotZero,
    Negative,
    NonNegative,
}

/// Executes one decoded instruction against the VM state.
///
/// # Errors
///
/// Returns the [`Fault`] raised by the instruction; no partial retirement
/// bookkeeping is done here (the pipeline owns clock and status).
pub fn execute_instruction(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    match instr.opcode {
        Opcode::Halt => Ok(ExecOutcome::Halt),
        Opcode::Jmp => branch(vm, instr, BranchOp::Always),
        Opcode::Bz => branch(vm, instr, BranchOp::Zero),
        Opcode::Bnz => branch(vm, instr, BranchOp::NotZero),
        Opcode::Blt => branch(vm, instr, BranchOp::Negative),
        Opcode::Bge => branch(vm, instr, BranchOp::NonNegative),
        Opcode::Add => binary_arith(vm, instr, ArithOp::Add),
        Opcode::Sub => binary_arith(vm, instr, ArithOp::Sub),
        Opcode::Mul => binary_arith(vm, instr, ArithOp::Mul),
        Opcode::Div => binary_arith(vm, instr, ArithOp::Div),
        Opcode::Cmp => compare(vm, instr),
        Opcode::Mov => mov(vm, instr),
        Opcode::Movc => convert(vm, instr),
        Opcode::Ld => load(vm, instr),
        Opcode::St => store(vm, instr),
        Opcode::Niter => graph_ops::neighbor_iter_init(vm, instr),
        Opcode::Nnext => graph_ops::neighbor_next(vm, instr),
        Opcode::Eiter => graph_ops::edge_iter_init(vm),
        Opcode::Enext => graph_ops::edge_next(vm),
        Opcode::Hase => graph_ops::has_edge(vm),
        Opcode::Deg => graph_ops::degree(vm, instr),
        Opcode::Fpush => graph_ops::frontier_push(vm, instr),
        Opcode::Fpop => graph_ops::frontier_pop(vm, instr),
        Opcode::Fempty => graph_ops::frontier_empty(vm),
        Opcode::Fswap => graph_ops::frontier_swap(vm),
        Opcode::Ffill => graph_ops::frontier_fill(vm),
        Opcode::Vadd => vector::lanewise(vm, instr, ArithOp::Add),
        Opcode::Vsub => vector::lanewise(vm, instr, ArithOp::Sub),
        Opcode::Vmul => vector::lanewise(vm, instr, ArithOp::Mul),
        Opcode::Vdiv => vector::lanewise(vm, instr, ArithOp::Div),
        Opcode::Vld => vector::load(vm, instr),
        Opcode::Vst => vector::store(vm, instr),
        Opcode::Vset => vector::broadcast(vm, instr),
        Opcode::Vsum => vector::reduce(vm, instr),
        // Reserved for the hardware backend; no-ops in the software VM.
        Opcode::Parallel | Opcode::Barrier | Opcode::Lock | Opcode::Unlock => {
            Ok(ExecOutcome::Continue)
        }
    }
}

/// Validates a branch target against program-memory capacity.
///
/// Checked whether or not the branch is taken, so a bad target is caught on
/// the path that encodes it.
fn branch_target(instr: &DecodedInstruction) -> Result<u32, Fault> {
    let target = instr.src2_imm;
    if target as usize >= PROGRAM_WORDS {
        return Err(Fault::BranchOutOfRange { target });
    }
    Ok(target)
}

fn branch(vm: &mut Vm, instr: &DecodedInstruction, op: BranchOp) -> Result<ExecOutcome, Fault> {
    let target = branch_target(instr)?;
    let taken = match op {
        BranchOp::Always => true,
        BranchOp::Zero => vm.regs.zero_flag(),
        BranchOp::NotZero => !vm.regs.zero_flag(),
        BranchOp::Negative => vm.regs.negative_flag(),
        BranchOp::NonNegative => vm.regs.positive_flag() || vm.regs.zero_flag(),
    };
    if taken {
        vm.regs.set_pc(target);
    }
    Ok(ExecOutcome::Continue)
}

/// Second integer operand: immediate (reinterpreted signed) or register.
fn int_operand(vm: &Vm, instr: &DecodedInstruction) -> Result<i32, Fault> {
    if instr.immediate() {
        Ok(instr.src2_imm as i32)
    } else {
        vm.regs.read_int(instr.src2_imm)
    }
}

/// Second float operand: float immediate or register.
fn float_operand(vm: &Vm, instr: &DecodedInstruction) -> Result<f32, Fault> {
    if instr.immediate() {
        Ok(instr.float_imm)
    } else {
        vm.regs.read_float(instr.src2_imm)
    }
}

/// Effective data-memory address: immediate or the source-1 register.
pub(crate) fn data_address(vm: &Vm, instr: &DecodedInstruction) -> Result<i64, Fault> {
    if instr.immediate() {
        Ok(i64::from(instr.src2_imm))
    } else {
        Ok(i64::from(vm.regs.read_int(u32::from(instr.src1))?))
    }
}

fn binary_arith(vm: &mut Vm, instr: &DecodedInstruction, op: ArithOp) -> Result<ExecOutcome, Fault> {
    if instr.floating() {
        let lhs = vm.regs.read_float(u32::from(instr.src1))?;
        let rhs = float_operand(vm, instr)?;
        let value = match op {
            ArithOp::Add => lhs + rhs,
            ArithOp::Sub => lhs - rhs,
            ArithOp::Mul => lhs * rhs,
            // Host float semantics: zero divisors produce infinities/NaN.
            ArithOp::Div => lhs / rhs,
        };
        vm.regs.write_float(u32::from(instr.dest), value)?;
    } else {
        let lhs = vm.regs.read_int(u32::from(instr.src1))?;
        let rhs = int_operand(vm, instr)?;
        let value = match op {
            ArithOp::Add => lhs.wrapping_add(rhs),
            ArithOp::Sub => lhs.wrapping_sub(rhs),
            ArithOp::Mul => lhs.wrapping_mul(rhs),
            ArithOp::Div => {
                if rhs == 0 {
                    return Err(Fault::DivideByZero);
                }
                lhs.wrapping_div(rhs)
            }
        };
        vm.regs.write_int(u32::from(instr.dest), value)?;
    }
    Ok(ExecOutcome::Continue)
}

fn compare(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    if instr.floating() {
        let left = vm.regs.read_float(u32::from(instr.src1))?;
        let right = float_operand(vm, instr)?;
        vm.regs.set_compare_flags_float(left, right);
    } else {
        let left = vm.regs.read_int(u32::from(instr.src1))?;
        let right = int_operand(vm, instr)?;
        vm.regs.set_compare_flags_int(left, right);
    }
    Ok(ExecOutcome::Continue)
}

fn mov(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    if instr.floating() {
        let value = if instr.immediate() {
            instr.float_imm
        } else {
            vm.regs.read_float(u32::from(instr.src1))?
        };
        vm.regs.write_float(u32::from(instr.dest), value)?;
    } else {
        let value = if instr.immediate() {
            instr.src2_imm as i32
        } else {
            vm.regs.read_int(u32::from(instr.src1))?
        };
        vm.regs.write_int(u32::from(instr.dest), value)?;
    }
    Ok(ExecOutcome::Continue)
}

/// `MOVC`: cross-bank conversion. `F` set converts int to float, `F` clear
/// truncates float to int.
fn convert(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    if instr.floating() {
        let value = vm.regs.read_int(u32::from(instr.src1))? as f32;
        vm.regs.write_float(u32::from(instr.dest), value)?;
    } else {
        let value = vm.regs.read_float(u32::from(instr.src1))? as i32;
        vm.regs.write_int(u32::from(instr.dest), value)?;
    }
    Ok(ExecOutcome::Continue)
}

fn load(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    let address = data_address(vm, instr)?;
    if instr.floating() {
        let value = vm.memory.read_f32(address)?;
        vm.regs.write_float(u32::from(instr.dest), value)?;
    } else {
        let value = vm.memory.read(address)?;
        vm.regs.write_int(u32::from(instr.dest), value)?;
    }
    Ok(ExecOutcome::Continue)
}

fn store(vm: &mut Vm, instr: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
    let address = data_address(vm, instr)?;
    if instr.floating() {
        let value = vm.regs.read_float(u32::from(instr.dest))?;
        vm.memory.write_f32(address, value)?;
    } else {
        let value = vm.regs.read_int(u32::from(instr.dest))?;
        vm.memory.write(address, value)?;
    }
    Ok(ExecOutcome::Continue)
}

#[cfg(test)]
mod tests {
    use super::{execute_instruction, ExecOutcome};
    use crate::decoder::{DecodedInstruction, MODE_FLOAT, MODE_IMMEDIATE};
    use crate::fault::Fault;
    use crate::isa::Opcode;
    use crate::pipeline::Vm;
    use crate::state::{FLAG_NEGATIVE, FLAG_POSITIVE, FLAG_ZERO, F_ACC, F_TMP1, R_ACC, R_TMP1};

    fn instr(opcode: Opcode, flags: u8, dest: u8, src1: u8, src2_imm: u32) -> DecodedInstruction {
        let float_imm = if flags & MODE_IMMEDIATE != 0 && flags & MODE_FLOAT != 0 {
            f32::from_bits(src2_imm)
        } else {
            0.0
        };
        DecodedInstruction {
            opcode,
            flags,
            dest,
            src1,
            src2_imm,
            float_imm,
        }
    }

    fn exec(vm: &mut Vm, i: &DecodedInstruction) -> Result<ExecOutcome, Fault> {
        execute_instruction(vm, i)
    }

    #[test]
    fn halt_stops_the_pipeline() {
        let mut vm = Vm::new();
        let outcome = exec(&mut vm, &instr(Opcode::Halt, 0, 0, 0, 0));
        assert_eq!(outcome, Ok(ExecOutcome::Halt));
    }

    #[test]
    fn add_covers_all_four_mode_combinations() {
        let mut vm = Vm::new();
        let a = u32::from(R_ACC);
        let t = u32::from(R_TMP1);

        vm.regs.write_int(t, 5).expect("write");
        exec(
            &mut vm,
            &instr(Opcode::Add, MODE_IMMEDIATE, R_ACC, R_TMP1, 7),
        )
        .expect("imm add");
        assert_eq!(vm.regs.read_int(a), Ok(12));

        exec(&mut vm, &instr(Opcode::Add, 0, R_ACC, R_ACC, t)).expect("reg add");
        assert_eq!(vm.regs.read_int(a), Ok(17));

        vm.regs.write_float(u32::from(F_TMP1), 1.5).expect("write");
        exec(
            &mut vm,
            &instr(
                Opcode::Add,
                MODE_IMMEDIATE | MODE_FLOAT,
                F_ACC,
                F_TMP1,
                2.25_f32.to_bits(),
            ),
        )
        .expect("float imm add");
        assert_eq!(vm.regs.read_float(u32::from(F_ACC)), Ok(3.75));

        exec(
            &mut vm,
            &instr(Opcode::Add, MODE_FLOAT, F_ACC, F_ACC, u32::from(F_TMP1)),
        )
        .expect("float reg add");
        assert_eq!(vm.regs.read_float(u32::from(F_ACC)), Ok(5.25));
    }

    #[test]
    fn negative_immediates_arrive_sign_extended() {
        let mut vm = Vm::new();
        exec(
            &mut vm,
            &instr(Opcode::Mov, MODE_IMMEDIATE, R_ACC, 0, -5_i32 as u32),
        )
        .expect("mov");
        assert_eq!(vm.regs.read_int(u32::from(R_ACC)), Ok(-5));

        exec(
            &mut vm,
            &instr(Opcode::Add, MODE_IMMEDIATE, R_ACC, R_ACC, -3_i32 as u32),
        )
        .expect("add");
        assert_eq!(vm.regs.read_int(u32::from(R_ACC)), Ok(-8));
    }

    #[test]
    fn integer_division_by_zero_faults() {
        let mut vm = Vm::new();
        vm.regs.write_int(u32::from(R_TMP1), 10).expect("write");

        let outcome = exec(
            &mut vm,
            &instr(Opcode::Div, MODE_IMMEDIATE, R_ACC, R_TMP1, 0),
        );
        assert_eq!(outcome, Err(Fault::DivideByZero));
    }

    #[test]
    fn wrapping_division_handles_int_min_by_minus_one() {
        let mut vm = Vm::new();
        vm.regs.write_int(u32::from(R_TMP1), i32::MIN).expect("write");

        exec(
            &mut vm,
            &instr(Opcode::Div, MODE_IMMEDIATE, R_ACC, R_TMP1, -1_i32 as u32),
        )
        .expect("div");
        assert_eq!(vm.regs.read_int(u32::from(R_ACC)), Ok(i32::MIN));
    }

    #[test]
    fn float_division_by_zero_keeps_host_semantics() {
        let mut vm = Vm::new();
        vm.regs.write_float(u32::from(F_TMP1), 1.0).expect("write");

        exec(
            &mut vm,
            &instr(
                Opcode::Div,
                MODE_IMMEDIATE | MODE_FLOAT,
                F_ACC,
                F_TMP1,
                0.0_f32.to_bits(),
            ),
        )
        .expect("float div");
        assert_eq!(vm.regs.read_float(u32::from(F_ACC)), Ok(f32::INFINITY));
    }

    #[test]
    fn cmp_sets_exactly_one_flag_per_sign() {
        let mut vm = Vm::new();
        vm.regs.write_int(u32::from(R_TMP1), 4).expect("write");

        exec(&mut vm, &instr(Opcode::Cmp, MODE_IMMEDIATE, 0, R_TMP1, 4)).expect("cmp");
        assert_eq!(vm.regs.flags(), FLAG_ZERO);

        exec(&mut vm, &instr(Opcode::Cmp, MODE_IMMEDIATE, 0, R_TMP1, 9)).expect("cmp");
        assert_eq!(vm.regs.flags(), FLAG_NEGATIVE);

        exec(&mut vm, &instr(Opcode::Cmp, MODE_IMMEDIATE, 0, R_TMP1, 1)).expect("cmp");
        assert_eq!(vm.regs.flags(), FLAG_POSITIVE);
    }

    #[test]
    fn branch_taken_matrix_follows_flags() {
        // (opcode, flags byte before branch, taken)
        let cases = [
            (Opcode::Bz, FLAG_ZERO, true),
            (Opcode::Bz, FLAG_POSITIVE, false),
            (Opcode::Bnz, FLAG_ZERO, false),
            (Opcode::Bnz, FLAG_NEGATIVE, true),
            (Opcode::Blt, FLAG_NEGATIVE, true),
            (Opcode::Blt, FLAG_ZERO, false),
            (Opcode::Bge, FLAG_POSITIVE, true),
            (Opcode::Bge, FLAG_ZERO, true),
            (Opcode::Bge, FLAG_NEGATIVE, false),
        ];

        for (opcode, flags, taken) in cases {
            let mut vm = Vm::new();
            match flags {
                FLAG_ZERO => vm.regs.set_compare_flags_int(1, 1),
                FLAG_NEGATIVE => vm.regs.set_compare_flags_int(0, 1),
                _ => vm.regs.set_compare_flags_int(1, 0),
            }
            vm.regs.set_pc(10);

            exec(&mut vm, &instr(opcode, MODE_IMMEDIATE, 0, 0, 42)).expect("branch");
            let expected = if taken { 42 } else { 10 };
            assert_eq!(vm.regs.pc(), expected, "{opcode:?} with flags {flags:#05b}");
        }
    }

    #[test]
    fn branch_target_is_validated_even_when_not_taken() {
        let mut vm = Vm::new();
        vm.regs.set_compare_flags_int(1, 0); // zero flag clear

        let outcome = exec(&mut vm, &instr(Opcode::Bz, MODE_IMMEDIATE, 0, 0, 8192));
        assert_eq!(outcome, Err(Fault::BranchOutOfRange { target: 8192 }));
    }

    #[test]
    fn movc_converts_between_banks() {
        let mut vm = Vm::new();

        vm.regs.write_int(u32::from(R_TMP1), 7).expect("write");
        exec(&mut vm, &instr(Opcode::Movc, MODE_FLOAT, F_ACC, R_TMP1, 0)).expect("int to float");
        assert_eq!(vm.regs.read_float(u32::from(F_ACC)), Ok(7.0));

        vm.regs.write_float(u32::from(F_TMP1), -2.9).expect("write");
        exec(&mut vm, &instr(Opcode::Movc, 0, R_ACC, F_TMP1, 0)).expect("float to int");
        assert_eq!(vm.regs.read_int(u32::from(R_ACC)), Ok(-2));
    }

    #[test]
    fn load_and_store_move_ints_and_float_bit_patterns() {
        let mut vm = Vm::new();

        vm.regs.write_int(u32::from(R_ACC), 123).expect("write");
        exec(&mut vm, &instr(Opcode::St, MODE_IMMEDIATE, R_ACC, 0, 40)).expect("store imm");
        assert_eq!(vm.memory.read(40), Ok(123));

        exec(&mut vm, &instr(Opcode::Ld, MODE_IMMEDIATE, R_TMP1, 0, 40)).expect("load imm");
        assert_eq!(vm.regs.read_int(u32::from(R_TMP1)), Ok(123));

        // Register-addressed store of a float bit pattern.
        vm.regs.write_int(u32::from(R_TMP1), 41).expect("write");
        vm.regs.write_float(u32::from(F_ACC), 0.5).expect("write");
        exec(&mut vm, &instr(Opcode::St, MODE_FLOAT, F_ACC, R_TMP1, 0)).expect("store reg");
        assert_eq!(vm.memory.read_f32(41), Ok(0.5));

        exec(&mut vm, &instr(Opcode::Ld, MODE_FLOAT, F_TMP1, R_TMP1, 0)).expect("load reg");
        assert_eq!(vm.regs.read_float(u32::from(F_TMP1)), Ok(0.5));
    }

    #[test]
    fn memory_access_faults_propagate_address() {
        let mut vm = Vm::new();
        let outcome = exec(&mut vm, &instr(Opcode::Ld, MODE_IMMEDIATE, R_ACC, 0, 65536));
        assert_eq!(outcome, Err(Fault::MemoryOutOfRange { address: 65536 }));

        vm.regs.write_int(u32::from(R_TMP1), -1).expect("write");
        let outcome = exec(&mut vm, &instr(Opcode::St, 0, R_ACC, R_TMP1, 0));
        assert_eq!(outcome, Err(Fault::MemoryOutOfRange { address: -1 }));
    }

    #[test]
    fn multicore_opcodes_retire_as_noops() {
        let mut vm = Vm::new();
        let before = vm.regs.clone();

        for opcode in [
            Opcode::Parallel,
            Opcode::Barrier,
            Opcode::Lock,
            Opcode::Unlock,
        ] {
            let outcome = exec(&mut vm, &instr(opcode, 0, 1, 2, 3));
            assert_eq!(outcome, Ok(ExecOutcome::Continue));
        }
        assert_eq!(vm.regs, before);
    }
}
