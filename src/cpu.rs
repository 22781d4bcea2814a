use crate::core::Core;
use crate::emulator::EmulatorError;
use crate::instruction::{AddrMode, Instruction, Modifier, Opcode};
use crate::warrior::WarriorId;

/// What became of the process that executed this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// A successor task was offered to the queue
    Continue,
    /// The process died without queueing a successor: DAT or a zero divisor
    Killed,
}

/// One evaluated operand: the absolute target address and a value copy of
/// the instruction it referenced.  Later writes to `core[ptr]` within the
/// same cycle do not change `snap`.
#[derive(Debug, Clone, Copy)]
pub struct Operand {
    pub ptr: usize,
    pub snap: Instruction,
}

/// Evaluate one operand of the instruction at `pc`.
///
/// Pre-decrement modes mutate the intermediate field before it is read, so
/// a side effect from the A operand is visible while the B operand
/// resolves.  Post-increment modes only record the intermediate address;
/// the increment itself lands when the cycle's dispatch is done.
fn resolve(core: &mut Core, pc: usize, mode: AddrMode, field: usize) -> Operand {
    match mode {
        AddrMode::Immediate => Operand {
            ptr: pc,
            snap: core.read(pc),
        },
        AddrMode::Direct => {
            let ptr = core.offset(pc, field);
            Operand {
                ptr,
                snap: core.read(ptr),
            }
        }
        AddrMode::IndirectA => {
            let hop = core.offset(pc, field);
            let ptr = core.offset(hop, core.read(hop).a_num);
            Operand {
                ptr,
                snap: core.read(ptr),
            }
        }
        AddrMode::IndirectB => {
            let hop = core.offset(pc, field);
            let ptr = core.offset(hop, core.read(hop).b_num);
            Operand {
                ptr,
                snap: core.read(ptr),
            }
        }
        AddrMode::PredecA => {
            let hop = core.offset(pc, field);
            let decremented = core.step_back(core.read(hop).a_num);
            core.cell_mut(hop).a_num = decremented;
            let ptr = core.offset(hop, decremented);
            Operand {
                ptr,
                snap: core.read(ptr),
            }
        }
        AddrMode::PredecB => {
            let hop = core.offset(pc, field);
            let decremented = core.step_back(core.read(hop).b_num);
            core.cell_mut(hop).b_num = decremented;
            let ptr = core.offset(hop, decremented);
            Operand {
                ptr,
                snap: core.read(ptr),
            }
        }
        AddrMode::PostincA => {
            let hop = core.offset(pc, field);
            core.defer_increment_a(hop);
            let ptr = core.offset(hop, core.read(hop).a_num);
            Operand {
                ptr,
                snap: core.read(ptr),
            }
        }
        AddrMode::PostincB => {
            let hop = core.offset(pc, field);
            core.defer_increment_b(hop);
            let ptr = core.offset(hop, core.read(hop).b_num);
            Operand {
                ptr,
                snap: core.read(ptr),
            }
        }
    }
}

/// Execute the instruction at `pc` on behalf of `who`: evaluate both
/// operands, dispatch on (opcode, modifier), and offer successor tasks to
/// the warrior's own queue.  Deferred post-increments are left for the
/// scheduler to flush.
pub(crate) fn execute(
    core: &mut Core,
    who: WarriorId,
    pc: usize,
) -> Result<ExecutionResult, EmulatorError> {
    let current = core.read(pc);
    // A resolves before B, so A-side pre-decrements are visible to B
    let a = resolve(core, pc, current.a_mode, current.a_num);
    let b = resolve(core, pc, current.b_mode, current.b_num);

    let next = core.offset(pc, 1);
    let skip = core.offset(pc, 2);

    match current.op {
        Opcode::Dat => return Ok(ExecutionResult::Killed),
        Opcode::Nop => {
            core.queue_mut(who).push(next);
        }
        Opcode::Jmp => {
            core.queue_mut(who).push(a.ptr);
        }
        Opcode::Spl => {
            // PC+1 is pushed first, so a single free slot goes to it
            core.queue_mut(who).push(next);
            core.queue_mut(who).push(a.ptr);
        }
        Opcode::Mov => {
            mov(core, current.modifier, &a, &b);
            core.queue_mut(who).push(next);
        }
        Opcode::Add | Opcode::Sub | Opcode::Mul => {
            arithmetic(core, current.op, current.modifier, &a, &b);
            core.queue_mut(who).push(next);
        }
        Opcode::Div | Opcode::Mod => {
            if !divide(core, current.op, current.modifier, &a, &b) {
                return Ok(ExecutionResult::Killed);
            }
            core.queue_mut(who).push(next);
        }
        Opcode::Jmz => {
            let target = if selection_is_zero(current.modifier, &b.snap) {
                a.ptr
            } else {
                next
            };
            core.queue_mut(who).push(target);
        }
        Opcode::Jmn => {
            let target = if selection_is_zero(current.modifier, &b.snap) {
                next
            } else {
                a.ptr
            };
            core.queue_mut(who).push(target);
        }
        Opcode::Djn => {
            let snap = decrement_selection(core, current.modifier, &b);
            let target = if selection_is_zero(current.modifier, &snap) {
                next
            } else {
                a.ptr
            };
            core.queue_mut(who).push(target);
        }
        Opcode::Slt | Opcode::Cmp | Opcode::Seq | Opcode::Sne => {
            let target = if compares(current.op, current.modifier, &a.snap, &b.snap) {
                skip
            } else {
                next
            };
            core.queue_mut(who).push(target);
        }
        Opcode::Ldp | Opcode::Stp => {
            return Err(EmulatorError::UnimplementedOpcode {
                op: current.op,
                addr: pc,
            });
        }
    }
    Ok(ExecutionResult::Continue)
}

fn mov(core: &mut Core, modifier: Modifier, a: &Operand, b: &Operand) {
    match modifier {
        Modifier::A => core.cell_mut(b.ptr).a_num = a.snap.a_num,
        Modifier::B => core.cell_mut(b.ptr).b_num = a.snap.b_num,
        Modifier::AB => core.cell_mut(b.ptr).b_num = a.snap.a_num,
        Modifier::BA => core.cell_mut(b.ptr).a_num = a.snap.b_num,
        Modifier::F => {
            let cell = core.cell_mut(b.ptr);
            cell.a_num = a.snap.a_num;
            cell.b_num = a.snap.b_num;
        }
        Modifier::X => {
            let cell = core.cell_mut(b.ptr);
            cell.a_num = a.snap.b_num;
            cell.b_num = a.snap.a_num;
        }
        Modifier::I => core.write(b.ptr, a.snap),
    }
}

/// ADD, SUB, and MUL reduced modulo the core size.  The B-side value is the
/// left operand, so SUB computes `b - a`.
fn arithmetic(core: &mut Core, op: Opcode, modifier: Modifier, a: &Operand, b: &Operand) {
    let size = core.size();
    let apply = |lhs: usize, rhs: usize| -> usize {
        match op {
            Opcode::Add => (lhs + rhs) % size,
            Opcode::Sub => (lhs + size - rhs) % size,
            Opcode::Mul => (lhs * rhs) % size,
            _ => unreachable!("arithmetic called with {op}"),
        }
    };
    match modifier {
        Modifier::A => {
            let value = apply(b.snap.a_num, a.snap.a_num);
            core.cell_mut(b.ptr).a_num = value;
        }
        Modifier::B => {
            let value = apply(b.snap.b_num, a.snap.b_num);
            core.cell_mut(b.ptr).b_num = value;
        }
        Modifier::AB => {
            let value = apply(b.snap.b_num, a.snap.a_num);
            core.cell_mut(b.ptr).b_num = value;
        }
        Modifier::BA => {
            let value = apply(b.snap.a_num, a.snap.b_num);
            core.cell_mut(b.ptr).a_num = value;
        }
        Modifier::F | Modifier::I => {
            let a_value = apply(b.snap.a_num, a.snap.a_num);
            let b_value = apply(b.snap.b_num, a.snap.b_num);
            let cell = core.cell_mut(b.ptr);
            cell.a_num = a_value;
            cell.b_num = b_value;
        }
        Modifier::X => {
            let a_value = apply(b.snap.a_num, a.snap.b_num);
            let b_value = apply(b.snap.b_num, a.snap.a_num);
            let cell = core.cell_mut(b.ptr);
            cell.a_num = a_value;
            cell.b_num = b_value;
        }
    }
}

/// DIV and MOD.  The A-side value of each pair is the divisor and the
/// paired B field receives the result.  A zero divisor kills the process;
/// with paired modifiers the half with a non-zero divisor still writes
/// before the kill.  Returns whether the process survived.
fn divide(core: &mut Core, op: Opcode, modifier: Modifier, a: &Operand, b: &Operand) -> bool {
    let apply = |dividend: usize, divisor: usize| -> usize {
        match op {
            Opcode::Div => dividend / divisor,
            Opcode::Mod => dividend % divisor,
            _ => unreachable!("divide called with {op}"),
        }
    };
    match modifier {
        Modifier::A => {
            let divisor = a.snap.a_num;
            if divisor == 0 {
                return false;
            }
            core.cell_mut(b.ptr).a_num = apply(b.snap.a_num, divisor);
            true
        }
        Modifier::B => {
            let divisor = a.snap.b_num;
            if divisor == 0 {
                return false;
            }
            core.cell_mut(b.ptr).b_num = apply(b.snap.b_num, divisor);
            true
        }
        Modifier::AB => {
            let divisor = a.snap.a_num;
            if divisor == 0 {
                return false;
            }
            core.cell_mut(b.ptr).b_num = apply(b.snap.b_num, divisor);
            true
        }
        Modifier::BA => {
            let divisor = a.snap.b_num;
            if divisor == 0 {
                return false;
            }
            core.cell_mut(b.ptr).a_num = apply(b.snap.a_num, divisor);
            true
        }
        Modifier::F | Modifier::I => {
            let (a_divisor, b_divisor) = (a.snap.a_num, a.snap.b_num);
            if a_divisor != 0 {
                core.cell_mut(b.ptr).a_num = apply(b.snap.a_num, a_divisor);
            }
            if b_divisor != 0 {
                core.cell_mut(b.ptr).b_num = apply(b.snap.b_num, b_divisor);
            }
            a_divisor != 0 && b_divisor != 0
        }
        Modifier::X => {
            let (a_divisor, b_divisor) = (a.snap.a_num, a.snap.b_num);
            if b_divisor != 0 {
                core.cell_mut(b.ptr).a_num = apply(b.snap.a_num, b_divisor);
            }
            if a_divisor != 0 {
                core.cell_mut(b.ptr).b_num = apply(b.snap.b_num, a_divisor);
            }
            a_divisor != 0 && b_divisor != 0
        }
    }
}

/// Field selection shared by the JMZ family: A and BA read the a field,
/// B and AB the b field, and the paired modifiers consider both fields.
/// "Zero" for a pair means both fields are zero.
fn selection_is_zero(modifier: Modifier, snap: &Instruction) -> bool {
    match modifier {
        Modifier::A | Modifier::BA => snap.a_num == 0,
        Modifier::B | Modifier::AB => snap.b_num == 0,
        Modifier::F | Modifier::X | Modifier::I => snap.a_num == 0 && snap.b_num == 0,
    }
}

/// DJN's decrement: the selected field(s) go down by one both in the core
/// cell and in the snapshot the jump test reads
fn decrement_selection(core: &mut Core, modifier: Modifier, b: &Operand) -> Instruction {
    let mut snap = b.snap;
    match modifier {
        Modifier::A | Modifier::BA => {
            let value = core.step_back(core.read(b.ptr).a_num);
            core.cell_mut(b.ptr).a_num = value;
            snap.a_num = core.step_back(snap.a_num);
        }
        Modifier::B | Modifier::AB => {
            let value = core.step_back(core.read(b.ptr).b_num);
            core.cell_mut(b.ptr).b_num = value;
            snap.b_num = core.step_back(snap.b_num);
        }
        Modifier::F | Modifier::X | Modifier::I => {
            let a_value = core.step_back(core.read(b.ptr).a_num);
            let b_value = core.step_back(core.read(b.ptr).b_num);
            let cell = core.cell_mut(b.ptr);
            cell.a_num = a_value;
            cell.b_num = b_value;
            snap.a_num = core.step_back(snap.a_num);
            snap.b_num = core.step_back(snap.b_num);
        }
    }
    snap
}

/// The skip predicates of SLT, CMP/SEQ, and SNE
fn compares(op: Opcode, modifier: Modifier, a: &Instruction, b: &Instruction) -> bool {
    match op {
        Opcode::Slt => match modifier {
            Modifier::A => a.a_num < b.a_num,
            Modifier::B => a.b_num < b.b_num,
            Modifier::AB => a.a_num < b.b_num,
            Modifier::BA => a.b_num < b.a_num,
            Modifier::F | Modifier::I => a.a_num < b.a_num && a.b_num < b.b_num,
            Modifier::X => a.a_num < b.b_num && a.b_num < b.a_num,
        },
        Opcode::Cmp | Opcode::Seq => match modifier {
            Modifier::A => a.a_num == b.a_num,
            Modifier::B => a.b_num == b.b_num,
            Modifier::AB => a.a_num == b.b_num,
            Modifier::BA => a.b_num == b.a_num,
            Modifier::F => a.a_num == b.a_num && a.b_num == b.b_num,
            Modifier::X => a.a_num == b.b_num && a.b_num == b.a_num,
            Modifier::I => a == b,
        },
        Opcode::Sne => match modifier {
            Modifier::A => a.a_num != b.a_num,
            Modifier::B => a.b_num != b.b_num,
            Modifier::AB => a.a_num != b.b_num,
            Modifier::BA => a.b_num != b.a_num,
            Modifier::F => a.a_num != b.a_num && a.b_num != b.b_num,
            Modifier::X => a.a_num != b.b_num && a.b_num != b.a_num,
            Modifier::I => a != b,
        },
        _ => unreachable!("compares called with {op}"),
    }
}
