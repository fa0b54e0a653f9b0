//! The IR optimization passes and their fixed-point driver.
//!
//! Four passes run in order until nothing changes (bounded by
//! [`PassLimits::max_opt_passes`]): peephole simplification, dead-value
//! elimination, label coalescing, and constant propagation/folding. Every
//! pass walks the list head to tail with a cursor; a cursor standing on a
//! node detached mid-walk keeps advancing through the live sequence, which
//! lets label runs collapse transitively in one sweep.
//!
//! None of the passes may change program meaning.

use ahash::{AHashMap, AHashSet};

use crate::ir::{
    code::{InstrId, InstrList, Opcode},
    value::Value,
};

/// Iteration bounds for the optimizer and the inliner.
///
/// Both drivers exit early once a whole round changes nothing; the caps only
/// bound convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassLimits {
    pub max_opt_passes: usize,
    pub max_inline_rounds: usize,
}

impl Default for PassLimits {
    fn default() -> Self {
        Self { max_opt_passes: 100, max_inline_rounds: 100 }
    }
}

/// Runs the pass battery to a fixed point.
pub fn optimize(list: &mut InstrList, limits: &PassLimits) {
    for _ in 0..limits.max_opt_passes {
        let mut changed = false;
        changed |= peephole(list);
        changed |= eliminate_dead_values(list);
        changed |= merge_labels(list);
        changed |= propagate_constants(list);
        if !changed {
            break;
        }
    }
}

/// Detaches labels and assignments whose result value is never used.
///
/// A value is used when it appears as an operand, or as the `result` of a
/// side-effecting instruction (`CALL`, `IFGOTO`, `GOTO`, `ARG`, `RETURN`,
/// `READ`, `WRITE`, `STORE`). A label instruction counts as an assignment to
/// its own label, so labels nothing branches to disappear.
pub fn eliminate_dead_values(list: &mut InstrList) -> bool {
    let mut used: AHashSet<Value> = AHashSet::new();
    let mut cursor = list.head();
    while let Some(id) = cursor {
        let instr = &list[id];
        match instr.op {
            Opcode::Label | Opcode::Nop => {}
            op => {
                if matches!(
                    op,
                    Opcode::Call
                        | Opcode::IfGoto
                        | Opcode::Goto
                        | Opcode::Arg
                        | Opcode::Return
                        | Opcode::Read
                        | Opcode::Write
                        | Opcode::Store
                ) {
                    if let Some(result) = instr.result {
                        used.insert(result);
                    }
                }
                if let Some(arg1) = instr.arg1 {
                    used.insert(arg1);
                }
                if let Some(arg2) = instr.arg2 {
                    used.insert(arg2);
                }
            }
        }
        cursor = list.next(id);
    }

    let mut changed = false;
    let mut cursor = list.head();
    while let Some(id) = cursor {
        let next = list.next(id);
        let instr = &list[id];
        if (instr.op == Opcode::Label || instr.op.is_assignment())
            && instr.result.is_some_and(|result| !used.contains(&result))
        {
            changed |= list.detach(id);
        }
        cursor = next;
    }
    changed
}

/// Merges runs of adjacent labels and retargets branches through the merge.
pub fn merge_labels(list: &mut InstrList) -> bool {
    let mut remap: AHashMap<Value, Value> = AHashMap::new();
    let mut changed = false;
    let mut cursor = list.head();
    while let Some(id) = cursor {
        let next = list.next(id);
        if list[id].op == Opcode::Label
            && let Some(next_id) = next
            && list[next_id].op == Opcode::Label
        {
            let from = list[next_id].result.expect("label instruction carries its label");
            let to = list[id].result.expect("label instruction carries its label");
            remap.insert(from, to);
            list.detach(next_id);
            changed = true;
        }
        // Advancing onto the just-detached label lets a run of three or
        // more labels collapse in this same sweep.
        cursor = next;
    }
    if remap.is_empty() {
        return changed;
    }

    let mut cursor = list.head();
    while let Some(id) = cursor {
        if matches!(list[id].op, Opcode::IfGoto | Opcode::Goto) {
            let mut target = list[id].result.expect("branch carries a target");
            while let Some(&to) = remap.get(&target) {
                target = to;
            }
            list[id].result = Some(target);
        }
        cursor = list.next(id);
    }
    changed
}

/// How many constant definitions a value has seen this pass.
enum ConstDef {
    One(i32),
    Many,
}

/// Folds constant arithmetic, applies algebraic identities, and replaces
/// reads of single-constant-definition values with the constant.
///
/// Substitution requires exactly one `MOVE #k` definition and zero other
/// assignments. A fold performed this pass still counts as an assignment,
/// so its consumers pick the constant up on the next pass. Division by zero
/// is never folded; it is left for runtime.
pub fn propagate_constants(list: &mut InstrList) -> bool {
    let mut changed = false;
    let mut constants: AHashMap<Value, ConstDef> = AHashMap::new();
    let mut assignments: AHashMap<Value, u32> = AHashMap::new();

    let mut cursor = list.head();
    while let Some(id) = cursor {
        let next = list.next(id);
        let op = list[id].op;
        let arg1 = list[id].arg1;
        let arg2 = list[id].arg2;
        let result = list[id].result;
        match op {
            Opcode::Call | Opcode::Move => {
                if let Some(k) = arg1.and_then(Value::const_val) {
                    if let Some(result) = result {
                        constants.entry(result).and_modify(|def| *def = ConstDef::Many).or_insert(ConstDef::One(k));
                    }
                } else if let Some(result) = result {
                    *assignments.entry(result).or_insert(0) += 1;
                }
            }
            Opcode::Add | Opcode::Minus | Opcode::Mul | Opcode::Div => {
                let const1 = arg1.and_then(Value::const_val);
                let const2 = arg2.and_then(Value::const_val);
                if let (Some(a), Some(b)) = (const1, const2) {
                    let folded = match op {
                        Opcode::Add => Some(a.wrapping_add(b)),
                        Opcode::Minus => Some(a.wrapping_sub(b)),
                        Opcode::Mul => Some(a.wrapping_mul(b)),
                        _ => (b != 0).then(|| a.wrapping_div(b)),
                    };
                    if let Some(value) = folded {
                        let instr = &mut list[id];
                        instr.op = Opcode::Move;
                        instr.arg1 = Some(Value::Const(value));
                        instr.arg2 = None;
                        changed = true;
                    }
                } else {
                    changed |= simplify_algebraic(list, id, op, arg1, arg2);
                }
                if let Some(result) = result {
                    *assignments.entry(result).or_insert(0) += 1;
                }
            }
            _ => {}
        }
        cursor = next;
    }

    let mut cursor = list.head();
    while let Some(id) = cursor {
        let include_result = matches!(list[id].op, Opcode::Arg | Opcode::Return | Opcode::Write);
        for slot in 0..3 {
            let value = match slot {
                0 => list[id].arg1,
                1 => list[id].arg2,
                _ if include_result => list[id].result,
                _ => None,
            };
            if let Some(value) = value
                && let Some(ConstDef::One(k)) = constants.get(&value)
                && !assignments.contains_key(&value)
            {
                let constant = Some(Value::Const(*k));
                match slot {
                    0 => list[id].arg1 = constant,
                    1 => list[id].arg2 = constant,
                    _ => list[id].result = constant,
                }
                changed = true;
            }
        }
        cursor = list.next(id);
    }
    changed
}

/// The algebraic identities: `x+0`, `x-0`, `x-x`, `1*x`, `x*1`, `0*x`,
/// `x/1`, `x/x`.
fn simplify_algebraic(list: &mut InstrList, id: InstrId, op: Opcode, arg1: Option<Value>, arg2: Option<Value>) -> bool {
    let zero1 = arg1.is_some_and(|v| v.is_const_eq(0));
    let zero2 = arg2.is_some_and(|v| v.is_const_eq(0));
    let one1 = arg1.is_some_and(|v| v.is_const_eq(1));
    let one2 = arg2.is_some_and(|v| v.is_const_eq(1));
    let instr = &mut list[id];
    match op {
        Opcode::Add if zero1 || zero2 => {
            instr.op = Opcode::Move;
            if zero1 {
                instr.arg1 = arg2;
            }
            instr.arg2 = None;
        }
        Opcode::Minus if zero2 => {
            instr.op = Opcode::Move;
            instr.arg2 = None;
        }
        Opcode::Minus if arg1 == arg2 => {
            instr.op = Opcode::Move;
            instr.arg1 = Some(Value::Const(0));
            instr.arg2 = None;
        }
        Opcode::Mul if one1 => {
            instr.op = Opcode::Move;
            instr.arg1 = arg2;
            instr.arg2 = None;
        }
        Opcode::Mul if one2 => {
            instr.op = Opcode::Move;
            instr.arg2 = None;
        }
        Opcode::Mul if zero1 || zero2 => {
            instr.op = Opcode::Move;
            instr.arg1 = Some(Value::Const(0));
            instr.arg2 = None;
        }
        Opcode::Div if one2 => {
            instr.op = Opcode::Move;
            instr.arg2 = None;
        }
        Opcode::Div if arg1 == arg2 => {
            instr.op = Opcode::Move;
            instr.arg1 = Some(Value::Const(1));
            instr.arg2 = None;
        }
        _ => return false,
    }
    true
}

/// Local simplifications over adjacent instructions.
pub fn peephole(list: &mut InstrList) -> bool {
    let mut changed = false;
    let mut cursor = list.head();
    while let Some(id) = cursor {
        let next = list.next(id);
        let next2 = next.and_then(|n| list.next(n));
        let op = list[id].op;
        let result = list[id].result;
        match op {
            Opcode::Move => {
                if list[id].arg1 == result {
                    changed |= list.detach(id);
                }
            }
            Opcode::IfGoto | Opcode::Goto => {
                // IFGOTO c L1; GOTO L2; LABEL L1  =>  IFGOTO !c L2; LABEL L1
                if op == Opcode::IfGoto
                    && let (Some(n), Some(n2)) = (next, next2)
                    && list[n].op == Opcode::Goto
                    && list[n2].op == Opcode::Label
                    && result == list[n2].result
                {
                    let relop = list[id].relop.expect("conditional branch missing relop");
                    list[id].relop = Some(relop.inverse());
                    list[id].result = list[n].result;
                    list.detach(n);
                    changed = true;
                }
                // A branch to the immediately following label is a no-op.
                if let Some(n) = next
                    && list[n].op == Opcode::Label
                    && result == list[n].result
                {
                    changed |= list.detach(id);
                }
            }
            Opcode::Add | Opcode::Minus => {
                if op == Opcode::Add
                    && list[id].arg1.is_some_and(Value::is_const)
                    && !list[id].arg2.is_some_and(Value::is_const)
                {
                    let instr = &mut list[id];
                    std::mem::swap(&mut instr.arg1, &mut instr.arg2);
                    changed = true;
                }
                changed |= fuse_constant_offsets(list, id);
            }
            _ => {}
        }
        // Forward substitution: an operand equal to the result of an
        // immediately preceding MOVE reads the moved value instead.
        if let Some(prev) = list.prev(id)
            && list[prev].op == Opcode::Move
        {
            let src = list[prev].arg1;
            let copied = list[prev].result;
            if src.is_some() && copied.is_some() {
                let include_result = matches!(list[id].op, Opcode::Arg | Opcode::Return | Opcode::Write);
                if list[id].arg1 == copied {
                    list[id].arg1 = src;
                    changed = true;
                }
                if list[id].arg2 == copied {
                    list[id].arg2 = src;
                    changed = true;
                }
                if include_result && list[id].result == copied {
                    list[id].result = src;
                    changed = true;
                }
            }
        }
        cursor = next;
    }
    changed
}

/// Fuses a chain of constant offsets through the previous instruction:
/// `x := y ± k; x' := x ± k'` becomes `x' := y ± (k±k')` (a plain move of
/// `y` when the offsets cancel), and `x := y ± k; z := x - y` becomes
/// `z := ±k`. The intermediate instruction is detached when it wrote the
/// same destination.
fn fuse_constant_offsets(list: &mut InstrList, id: InstrId) -> bool {
    let Some(prev) = list.prev(id) else { return false };
    if !matches!(list[prev].op, Opcode::Add | Opcode::Minus) {
        return false;
    }
    // z := x - y with x := y ± k just above.
    if list[id].op == Opcode::Minus
        && list[id].arg1 == list[prev].result
        && list[id].arg2 == list[prev].arg1
        && let Some(k) = list[prev].arg2.and_then(Value::const_val)
    {
        let value = if list[prev].op == Opcode::Add { k } else { k.wrapping_neg() };
        let instr = &mut list[id];
        instr.op = Opcode::Move;
        instr.arg1 = Some(Value::Const(value));
        instr.arg2 = None;
        return true;
    }
    if list[id].arg1 != list[prev].result {
        return false;
    }
    let Some(base_k) = list[prev].arg2.and_then(Value::const_val) else { return false };
    let Some(offset_k) = list[id].arg2.and_then(Value::const_val) else { return false };
    let base_var = list[prev].arg1.expect("arithmetic instruction carries arg1");
    let baseline = if list[prev].op == Opcode::Minus { base_k.wrapping_neg() } else { base_k };
    let offset = if list[id].op == Opcode::Minus { offset_k.wrapping_neg() } else { offset_k };
    if list[prev].result == list[id].result {
        list.detach(prev);
    }
    let total = baseline.wrapping_add(offset);
    let instr = &mut list[id];
    if total == 0 {
        instr.op = Opcode::Move;
        instr.arg1 = Some(base_var);
        instr.arg2 = None;
    } else if total > 0 {
        instr.op = Opcode::Add;
        instr.arg1 = Some(base_var);
        instr.arg2 = Some(Value::Const(total));
    } else {
        instr.op = Opcode::Minus;
        instr.arg1 = Some(base_var);
        instr.arg2 = Some(Value::Const(total.wrapping_neg()));
    }
    true
}
