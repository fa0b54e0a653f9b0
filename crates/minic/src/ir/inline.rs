//! The bounded whole-program function inliner.
//!
//! One discovery scan records, for every declared function, its entry (the
//! first instruction past the `PARAM` block) and its parameter values. A
//! function is inlineable when its body contains no `CALL`, no `LOAD`, and
//! never assigns one of its own parameters; such a body can be spliced into
//! a call site with parameters substituted by the caller's argument values.
//!
//! At a call site, the contiguous `ARG` block precedes the `CALL` in reverse
//! source order, so parameter `i` maps to the `(arity - 1 - i)`-th collected
//! `ARG`. Labels in the copied body are freshened lazily on first sight;
//! `RETURN v` becomes `MOVE v` into the call's destination. The original
//! `ARG` block and `CALL` are detached afterwards.

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    intern::NameId,
    ir::{
        code::{InstrId, InstrList, Opcode},
        opt::PassLimits,
        value::{Value, ValueAllocator},
    },
};

/// A discovered function: entry past the parameter block, plus the
/// parameter values in source order.
#[derive(Debug)]
struct IrFunction {
    entry: Option<InstrId>,
    params: Vec<Value>,
}

/// Runs inlining rounds over every discovered function until a whole round
/// changes nothing, bounded by [`PassLimits::max_inline_rounds`]. A round
/// never re-inlines inside code it spliced in the same visit; the outer
/// rounds reach the fixed point.
pub fn inline_functions(list: &mut InstrList, alloc: &mut ValueAllocator, limits: &PassLimits) {
    let functions = discover_functions(list);
    for _ in 0..limits.max_inline_rounds {
        let mut changed = false;
        for index in 0..functions.len() {
            changed |= inline_in_function(list, alloc, &functions, index);
        }
        if !changed {
            break;
        }
    }
}

/// Scans the whole list once, recording every function in declaration order.
fn discover_functions(list: &InstrList) -> IndexMap<NameId, IrFunction> {
    let mut functions = IndexMap::new();
    let mut cursor = list.head();
    while let Some(id) = cursor {
        if list[id].op == Opcode::FunDec {
            let Some(Value::Symbol(name)) = list[id].result else {
                panic!("function declaration carries its name symbol")
            };
            let mut entry = list.next(id);
            let mut params = Vec::new();
            while let Some(param_id) = entry {
                if list[param_id].op != Opcode::Param {
                    break;
                }
                params.push(list[param_id].result.expect("parameter instruction carries its value"));
                entry = list.next(param_id);
            }
            functions.insert(name, IrFunction { entry, params });
        }
        cursor = list.next(id);
    }
    functions
}

/// Whether a function body can be spliced into its callers.
fn can_inline(list: &InstrList, function: &IrFunction) -> bool {
    let mut cursor = function.entry;
    while let Some(id) = cursor {
        let instr = &list[id];
        if instr.op == Opcode::FunDec {
            break;
        }
        if instr.op == Opcode::Call || instr.op == Opcode::Load {
            return false;
        }
        if instr.result.is_some_and(|result| function.params.contains(&result)) {
            return false;
        }
        cursor = list.next(id);
    }
    true
}

/// Walks one caller's body, inlining every eligible call site.
fn inline_in_function(
    list: &mut InstrList,
    alloc: &mut ValueAllocator,
    functions: &IndexMap<NameId, IrFunction>,
    index: usize,
) -> bool {
    let (caller_name, caller) = functions.get_index(index).expect("function index in range");
    let mut changed = false;
    let mut args: Vec<InstrId> = Vec::new();
    let mut cursor = caller.entry;
    while let Some(id) = cursor {
        match list[id].op {
            Opcode::FunDec => break,
            Opcode::Arg => args.push(id),
            Opcode::Call => {
                let Some(Value::Symbol(callee_name)) = list[id].arg1 else {
                    panic!("call instruction carries its callee symbol")
                };
                if callee_name != *caller_name
                    && let Some(callee) = functions.get(&callee_name)
                    && args.len() == callee.params.len()
                    && can_inline(list, callee)
                {
                    let ret = list[id].result.expect("call instruction carries a destination");
                    let mut remap: AHashMap<Value, Value> = AHashMap::new();
                    for (position, &param) in callee.params.iter().enumerate() {
                        let arg_id = args[args.len() - 1 - position];
                        let arg_value = list[arg_id].result.expect("arg instruction carries its operand");
                        remap.insert(param, arg_value);
                    }
                    splice_body(list, alloc, id, callee.entry, &mut remap, ret);
                    for &arg_id in &args {
                        list.detach(arg_id);
                    }
                    list.detach(id);
                    changed = true;
                }
                args.clear();
            }
            _ => {}
        }
        // The detached call still links forward into the spliced copy, so
        // the walk continues through the inlined body.
        cursor = list.next(id);
    }
    changed
}

/// Copies a callee body after `call_site`, applying the value remap,
/// freshening labels on first sight, and rewriting `RETURN` into a move of
/// the return value to the call destination.
fn splice_body(
    list: &mut InstrList,
    alloc: &mut ValueAllocator,
    call_site: InstrId,
    entry: Option<InstrId>,
    remap: &mut AHashMap<Value, Value>,
    ret: Value,
) {
    let mut tail = call_site;
    let mut cursor = entry;
    while let Some(id) = cursor {
        if list[id].op == Opcode::FunDec {
            break;
        }
        if matches!(list[id].op, Opcode::Label | Opcode::IfGoto | Opcode::Goto) {
            let label = list[id].result.expect("branch or label carries a target");
            remap.entry(label).or_insert_with(|| alloc.fresh_label());
        }
        let mut copy = list[id].payload_clone();
        for slot in [&mut copy.arg1, &mut copy.arg2, &mut copy.result] {
            if let Some(value) = *slot
                && let Some(&mapped) = remap.get(&value)
            {
                *slot = Some(mapped);
            }
        }
        if copy.op == Opcode::Return {
            copy.op = Opcode::Move;
            copy.arg1 = copy.result;
            copy.result = Some(ret);
        }
        cursor = list.next(id);
        tail = list.insert_after(tail, copy);
    }
}
