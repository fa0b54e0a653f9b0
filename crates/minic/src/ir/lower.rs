//! Syntax-directed lowering of a validated AST into three-address code.
//!
//! One pass over the tree. Every translation routine returns a chunk of
//! instructions; chunks concatenate in source order, so a routine that needs
//! to splice code out of order (the `for` step expression) just holds its
//! chunk aside. The finished chunks are threaded into an [`InstrList`].
//!
//! The generator assumes a semantically valid tree: shapes the analyzer
//! would have rejected are internal errors here.

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{
    ast::{Ast, AstOp, comma_list},
    intern::{NameId, NameInterner},
    ir::{
        code::{Instr, InstrList, Opcode, Relop},
        value::{Value, ValueAllocator},
    },
};

/// Shape of one declared array: its dimensions outer-to-inner and the
/// derived row-major byte strides (`sizes[i] = 4 * product of the dimensions
/// inside level i`). Arrays that arrived as formal parameters hold an
/// address rather than storage, and are flagged so uses copy the address
/// instead of taking one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInfo {
    pub name: NameId,
    pub dimensions: SmallVec<[i32; 4]>,
    pub sizes: SmallVec<[i32; 4]>,
    pub param: bool,
}

/// Loop context handed down to statement lowering; `break` and `continue`
/// branch to these inherited labels.
#[derive(Debug, Clone, Copy, Default)]
struct LoopLabels {
    cont: Option<Value>,
    brk: Option<Value>,
}

type Chunk = Vec<Instr>;

/// How a binary operator lowers.
enum BinaryKind {
    Arith(Opcode),
    Cond,
}

fn binary_kind(op: AstOp) -> BinaryKind {
    match op {
        AstOp::Plus => BinaryKind::Arith(Opcode::Add),
        AstOp::Minus => BinaryKind::Arith(Opcode::Minus),
        AstOp::Mul => BinaryKind::Arith(Opcode::Mul),
        AstOp::Div => BinaryKind::Arith(Opcode::Div),
        AstOp::And | AstOp::Or | AstOp::Lt | AstOp::Le | AstOp::Gt | AstOp::Ge | AstOp::Ne | AstOp::Eq => {
            BinaryKind::Cond
        }
        _ => panic!("unsupported binary operator {}", op.grammar_name()),
    }
}

fn relop_of(op: AstOp) -> Relop {
    match op {
        AstOp::Lt => Relop::Lt,
        AstOp::Le => Relop::Le,
        AstOp::Gt => Relop::Gt,
        AstOp::Ge => Relop::Ge,
        AstOp::Eq => Relop::Eq,
        AstOp::Ne => Relop::Ne,
        _ => panic!("{} is not a comparison operator", op.grammar_name()),
    }
}

/// True for an `Exp` wrapping a bare identifier.
fn is_id_exp(exp: &Ast) -> bool {
    matches!(exp.children.as_slice(), [id] if id.op == AstOp::Id)
}

/// True for an `Exp LB Exp RB` array index expression.
fn is_index_exp(exp: &Ast) -> bool {
    matches!(exp.children.as_slice(), [_, lb, _, _] if lb.op == AstOp::Lb)
}

/// The translation context of one unit: fresh-id counters, interned
/// variable values, and the array registries.
#[derive(Debug, Default)]
pub struct IrGen {
    names: NameInterner,
    alloc: ValueAllocator,
    /// All references to one identifier share one interned `Value`.
    vars: AHashMap<NameId, Value>,
    arrays: AHashMap<NameId, ArrayInfo>,
    /// Value-to-array classification, for passing arrays by address at call
    /// sites.
    value_arrays: AHashMap<Value, NameId>,
}

impl IrGen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowers a whole translation unit.
    pub fn translate(&mut self, ast: &Ast) -> InstrList {
        let chunk = self.translate_node(ast, LoopLabels::default());
        InstrList::from_instrs(chunk)
    }

    /// Hands back the interner and allocator once lowering is done, for
    /// rendering and for passes that mint fresh labels.
    #[must_use]
    pub fn finish(self) -> (NameInterner, ValueAllocator) {
        (self.names, self.alloc)
    }

    /// The interner accumulated so far, for rendering intermediate output.
    #[must_use]
    pub fn names(&self) -> &NameInterner {
        &self.names
    }

    /// The unique `Value` for an identifier, interned on first sight.
    fn lookup_var(&mut self, name: &str) -> Value {
        let id = self.names.intern(name);
        if let Some(&value) = self.vars.get(&id) {
            return value;
        }
        let value = self.alloc.fresh_var();
        self.vars.insert(id, value);
        value
    }

    fn translate_node(&mut self, ast: &Ast, labels: LoopLabels) -> Chunk {
        match ast.op {
            AstOp::Exp => {
                let mut dest = self.alloc.fresh_temp();
                self.translate_exp(ast, &mut dest)
            }
            AstOp::FunDec => self.translate_fun_dec(ast),
            AstOp::Dec => self.translate_dec(ast),
            AstOp::Stmt => self.translate_stmt(ast, labels),
            _ => {
                let mut chunk = Chunk::new();
                for child in &ast.children {
                    chunk.extend(self.translate_node(child, labels));
                }
                chunk
            }
        }
    }

    /// Lowers an expression into `dest`.
    ///
    /// When `dest` is a fresh temporary and the expression is a bare
    /// identifier, the destination is redirected to the identifier's own
    /// value and nothing is emitted.
    fn translate_exp(&mut self, exp: &Ast, dest: &mut Value) -> Chunk {
        match exp.children.as_slice() {
            [lit] if lit.op == AstOp::IntLit => vec![Instr::mov(Value::Const(lit.val), *dest)],
            [id] if id.op == AstOp::Id => {
                let var = self.lookup_var(id.text());
                if matches!(dest, Value::Temp(_)) {
                    *dest = var;
                    Chunk::new()
                } else {
                    vec![Instr::mov(var, *dest)]
                }
            }
            // Floats, chars and record field access are accepted
            // syntactically but have no integer lowering.
            [lit] if lit.op == AstOp::FloatLit || lit.op == AstOp::CharLit => Chunk::new(),
            [_object, dot, _field] if dot.op == AstOp::Dot => Chunk::new(),
            [left, assign, right] if assign.op == AstOp::Assign => {
                if is_index_exp(left) {
                    let addr = self.alloc.fresh_pointer();
                    let mut value = self.alloc.fresh_pointer();
                    let mut chunk = Chunk::new();
                    self.translate_array(left, addr, &mut chunk);
                    chunk.extend(self.translate_exp(right, &mut value));
                    chunk.push(Instr::store(value, addr));
                    chunk
                } else if is_id_exp(left) {
                    let mut target = self.lookup_var(left.children[0].text());
                    self.translate_exp(right, &mut target)
                } else {
                    panic!("unsupported assignment target shape {}", left.shape_key())
                }
            }
            [left, op, right] if left.op == AstOp::Exp && right.op == AstOp::Exp => match binary_kind(op.op) {
                BinaryKind::Arith(opcode) => {
                    let mut t1 = self.alloc.fresh_temp();
                    let mut t2 = self.alloc.fresh_temp();
                    let mut chunk = self.translate_exp(left, &mut t1);
                    chunk.extend(self.translate_exp(right, &mut t2));
                    chunk.push(Instr::binary(opcode, t1, t2, *dest));
                    chunk
                }
                BinaryKind::Cond => self.materialize_cond(exp, *dest),
            },
            [sign, operand] if sign.op == AstOp::Minus => {
                let mut chunk = self.translate_exp(operand, dest);
                chunk.push(Instr::binary(Opcode::Minus, Value::Const(0), *dest, *dest));
                chunk
            }
            [sign, _] if sign.op == AstOp::Not => self.materialize_cond(exp, *dest),
            [callee, lp, _rp] if callee.op == AstOp::Id && lp.op == AstOp::Lp => {
                if callee.text() == "read" {
                    vec![Instr::read(*dest)]
                } else {
                    let function = Value::Symbol(self.names.intern(callee.text()));
                    vec![Instr::call(function, *dest)]
                }
            }
            [callee, _lp, args, _rp] if callee.op == AstOp::Id => {
                if callee.text() == "write" {
                    let mut chunk = self.translate_exp(&args.children[0], dest);
                    chunk.push(Instr::write(*dest));
                    chunk
                } else {
                    self.translate_call(callee, args, *dest)
                }
            }
            [_, lb, _, _] if lb.op == AstOp::Lb => {
                let addr = self.alloc.fresh_pointer();
                let mut chunk = Chunk::new();
                self.translate_array(exp, addr, &mut chunk);
                chunk.push(Instr::load(addr, *dest));
                chunk
            }
            [lp, inner, _rp] if lp.op == AstOp::Lp => self.translate_exp(inner, dest),
            _ => panic!("unsupported expression shape {}", exp.shape_key()),
        }
    }

    /// Lowers a call with arguments: argument expressions evaluate left to
    /// right into fresh temporaries, then `ARG`s are emitted rightmost
    /// first. An argument naming an array passes its address.
    fn translate_call(&mut self, callee: &Ast, args: &Ast, dest: Value) -> Chunk {
        let mut chunk = Chunk::new();
        let mut arg_values = Vec::new();
        for arg in comma_list(args) {
            let mut temp = self.alloc.fresh_temp();
            chunk.extend(self.translate_exp(arg, &mut temp));
            arg_values.push(temp);
        }
        for &value in arg_values.iter().rev() {
            if self.value_arrays.contains_key(&value) {
                let addr = self.alloc.fresh_pointer();
                chunk.push(Instr::load_addr(value, addr));
                chunk.push(Instr::arg(addr));
            } else {
                chunk.push(Instr::arg(value));
            }
        }
        let function = Value::Symbol(self.names.intern(callee.text()));
        chunk.push(Instr::call(function, dest));
        chunk
    }

    /// Lowers a boolean-valued expression at a value position: branch to one
    /// of two fresh labels, then materialize `#1`/`#0` into `dest`.
    fn materialize_cond(&mut self, exp: &Ast, dest: Value) -> Chunk {
        let lb_true = self.alloc.fresh_label();
        let lb_false = self.alloc.fresh_label();
        let mut chunk = self.translate_cond(exp, lb_true, lb_false);
        chunk.push(Instr::label(lb_true));
        chunk.push(Instr::mov(Value::Const(1), dest));
        chunk.push(Instr::label(lb_false));
        chunk.push(Instr::mov(Value::Const(0), dest));
        chunk
    }

    /// Short-circuit lowering of a condition: control transfers to `lb_true`
    /// or `lb_false`, never falls through past the chunk.
    fn translate_cond(&mut self, exp: &Ast, lb_true: Value, lb_false: Value) -> Chunk {
        match exp.children.as_slice() {
            [lp, inner, _rp] if lp.op == AstOp::Lp => self.translate_cond(inner, lb_true, lb_false),
            [sign, operand] if sign.op == AstOp::Not => self.translate_cond(operand, lb_false, lb_true),
            [left, op, right] if left.op == AstOp::Exp && right.op == AstOp::Exp => match op.op {
                AstOp::And => {
                    let lb_mid = self.alloc.fresh_label();
                    let mut chunk = self.translate_cond(left, lb_mid, lb_false);
                    chunk.push(Instr::label(lb_mid));
                    chunk.extend(self.translate_cond(right, lb_true, lb_false));
                    chunk
                }
                AstOp::Or => {
                    let lb_mid = self.alloc.fresh_label();
                    let mut chunk = self.translate_cond(left, lb_true, lb_mid);
                    chunk.push(Instr::label(lb_mid));
                    chunk.extend(self.translate_cond(right, lb_true, lb_false));
                    chunk
                }
                op if op.is_relational() => {
                    let mut t1 = self.alloc.fresh_temp();
                    let mut t2 = self.alloc.fresh_temp();
                    let mut chunk = self.translate_exp(left, &mut t1);
                    chunk.extend(self.translate_exp(right, &mut t2));
                    chunk.push(Instr::ifgoto(t1, relop_of(op), t2, lb_true));
                    chunk.push(Instr::goto(lb_false));
                    chunk
                }
                _ => panic!("unsupported condition operator {}", op.op.grammar_name()),
            },
            _ => panic!("unsupported condition shape {}", exp.shape_key()),
        }
    }

    /// Computes the byte address of an array element into `dest`.
    ///
    /// Returns the array being indexed and the recursion depth, so each
    /// level multiplies its index by the right row-major stride.
    fn translate_array(&mut self, exp: &Ast, dest: Value, chunk: &mut Chunk) -> (NameId, usize) {
        match exp.children.as_slice() {
            [id] if id.op == AstOp::Id => {
                let name = self.names.intern(id.text());
                let var = self.lookup_var(id.text());
                let param = self
                    .arrays
                    .get(&name)
                    .unwrap_or_else(|| panic!("indexing into undeclared array {}", id.text()))
                    .param;
                if param {
                    // A parameter already holds the array's address.
                    chunk.push(Instr::mov(var, dest));
                } else {
                    chunk.push(Instr::load_addr(var, dest));
                }
                (name, 0)
            }
            [base, lb, index, _rb] if lb.op == AstOp::Lb => {
                let addr = self.alloc.fresh_pointer();
                let mut offset = self.alloc.fresh_pointer();
                let (array, depth) = self.translate_array(base, addr, chunk);
                chunk.extend(self.translate_exp(index, &mut offset));
                let stride = self.arrays.get(&array).expect("array registered during recursion").sizes[depth];
                chunk.push(Instr::binary(Opcode::Mul, offset, Value::Const(stride), offset));
                chunk.push(Instr::binary(Opcode::Add, addr, offset, addr));
                chunk.push(Instr::mov(addr, dest));
                (array, depth + 1)
            }
            _ => panic!("unsupported array shape {}", exp.shape_key()),
        }
    }

    fn translate_dec(&mut self, dec: &Ast) -> Chunk {
        match dec.children.as_slice() {
            // VarDec ASSIGN Exp: lower the initializer straight into the
            // variable's value.
            [var_dec, _assign, init] => {
                let mut dest = self.lookup_var(var_dec.children[0].text());
                self.translate_exp(init, &mut dest)
            }
            [var_dec] => self.translate_var_dec(var_dec, false),
            _ => Chunk::new(),
        }
    }

    /// Registers an array declaration and emits its allocation. Scalar
    /// declarations emit nothing.
    fn translate_var_dec(&mut self, var_dec: &Ast, param: bool) -> Chunk {
        fn shape(var_dec: &Ast) -> (&str, SmallVec<[i32; 4]>) {
            match var_dec.children.as_slice() {
                [id] => (id.text(), SmallVec::new()),
                [inner, _lb, size, _rb] => {
                    let (name, mut dimensions) = shape(inner);
                    dimensions.push(size.val);
                    (name, dimensions)
                }
                _ => panic!("unsupported declarator shape {}", var_dec.shape_key()),
            }
        }
        let (name, dimensions) = shape(var_dec);
        if dimensions.is_empty() {
            return Chunk::new();
        }
        let mut sizes = SmallVec::new();
        for level in 0..dimensions.len() {
            sizes.push(4 * dimensions[level + 1..].iter().product::<i32>());
        }
        let total = 4 * dimensions.iter().product::<i32>();
        let name_id = self.names.intern(name);
        let var = self.lookup_var(name);
        self.arrays.insert(name_id, ArrayInfo { name: name_id, dimensions, sizes, param });
        self.value_arrays.insert(var, name_id);
        vec![Instr::alloc(var, total)]
    }

    /// Emits `FUNDEC` followed by the `PARAM` block in source order. Array
    /// formals register as parameter arrays; their allocation is dropped.
    fn translate_fun_dec(&mut self, fun_dec: &Ast) -> Chunk {
        let name = Value::Symbol(self.names.intern(fun_dec.children[0].text()));
        let mut chunk = vec![Instr::fundec(name)];
        if fun_dec.children.len() == 4 {
            for param_dec in comma_list(&fun_dec.children[2]) {
                let value = self.param_value(&param_dec.children[1]);
                chunk.push(Instr::param(value));
            }
        }
        chunk
    }

    fn param_value(&mut self, var_dec: &Ast) -> Value {
        let mut node = var_dec;
        let mut is_array = false;
        while node.children[0].op != AstOp::Id {
            node = &node.children[0];
            is_array = true;
        }
        if is_array {
            let _alloc_dropped = self.translate_var_dec(var_dec, true);
        }
        self.lookup_var(node.children[0].text())
    }

    fn translate_stmt(&mut self, stmt: &Ast, labels: LoopLabels) -> Chunk {
        let children = &stmt.children;
        if children.len() <= 2 {
            return match children.first().map(|c| c.op) {
                Some(AstOp::Continue) => {
                    vec![Instr::goto(labels.cont.expect("continue outside of a loop"))]
                }
                Some(AstOp::Break) => vec![Instr::goto(labels.brk.expect("break outside of a loop"))],
                Some(_) => self.translate_node(&children[0], labels),
                None => Chunk::new(),
            };
        }
        match children[0].op {
            AstOp::Return => {
                let mut temp = self.alloc.fresh_temp();
                let mut chunk = self.translate_exp(&children[1], &mut temp);
                chunk.push(Instr::ret(temp));
                chunk
            }
            AstOp::If if children.len() == 5 => {
                let lb_then = self.alloc.fresh_label();
                let lb_end = self.alloc.fresh_label();
                let mut chunk = self.translate_cond(&children[2], lb_then, lb_end);
                chunk.push(Instr::label(lb_then));
                chunk.extend(self.translate_stmt(&children[4], labels));
                chunk.push(Instr::label(lb_end));
                chunk
            }
            AstOp::If if children.len() == 7 => {
                let lb_then = self.alloc.fresh_label();
                let lb_else = self.alloc.fresh_label();
                let lb_end = self.alloc.fresh_label();
                let mut chunk = self.translate_cond(&children[2], lb_then, lb_else);
                chunk.push(Instr::label(lb_then));
                chunk.extend(self.translate_stmt(&children[4], labels));
                chunk.push(Instr::goto(lb_end));
                chunk.push(Instr::label(lb_else));
                chunk.extend(self.translate_stmt(&children[6], labels));
                chunk.push(Instr::label(lb_end));
                chunk
            }
            AstOp::Do => {
                // DO Stmt WHILE LP Exp RP SEMI
                let lb_body = self.alloc.fresh_label();
                let lb_cond = self.alloc.fresh_label();
                let lb_end = self.alloc.fresh_label();
                let mut chunk = vec![Instr::label(lb_body)];
                chunk.extend(self.translate_stmt(&children[1], LoopLabels { cont: Some(lb_cond), brk: Some(lb_end) }));
                chunk.push(Instr::label(lb_cond));
                chunk.extend(self.translate_cond(&children[4], lb_body, lb_end));
                chunk.push(Instr::goto(lb_body));
                chunk.push(Instr::label(lb_end));
                chunk
            }
            AstOp::While => {
                // WHILE LP Exp RP Stmt
                let lb_head = self.alloc.fresh_label();
                let lb_body = self.alloc.fresh_label();
                let lb_end = self.alloc.fresh_label();
                let mut chunk = vec![Instr::label(lb_head)];
                chunk.extend(self.translate_cond(&children[2], lb_body, lb_end));
                chunk.push(Instr::label(lb_body));
                chunk.extend(self.translate_stmt(&children[4], LoopLabels { cont: Some(lb_head), brk: Some(lb_end) }));
                chunk.push(Instr::goto(lb_head));
                chunk.push(Instr::label(lb_end));
                chunk
            }
            AstOp::For => {
                // FOR LP Exp SEMI Exp SEMI Exp RP Stmt; absent clauses are
                // NOP placeholders. The step chunk is translated before the
                // body but spliced after it; continue re-tests the condition
                // without running the step.
                let lb_head = self.alloc.fresh_label();
                let lb_body = self.alloc.fresh_label();
                let lb_end = self.alloc.fresh_label();
                let mut chunk = self.translate_node(&children[2], labels);
                let step = self.translate_node(&children[6], labels);
                chunk.push(Instr::label(lb_head));
                if children[4].op != AstOp::Nop {
                    chunk.extend(self.translate_cond(&children[4], lb_body, lb_end));
                }
                chunk.push(Instr::label(lb_body));
                chunk.extend(self.translate_stmt(&children[8], LoopLabels { cont: Some(lb_head), brk: Some(lb_end) }));
                chunk.extend(step);
                chunk.push(Instr::goto(lb_head));
                chunk.push(Instr::label(lb_end));
                chunk
            }
            _ => Chunk::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn exp(children: Vec<Ast>) -> Ast {
        let mut e = Ast::new(AstOp::Exp, 1);
        e.children = children;
        e
    }

    fn e_id(name: &str) -> Ast {
        exp(vec![Ast::id(name, 1)])
    }

    fn e_int(v: i32) -> Ast {
        exp(vec![Ast::int(v, 1)])
    }

    fn e_bin(l: Ast, op: AstOp, r: Ast) -> Ast {
        exp(vec![l, Ast::sign(op), r])
    }

    fn e_assign(l: Ast, r: Ast) -> Ast {
        exp(vec![l, Ast::sign(AstOp::Assign), r])
    }

    fn e_index(base: Ast, index: Ast) -> Ast {
        exp(vec![base, Ast::sign(AstOp::Lb), index, Ast::sign(AstOp::Rb)])
    }

    fn e_call(name: &str, args: Vec<Ast>) -> Ast {
        if args.is_empty() {
            exp(vec![Ast::id(name, 1), Ast::sign(AstOp::Lp), Ast::sign(AstOp::Rp)])
        } else {
            let mut list = None;
            for arg in args.into_iter().rev() {
                list = Some(match list {
                    None => Ast::new(AstOp::Args, 1).child(arg),
                    Some(rest) => Ast::new(AstOp::Args, 1).child(arg).child(Ast::sign(AstOp::Comma)).child(rest),
                });
            }
            exp(vec![Ast::id(name, 1), Ast::sign(AstOp::Lp), list.expect("nonempty"), Ast::sign(AstOp::Rp)])
        }
    }

    fn var_dec_array(name: &str, dims: &[i32]) -> Ast {
        let mut node = Ast::new(AstOp::VarDec, 1).child(Ast::id(name, 1));
        for &d in dims {
            node = Ast::new(AstOp::VarDec, 1)
                .child(node)
                .child(Ast::sign(AstOp::Lb))
                .child(Ast::int(d, 1))
                .child(Ast::sign(AstOp::Rb));
        }
        node
    }

    fn ops(list: &InstrList) -> Vec<Opcode> {
        list.iter().map(|id| list[id].op).collect()
    }

    #[test]
    fn constant_addition_lowers_through_temps() {
        let mut lowering = IrGen::new();
        let ast = e_assign(e_id("a"), e_bin(e_int(1), AstOp::Plus, e_int(2)));
        let list = lowering.translate(&ast);
        assert_eq!(ops(&list), vec![Opcode::Move, Opcode::Move, Opcode::Add]);
        // Both constants flow through fresh temporaries into the variable.
        let add = list.iter().last().unwrap();
        assert_eq!(list[add].result, Some(Value::Var(1)));
    }

    #[test]
    fn identifier_into_fresh_temp_redirects_without_emission() {
        let mut lowering = IrGen::new();
        let a = lowering.lookup_var("a");
        let mut dest = Value::Temp(99);
        let chunk = lowering.translate_exp(&e_id("a"), &mut dest);
        assert!(chunk.is_empty());
        assert_eq!(dest, a);
        // A non-temporary destination still gets an explicit move.
        let mut var_dest = Value::Var(7);
        let chunk = lowering.translate_exp(&e_id("a"), &mut var_dest);
        assert_eq!(chunk.len(), 1);
        assert_eq!(chunk[0].op, Opcode::Move);
    }

    #[test]
    fn write_of_variable_emits_no_copy() {
        let mut lowering = IrGen::new();
        let a = lowering.lookup_var("a");
        let ast = e_call("write", vec![e_id("a")]);
        let list = lowering.translate(&ast);
        assert_eq!(ops(&list), vec![Opcode::Write]);
        let write = list.head().unwrap();
        assert_eq!(list[write].result, Some(a));
    }

    #[test]
    fn read_and_calls_use_intrinsics_or_call() {
        let mut lowering = IrGen::new();
        let list = lowering.translate(&e_assign(e_id("x"), e_call("read", vec![])));
        assert_eq!(ops(&list), vec![Opcode::Read]);
        let mut lowering = IrGen::new();
        let list = lowering.translate(&e_assign(e_id("x"), e_call("helper", vec![])));
        assert_eq!(ops(&list), vec![Opcode::Call]);
    }

    #[test]
    fn call_arguments_emit_reversed() {
        let mut lowering = IrGen::new();
        let x = lowering.lookup_var("x");
        let y = lowering.lookup_var("y");
        let ast = e_call("f", vec![e_id("x"), e_id("y")]);
        let list = lowering.translate(&ast);
        assert_eq!(ops(&list), vec![Opcode::Arg, Opcode::Arg, Opcode::Call]);
        let ids: Vec<_> = list.iter().collect();
        // Rightmost argument first.
        assert_eq!(list[ids[0]].result, Some(y));
        assert_eq!(list[ids[1]].result, Some(x));
    }

    #[test]
    fn array_declaration_allocates_row_major_bytes() {
        let mut lowering = IrGen::new();
        let dec = Ast::new(AstOp::Dec, 1).child(var_dec_array("a", &[3, 4]));
        let list = lowering.translate(&dec);
        assert_eq!(ops(&list), vec![Opcode::Alloc]);
        let alloc = list.head().unwrap();
        assert_eq!(list[alloc].size, 48);
        let name = lowering.names.get("a").unwrap();
        let info = &lowering.arrays[&name];
        assert_eq!(info.dimensions.as_slice(), &[3, 4]);
        assert_eq!(info.sizes.as_slice(), &[16, 4]);
        assert!(!info.param);
    }

    #[test]
    fn two_dimensional_store_uses_strides() {
        let mut lowering = IrGen::new();
        let dec = Ast::new(AstOp::Dec, 1).child(var_dec_array("a", &[3, 4]));
        let mut chunk = lowering.translate_node(&dec, LoopLabels::default());
        let store = e_assign(e_index(e_index(e_id("a"), e_id("i")), e_id("j")), e_int(7));
        chunk.extend(lowering.translate_node(&store, LoopLabels::default()));
        let list = InstrList::from_instrs(chunk);
        let strides: Vec<i32> = list
            .iter()
            .filter(|&id| list[id].op == Opcode::Mul)
            .filter_map(|id| list[id].arg2.and_then(Value::const_val))
            .collect();
        assert_eq!(strides, vec![16, 4]);
        let last = list.iter().last().unwrap();
        assert_eq!(list[last].op, Opcode::Store);
        assert_eq!(list[last].arg1.and_then(Value::const_val), None); // value sits in a pointer temp
    }

    #[test]
    fn short_circuit_and_branches_to_false_label() {
        let mut lowering = IrGen::new();
        let cond = e_bin(
            e_bin(e_id("x"), AstOp::Gt, e_int(0)),
            AstOp::And,
            e_bin(e_id("x"), AstOp::Lt, e_int(10)),
        );
        let lb_true = lowering.alloc.fresh_label();
        let lb_false = lowering.alloc.fresh_label();
        let chunk = lowering.translate_cond(&cond, lb_true, lb_false);
        let list = InstrList::from_instrs(chunk);
        let branches: Vec<_> = list.iter().filter(|&id| list[id].op == Opcode::IfGoto).collect();
        assert_eq!(branches.len(), 2);
        assert_eq!(list[branches[0]].relop, Some(Relop::Gt));
        assert_eq!(list[branches[1]].relop, Some(Relop::Lt));
        // The first comparison's failure path is the shared false label.
        let first_goto = list.iter().find(|&id| list[id].op == Opcode::Goto).unwrap();
        assert_eq!(list[first_goto].result, Some(lb_false));
        // The second comparison's success path is the true label.
        assert_eq!(list[branches[1]].result, Some(lb_true));
    }

    #[test]
    fn for_statement_splices_step_after_body() {
        // for (i = 0; i < 3; i = i + 1) write(i);
        let mut lowering = IrGen::new();
        let stmt = Ast::new(AstOp::Stmt, 1)
            .child(Ast::sign(AstOp::For))
            .child(Ast::sign(AstOp::Lp))
            .child(e_assign(e_id("i"), e_int(0)))
            .child(Ast::sign(AstOp::Semi))
            .child(e_bin(e_id("i"), AstOp::Lt, e_int(3)))
            .child(Ast::sign(AstOp::Semi))
            .child(e_assign(e_id("i"), e_bin(e_id("i"), AstOp::Plus, e_int(1))))
            .child(Ast::sign(AstOp::Rp))
            .child(Ast::new(AstOp::Stmt, 1).child(e_call("write", vec![e_id("i")])).child(Ast::sign(AstOp::Semi)));
        let list = lowering.translate(&stmt);
        let sequence = ops(&list);
        // The WRITE of the body appears before the step's ADD, which appears
        // before the back-edge GOTO.
        let write_at = sequence.iter().position(|&op| op == Opcode::Write).unwrap();
        let add_at = sequence.iter().rposition(|&op| op == Opcode::Add).unwrap();
        let goto_at = sequence.iter().rposition(|&op| op == Opcode::Goto).unwrap();
        assert!(write_at < add_at && add_at < goto_at);
    }

    #[test]
    fn break_and_continue_target_inherited_labels() {
        // while (x < 1) break;
        let mut lowering = IrGen::new();
        let body = Ast::new(AstOp::Stmt, 1).child(Ast::sign(AstOp::Break)).child(Ast::sign(AstOp::Semi));
        let stmt = Ast::new(AstOp::Stmt, 1)
            .child(Ast::sign(AstOp::While))
            .child(Ast::sign(AstOp::Lp))
            .child(e_bin(e_id("x"), AstOp::Lt, e_int(1)))
            .child(Ast::sign(AstOp::Rp))
            .child(body);
        let list = lowering.translate(&stmt);
        let ids: Vec<_> = list.iter().collect();
        let end_label = list[*ids.last().unwrap()].result;
        let break_goto = ids
            .iter()
            .filter(|&&id| list[id].op == Opcode::Goto)
            .find(|&&id| list[id].result == end_label)
            .copied();
        assert!(break_goto.is_some(), "break must branch to the loop-exit label");
    }

    #[test]
    fn array_formals_register_as_parameters_without_alloc() {
        let mut lowering = IrGen::new();
        let param = Ast::new(AstOp::ParamDec, 1)
            .child(Ast::specifier(crate::ast::Primitive::Int, 1))
            .child(var_dec_array("buf", &[8]));
        let fun_dec = Ast::new(AstOp::FunDec, 1)
            .child(Ast::id("fill", 1))
            .child(Ast::sign(AstOp::Lp))
            .child(Ast::new(AstOp::VarList, 1).child(param))
            .child(Ast::sign(AstOp::Rp));
        let list = lowering.translate(&fun_dec);
        assert_eq!(ops(&list), vec![Opcode::FunDec, Opcode::Param]);
        let name = lowering.names.get("buf").unwrap();
        assert!(lowering.arrays[&name].param);
        // Uses of the formal copy the address instead of taking one.
        let mut chunk = Chunk::new();
        let dest = lowering.alloc.fresh_pointer();
        lowering.translate_array(&e_index(e_id("buf"), e_int(0)), dest, &mut chunk);
        assert_eq!(chunk[0].op, Opcode::Move);
    }
}
