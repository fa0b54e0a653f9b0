//! Instructions and the arena-backed doubly-linked instruction list.
//!
//! Instructions live in an arena and are addressed by stable [`InstrId`]s;
//! `prev`/`next` links thread them into a doubly-linked sequence. Removal is
//! *detachment*: the node is unlinked from its neighbors but keeps its own
//! links, so a cursor standing on a just-detached node still walks forward
//! through the live sequence. Detached nodes are never reused.

use std::ops::{Index, IndexMut};

use crate::intern::NameInterner;
use crate::ir::value::Value;

/// IR operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    Move,
    Add,
    Minus,
    Mul,
    Div,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    And,
    Or,
    Not,
    FunDec,
    Label,
    IfGoto,
    Goto,
    Read,
    Write,
    Call,
    Return,
    Arg,
    Param,
    LoadAddr,
    Load,
    Store,
    Alloc,
}

impl Opcode {
    /// Printed operator for the four arithmetic opcodes.
    #[must_use]
    pub fn arith_symbol(self) -> Option<&'static str> {
        match self {
            Self::Add => Some("+"),
            Self::Minus => Some("-"),
            Self::Mul => Some("*"),
            Self::Div => Some("/"),
            _ => None,
        }
    }

    /// Whether the instruction defines its `result` operand. Labels are
    /// treated as assignments to themselves by dead-value elimination.
    #[must_use]
    pub(crate) fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Call | Self::Move | Self::Add | Self::Minus | Self::Mul | Self::Div | Self::Alloc | Self::Load | Self::LoadAddr
        )
    }
}

/// The six comparison operators an `IFGOTO` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relop {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Relop {
    /// The logically negated comparison (used when a conditional branch is
    /// inverted over its fall-through).
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
            Self::Ge => Self::Lt,
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// Index of an instruction in its [`InstrList`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstrId(u32);

impl InstrId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One three-address instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub op: Opcode,
    pub arg1: Option<Value>,
    pub arg2: Option<Value>,
    pub result: Option<Value>,
    /// Set exactly on `IFGOTO`.
    pub relop: Option<Relop>,
    /// Allocation size in bytes; meaningful only on `ALLOC`, where it is
    /// strictly positive.
    pub size: i32,
    prev: Option<InstrId>,
    next: Option<InstrId>,
    detached: bool,
}

impl Instr {
    fn raw(op: Opcode) -> Self {
        Self { op, arg1: None, arg2: None, result: None, relop: None, size: 0, prev: None, next: None, detached: false }
    }

    #[must_use]
    pub fn mov(src: Value, dst: Value) -> Self {
        let mut i = Self::raw(Opcode::Move);
        i.arg1 = Some(src);
        i.result = Some(dst);
        i
    }

    #[must_use]
    pub fn binary(op: Opcode, a: Value, b: Value, dst: Value) -> Self {
        debug_assert!(op.arith_symbol().is_some(), "binary() is for arithmetic opcodes");
        let mut i = Self::raw(op);
        i.arg1 = Some(a);
        i.arg2 = Some(b);
        i.result = Some(dst);
        i
    }

    #[must_use]
    pub fn label(label: Value) -> Self {
        let mut i = Self::raw(Opcode::Label);
        i.result = Some(label);
        i
    }

    #[must_use]
    pub fn goto(target: Value) -> Self {
        let mut i = Self::raw(Opcode::Goto);
        i.result = Some(target);
        i
    }

    #[must_use]
    pub fn ifgoto(a: Value, relop: Relop, b: Value, target: Value) -> Self {
        let mut i = Self::raw(Opcode::IfGoto);
        i.arg1 = Some(a);
        i.arg2 = Some(b);
        i.result = Some(target);
        i.relop = Some(relop);
        i
    }

    #[must_use]
    pub fn fundec(name: Value) -> Self {
        let mut i = Self::raw(Opcode::FunDec);
        i.result = Some(name);
        i
    }

    #[must_use]
    pub fn param(value: Value) -> Self {
        let mut i = Self::raw(Opcode::Param);
        i.result = Some(value);
        i
    }

    #[must_use]
    pub fn arg(value: Value) -> Self {
        let mut i = Self::raw(Opcode::Arg);
        i.result = Some(value);
        i
    }

    #[must_use]
    pub fn call(function: Value, dst: Value) -> Self {
        let mut i = Self::raw(Opcode::Call);
        i.arg1 = Some(function);
        i.result = Some(dst);
        i
    }

    #[must_use]
    pub fn ret(value: Value) -> Self {
        let mut i = Self::raw(Opcode::Return);
        i.result = Some(value);
        i
    }

    #[must_use]
    pub fn read(dst: Value) -> Self {
        let mut i = Self::raw(Opcode::Read);
        i.result = Some(dst);
        i
    }

    #[must_use]
    pub fn write(value: Value) -> Self {
        let mut i = Self::raw(Opcode::Write);
        i.result = Some(value);
        i
    }

    #[must_use]
    pub fn load(addr: Value, dst: Value) -> Self {
        let mut i = Self::raw(Opcode::Load);
        i.arg1 = Some(addr);
        i.result = Some(dst);
        i
    }

    #[must_use]
    pub fn store(value: Value, addr: Value) -> Self {
        let mut i = Self::raw(Opcode::Store);
        i.arg1 = Some(value);
        i.result = Some(addr);
        i
    }

    #[must_use]
    pub fn load_addr(src: Value, dst: Value) -> Self {
        let mut i = Self::raw(Opcode::LoadAddr);
        i.arg1 = Some(src);
        i.result = Some(dst);
        i
    }

    #[must_use]
    pub fn alloc(var: Value, size: i32) -> Self {
        debug_assert!(size > 0, "allocation size must be positive");
        let mut i = Self::raw(Opcode::Alloc);
        i.result = Some(var);
        i.size = size;
        i
    }

    /// A link-free copy of this instruction's payload, for splicing
    /// elsewhere in a list.
    #[must_use]
    pub fn payload_clone(&self) -> Self {
        let mut copy = self.clone();
        copy.prev = None;
        copy.next = None;
        copy.detached = false;
        copy
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Renders the instruction in IR text form.
    #[must_use]
    pub fn render(&self, names: &NameInterner) -> String {
        let arg1 = |v: &Option<Value>| v.expect("instruction missing arg1").render(names);
        let result = |v: &Option<Value>| v.expect("instruction missing result").render(names);
        match self.op {
            Opcode::Move => format!("{} := {}", result(&self.result), arg1(&self.arg1)),
            Opcode::LoadAddr => format!("{} := &{}", result(&self.result), arg1(&self.arg1)),
            Opcode::Load => format!("{} := *{}", result(&self.result), arg1(&self.arg1)),
            Opcode::Store => format!("*{} := {}", result(&self.result), arg1(&self.arg1)),
            Opcode::Add | Opcode::Minus | Opcode::Mul | Opcode::Div => format!(
                "{} := {} {} {}",
                result(&self.result),
                arg1(&self.arg1),
                self.op.arith_symbol().expect("arithmetic opcode"),
                self.arg2.expect("arithmetic instruction missing arg2").render(names),
            ),
            Opcode::FunDec => format!("FUNCTION {} :", result(&self.result)),
            Opcode::Label => format!("LABEL {} :", result(&self.result)),
            Opcode::IfGoto => format!(
                "IF {} {} {} GOTO {}",
                arg1(&self.arg1),
                self.relop.expect("conditional branch missing relop").symbol(),
                self.arg2.expect("conditional branch missing arg2").render(names),
                result(&self.result),
            ),
            Opcode::Goto => format!("GOTO {}", result(&self.result)),
            Opcode::Read => format!("READ {}", result(&self.result)),
            Opcode::Write => format!("WRITE {}", result(&self.result)),
            Opcode::Call => format!("{} := CALL {}", result(&self.result), arg1(&self.arg1)),
            Opcode::Return => format!("RETURN {}", result(&self.result)),
            Opcode::Arg => format!("ARG {}", result(&self.result)),
            Opcode::Param => format!("PARAM {}", result(&self.result)),
            Opcode::Alloc => format!("DEC {} {}", result(&self.result), self.size),
            _ => {
                let show = |v: &Option<Value>| v.map_or_else(|| "null".to_owned(), |v| v.render(names));
                format!("{:?} {}, {}, {}", self.op, show(&self.arg1), show(&self.arg2), show(&self.result))
            }
        }
    }
}

/// The instruction sequence of a translation unit.
#[derive(Debug, Default)]
pub struct InstrList {
    arena: Vec<Instr>,
    head: Option<InstrId>,
}

impl Index<InstrId> for InstrList {
    type Output = Instr;

    fn index(&self, id: InstrId) -> &Instr {
        &self.arena[id.index()]
    }
}

impl IndexMut<InstrId> for InstrList {
    fn index_mut(&mut self, id: InstrId) -> &mut Instr {
        &mut self.arena[id.index()]
    }
}

impl InstrList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from instructions in order, threading both link
    /// directions.
    #[must_use]
    pub fn from_instrs(instrs: Vec<Instr>) -> Self {
        let mut list = Self { arena: instrs, head: None };
        let len = list.arena.len();
        for index in 0..len {
            let id = u32::try_from(index).expect("instruction arena overflow");
            list.arena[index].prev = (index > 0).then(|| InstrId(id - 1));
            list.arena[index].next = (index + 1 < len).then(|| InstrId(id + 1));
        }
        if len > 0 {
            list.head = Some(InstrId(0));
        }
        list
    }

    #[must_use]
    pub fn head(&self) -> Option<InstrId> {
        self.head
    }

    #[must_use]
    pub fn next(&self, id: InstrId) -> Option<InstrId> {
        self[id].next
    }

    #[must_use]
    pub fn prev(&self, id: InstrId) -> Option<InstrId> {
        self[id].prev
    }

    /// Unlinks an instruction from its neighbors.
    ///
    /// The node keeps its own `prev`/`next` so cursors standing on it can
    /// still advance through the live sequence. Returns whether the node was
    /// live. Detaching an already-detached node is a no-op.
    pub fn detach(&mut self, id: InstrId) -> bool {
        if self[id].detached {
            return false;
        }
        self[id].detached = true;
        let prev = self[id].prev;
        let next = self[id].next;
        match prev {
            Some(p) => self[p].next = next,
            None => {
                if self.head == Some(id) {
                    self.head = next;
                }
            }
        }
        if let Some(n) = next {
            self[n].prev = prev;
        }
        true
    }

    /// Splices a new instruction immediately after `after`, returning its id.
    pub fn insert_after(&mut self, after: InstrId, instr: Instr) -> InstrId {
        let id = InstrId(u32::try_from(self.arena.len()).expect("instruction arena overflow"));
        let mut instr = instr;
        instr.prev = Some(after);
        instr.next = self[after].next;
        instr.detached = false;
        self.arena.push(instr);
        if let Some(n) = self[id].next {
            self[n].prev = Some(id);
        }
        self[after].next = Some(id);
        id
    }

    /// Iterates the live sequence from the head.
    pub fn iter(&self) -> impl Iterator<Item = InstrId> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let id = cursor?;
            cursor = self[id].next;
            Some(id)
        })
    }

    /// Number of live instructions.
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Renders the live sequence, one instruction per line.
    #[must_use]
    pub fn render(&self, names: &NameInterner) -> String {
        let mut out = String::new();
        for id in self.iter() {
            out.push_str(&self[id].render(names));
            out.push('\n');
        }
        out
    }
}
