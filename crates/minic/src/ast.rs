//! The abstract syntax tree consumed by the middle-end.
//!
//! The tree is produced by an external lexer/parser; this module defines the
//! node shape, the closed operator-tag enumeration, and the builder functions
//! the parser calls. Nodes are plain owned values: each node owns its
//! children, and the driver owns the root.

use strum::IntoStaticStr;

/// Operator tag of an AST node: one variant per production or terminal of the
/// source grammar.
///
/// The `strum` names are the grammar spellings (`Exp`, `ID`, `INT`, `LB`, …)
/// and are what [`Ast::shape_key`] concatenates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum AstOp {
    Program,
    ExtDefList,
    ExtDef,
    ExtDecList,
    Specifier,
    StructSpecifier,
    VarDec,
    FunDec,
    VarList,
    ParamDec,
    CompSt,
    StmtList,
    Stmt,
    DefList,
    Def,
    DecList,
    Dec,
    Exp,
    Args,
    #[strum(serialize = "ID")]
    Id,
    #[strum(serialize = "STRUCT")]
    Struct,
    #[strum(serialize = "INT")]
    IntLit,
    #[strum(serialize = "FLOAT")]
    FloatLit,
    #[strum(serialize = "CHAR")]
    CharLit,
    #[strum(serialize = "IF")]
    If,
    #[strum(serialize = "ELSE")]
    Else,
    #[strum(serialize = "DO")]
    Do,
    #[strum(serialize = "WHILE")]
    While,
    #[strum(serialize = "FOR")]
    For,
    #[strum(serialize = "CONTINUE")]
    Continue,
    #[strum(serialize = "BREAK")]
    Break,
    #[strum(serialize = "RETURN")]
    Return,
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
    #[strum(serialize = "NOT")]
    Not,
    #[strum(serialize = "PLUS")]
    Plus,
    #[strum(serialize = "MINUS")]
    Minus,
    #[strum(serialize = "MUL")]
    Mul,
    #[strum(serialize = "DIV")]
    Div,
    #[strum(serialize = "ASSIGN")]
    Assign,
    #[strum(serialize = "LT")]
    Lt,
    #[strum(serialize = "LE")]
    Le,
    #[strum(serialize = "GT")]
    Gt,
    #[strum(serialize = "GE")]
    Ge,
    #[strum(serialize = "NE")]
    Ne,
    #[strum(serialize = "EQ")]
    Eq,
    #[strum(serialize = "LP")]
    Lp,
    #[strum(serialize = "RP")]
    Rp,
    #[strum(serialize = "LB")]
    Lb,
    #[strum(serialize = "RB")]
    Rb,
    #[strum(serialize = "LC")]
    Lc,
    #[strum(serialize = "RC")]
    Rc,
    #[strum(serialize = "DOT")]
    Dot,
    #[strum(serialize = "SEMI")]
    Semi,
    #[strum(serialize = "COMMA")]
    Comma,
    #[strum(serialize = "NOP")]
    Nop,
}

impl AstOp {
    /// Grammar spelling of the tag.
    #[must_use]
    pub fn grammar_name(self) -> &'static str {
        self.into()
    }

    /// True for the six relational operator terminals.
    #[must_use]
    pub fn is_relational(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Ne | Self::Eq)
    }
}

/// Primitive type payload of a `Specifier` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Int = 0,
    Float = 1,
    Char = 2,
}

impl Primitive {
    /// Decodes the integer payload stored on a `Specifier` node.
    #[must_use]
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::Int),
            1 => Some(Self::Float),
            2 => Some(Self::Char),
            _ => None,
        }
    }

    /// Canonical type-string spelling.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Char => "char",
        }
    }
}

/// One AST node.
///
/// `val` carries the integer-literal payload (and the [`Primitive`] tag on
/// `Specifier` nodes); `text` carries identifier text or the literal text of
/// float/char constants.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub line: i32,
    pub op: AstOp,
    pub val: i32,
    pub text: Option<String>,
    pub children: Vec<Ast>,
}

impl Ast {
    /// Creates a node with the given tag and source line.
    #[must_use]
    pub fn new(op: AstOp, line: i32) -> Self {
        Self { line, op, val: 0, text: None, children: Vec::new() }
    }

    /// Creates a bare terminal (punctuation or keyword sign) with no location.
    #[must_use]
    pub fn sign(op: AstOp) -> Self {
        Self::new(op, 0)
    }

    /// Creates an identifier terminal.
    #[must_use]
    pub fn id(name: impl Into<String>, line: i32) -> Self {
        let mut ast = Self::new(AstOp::Id, line);
        ast.text = Some(name.into());
        ast
    }

    /// Creates an integer-literal terminal.
    #[must_use]
    pub fn int(val: i32, line: i32) -> Self {
        let mut ast = Self::new(AstOp::IntLit, line);
        ast.val = val;
        ast
    }

    /// Creates a float-literal terminal (the literal text is kept verbatim).
    #[must_use]
    pub fn float_lit(text: impl Into<String>, line: i32) -> Self {
        let mut ast = Self::new(AstOp::FloatLit, line);
        ast.text = Some(text.into());
        ast
    }

    /// Creates a char-literal terminal (the literal text is kept verbatim).
    #[must_use]
    pub fn char_lit(text: impl Into<String>, line: i32) -> Self {
        let mut ast = Self::new(AstOp::CharLit, line);
        ast.text = Some(text.into());
        ast
    }

    /// Creates a `Specifier` node naming a primitive type.
    #[must_use]
    pub fn specifier(primitive: Primitive, line: i32) -> Self {
        let mut ast = Self::new(AstOp::Specifier, line);
        ast.val = primitive as i32;
        ast
    }

    /// Appends a child and returns the parent.
    #[must_use]
    pub fn child(mut self, node: Self) -> Self {
        self.children.push(node);
        self
    }

    /// Appends a child if present and returns the parent.
    #[must_use]
    pub fn child_opt(self, node: Option<Self>) -> Self {
        match node {
            Some(node) => self.child(node),
            None => self,
        }
    }

    /// Identifier/literal text of this node.
    ///
    /// # Panics
    ///
    /// Panics if the node carries no text payload; callers only invoke this
    /// on terminals the grammar guarantees to carry text.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_else(|| panic!("{} node has no text payload", self.op.grammar_name()))
    }

    /// Textual shape of this node: the node's tag followed by its children's
    /// tags, e.g. `Exp_ExpLBExpRB` for an array index expression.
    #[must_use]
    pub fn shape_key(&self) -> String {
        let mut key = String::from(self.op.grammar_name());
        key.push('_');
        for c in &self.children {
            key.push_str(c.op.grammar_name());
        }
        key
    }
}

/// Flattens a comma-chained list node into source order.
///
/// Grammar lists like `Args -> Exp | Exp COMMA Args` are encoded as right
/// recursion; this returns the item nodes (`children[0]` of each link) in
/// source order.
pub(crate) fn comma_list(node: &Ast) -> Vec<&Ast> {
    let mut items = Vec::new();
    let mut cur = node;
    loop {
        match cur.children.as_slice() {
            [item] => {
                items.push(item);
                return items;
            }
            [item, _comma, rest] => {
                items.push(item);
                cur = rest;
            }
            _ => return items,
        }
    }
}

/// Flattens a cons-shaped list node (`List -> Item List | empty`) into source
/// order. Empty list nodes (no children) terminate the walk.
pub(crate) fn cons_list(node: &Ast) -> Vec<&Ast> {
    let mut items = Vec::new();
    let mut cur = node;
    while let [item, rest @ ..] = cur.children.as_slice() {
        items.push(item);
        match rest {
            [next] => cur = next,
            _ => break,
        }
    }
    items
}
