//! Symbols, the scoped symbol table, and the type-string machinery.
//!
//! Types are encoded canonically as strings: `"int"`, `"float"`, `"char"`,
//! arrays as `T[N]` with the outermost dimension leftmost (`int[10][20]` is
//! `int[10][20]`), and record types by their struct tag name. Equivalence is
//! string equality except for struct tags, which compare structurally.

use ahash::{AHashMap, AHashSet};

use crate::diagnostics::ErrorClass;

/// What kind of entity a [`Symbol`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    StructDef,
    Function,
}

/// One named entity: a variable, a struct definition, or a function.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    /// Canonical type string: the variable's type, the function's return
    /// type, or empty for struct definitions.
    pub ty: String,
    /// Declared parameter type strings, in source order. Functions only.
    pub params: Vec<String>,
    /// Member symbols, in source order. Struct definitions only.
    pub members: Vec<Symbol>,
}

impl Symbol {
    #[must_use]
    pub fn variable(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self { kind: SymbolKind::Variable, name: name.into(), ty: ty.into(), params: Vec::new(), members: Vec::new() }
    }

    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self { kind: SymbolKind::Function, name: name.into(), ty: String::new(), params: Vec::new(), members: Vec::new() }
    }

    #[must_use]
    pub fn struct_def(name: impl Into<String>) -> Self {
        Self { kind: SymbolKind::StructDef, name: name.into(), ty: String::new(), params: Vec::new(), members: Vec::new() }
    }
}

/// The type an expression was checked to have.
///
/// An invalid `ExprType` (produced wherever checking already failed) compares
/// compatible with everything so one failure does not cascade into further
/// diagnostics on the same expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprType {
    pub l_value: bool,
    pub ty: String,
    pub valid: bool,
}

impl ExprType {
    /// An expression type; empty type text means invalid.
    #[must_use]
    pub fn new(l_value: bool, ty: impl Into<String>) -> Self {
        let ty = ty.into();
        let valid = !ty.is_empty();
        Self { l_value, ty, valid }
    }

    /// The poisoned type produced by failed checks.
    #[must_use]
    pub fn invalid() -> Self {
        Self::new(false, "")
    }

    #[must_use]
    pub fn is_int(&self) -> bool {
        self.ty == "int"
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.ty == "int" || self.ty == "float"
    }

    #[must_use]
    pub fn is_char(&self) -> bool {
        self.ty == "char"
    }

    /// True when the type string encodes an array.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.ty.contains('[')
    }
}

/// Strips one level of array nesting from a type string.
///
/// Removes the leftmost `[N]`, which encodes the outermost dimension:
/// `int[10][20]` becomes `int[20]`. Non-array strings pass through.
#[must_use]
pub fn pop_array_bracket(ty: &str) -> String {
    match (ty.find('['), ty.find(']')) {
        (Some(begin), Some(end)) if begin < end => {
            let mut out = String::with_capacity(ty.len());
            out.push_str(&ty[..begin]);
            out.push_str(&ty[end + 1..]);
            out
        }
        _ => ty.to_owned(),
    }
}

/// Ordered stack of name-to-symbol maps. Index 0 is the global namespace,
/// shared by global variables, functions, and struct definitions.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<AHashMap<String, Symbol>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Creates a table holding only the global scope.
    #[must_use]
    pub fn new() -> Self {
        Self { scopes: vec![AHashMap::new()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(AHashMap::new());
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "attempted to pop the global scope");
        self.scopes.pop();
    }

    /// Looks a name up through every scope, innermost first.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Looks a name up in the global namespace only. Function and
    /// struct-definition resolution always goes through here.
    #[must_use]
    pub fn lookup_global(&self, name: &str) -> Option<&Symbol> {
        self.scopes[0].get(name)
    }

    /// Mutable access to a global entry, for attaching struct members after
    /// the definition symbol has been inserted.
    pub fn global_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.scopes[0].get_mut(name)
    }

    /// Inserts a symbol: variables into the current innermost scope,
    /// functions and struct definitions into the global namespace.
    ///
    /// Redefinition at the target scope yields the error class for the
    /// inserted symbol's kind (3, 4, or 15).
    pub fn insert(&mut self, symbol: Symbol) -> Result<(), ErrorClass> {
        let class = match symbol.kind {
            SymbolKind::Variable => ErrorClass::VariableRedefined,
            SymbolKind::Function => ErrorClass::FunctionRedefined,
            SymbolKind::StructDef => ErrorClass::StructRedefined,
        };
        let scope = match symbol.kind {
            SymbolKind::Variable => self.scopes.last_mut().expect("scope stack is never empty"),
            SymbolKind::Function | SymbolKind::StructDef => &mut self.scopes[0],
        };
        if scope.contains_key(&symbol.name) {
            return Err(class);
        }
        scope.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Whether two checked expression types are compatible.
    ///
    /// Invalid types are compatible with everything; equal type strings are
    /// compatible; otherwise both must name struct definitions that are
    /// structurally equivalent.
    #[must_use]
    pub fn types_compatible(&self, a: &ExprType, b: &ExprType) -> bool {
        let mut in_progress = AHashSet::new();
        self.compatible_inner(a, b, &mut in_progress)
    }

    fn compatible_inner(&self, a: &ExprType, b: &ExprType, in_progress: &mut AHashSet<(String, String)>) -> bool {
        if !a.valid || !b.valid {
            return true;
        }
        if a.ty == b.ty {
            return true;
        }
        let (Some(sa), Some(sb)) = (self.lookup_global(&a.ty), self.lookup_global(&b.ty)) else {
            return false;
        };
        if sa.kind != SymbolKind::StructDef || sb.kind != SymbolKind::StructDef {
            return false;
        }
        self.struct_equivalent(sa, sb, in_progress)
    }

    /// Structural equivalence of two struct definitions: the same number of
    /// members, pairwise recursively equivalent as r-value types; member
    /// names are ignored.
    ///
    /// An in-progress pair set makes the recursion coinductive: a pair
    /// already under comparison reads as equivalent, so mutually recursive
    /// record types terminate.
    fn struct_equivalent(&self, a: &Symbol, b: &Symbol, in_progress: &mut AHashSet<(String, String)>) -> bool {
        if a.members.len() != b.members.len() {
            return false;
        }
        if !in_progress.insert((a.name.clone(), b.name.clone())) {
            return true;
        }
        a.members.iter().zip(&b.members).all(|(x, y)| {
            let xt = ExprType::new(false, x.ty.clone());
            let yt = ExprType::new(false, y.ty.clone());
            self.compatible_inner(&xt, &yt, in_progress)
        })
    }
}
