//! The semantic analyzer.
//!
//! One traversal over the AST with handlers for external definitions,
//! compound statements, statements, and expressions; every other node just
//! recurses into its children. Errors are collected as [`Diagnostic`]s and
//! never abort the walk, so independent errors in one unit all surface.
//!
//! Scoping: entering a compound statement pushes a fresh scope and leaving
//! pops it. A function definition pushes a scope *before* binding its formal
//! parameters, so formals live outside the body's own scope and a local may
//! shadow a formal without a redefinition error.

use crate::{
    ast::{Ast, AstOp, Primitive, comma_list, cons_list},
    diagnostics::{Diagnostic, ErrorClass},
    symbols::{ExprType, Symbol, SymbolKind, SymbolTable, pop_array_bracket},
};

/// Runs semantic analysis over a translation unit, returning every
/// diagnostic in source order. An empty result means the unit is valid.
#[must_use]
pub fn analyze(ast: &Ast) -> Vec<Diagnostic> {
    let mut analyzer = Analyzer::new();
    analyzer.visit_node(ast);
    analyzer.diagnostics
}

struct Analyzer {
    table: SymbolTable,
    /// The function whose body is being checked; return statements compare
    /// against its declared return type.
    current_function: Option<Symbol>,
    diagnostics: Vec<Diagnostic>,
}

impl Analyzer {
    fn new() -> Self {
        let mut table = SymbolTable::new();
        // The read/write intrinsics are callable in every unit.
        let mut read = Symbol::function("read");
        read.ty = "int".to_owned();
        let mut write = Symbol::function("write");
        write.ty = "int".to_owned();
        write.params.push("int".to_owned());
        table.insert(read).expect("fresh table cannot collide");
        table.insert(write).expect("fresh table cannot collide");
        Self { table, current_function: None, diagnostics: Vec::new() }
    }

    fn report(&mut self, class: ErrorClass, line: i32) {
        self.diagnostics.push(Diagnostic::new(class, line));
    }

    /// Inserts a symbol, reporting the redefinition class for its kind on
    /// collision. Returns whether the insertion took place.
    fn insert_reporting(&mut self, symbol: Symbol, line: i32) -> bool {
        match self.table.insert(symbol) {
            Ok(()) => true,
            Err(class) => {
                self.report(class, line);
                false
            }
        }
    }

    fn visit_node(&mut self, ast: &Ast) {
        match ast.op {
            AstOp::ExtDef => self.visit_ext_def(ast),
            AstOp::CompSt => self.visit_comp_st(ast),
            AstOp::Stmt => self.visit_stmt(ast),
            AstOp::Exp => {
                self.visit_exp(ast);
            }
            _ => self.visit_children(ast),
        }
    }

    fn visit_children(&mut self, ast: &Ast) {
        for child in &ast.children {
            self.visit_node(child);
        }
    }

    fn visit_ext_def(&mut self, ast: &Ast) {
        match ast.children.as_slice() {
            [specifier, dec_list, _semi] if dec_list.op == AstOp::ExtDecList => {
                let ty = self.type_from_specifier(specifier);
                for var_dec in comma_list(dec_list) {
                    let symbol = Self::visit_var_dec(&ty, var_dec);
                    self.insert_reporting(symbol, ast.line);
                }
            }
            [specifier, fun_dec, body] if fun_dec.op == AstOp::FunDec && body.op == AstOp::CompSt => {
                let ty = self.type_from_specifier(specifier);
                self.table.push_scope();
                let mut function = self.visit_fun_dec(fun_dec);
                function.ty = ty;
                self.insert_reporting(function.clone(), ast.line);
                let enclosing = self.current_function.replace(function);
                self.visit_node(body);
                self.current_function = enclosing;
                self.table.pop_scope();
            }
            [specifier, _semi] if specifier.op == AstOp::Specifier => {
                // `struct S { ... };` declares the tag without any variable.
                self.type_from_specifier(specifier);
            }
            _ => self.visit_children(ast),
        }
    }

    /// Resolves a `Specifier` node to a type string, registering struct
    /// definitions it carries.
    fn type_from_specifier(&mut self, specifier: &Ast) -> String {
        if specifier.children.is_empty() {
            return Primitive::from_tag(specifier.val).map_or("unknown", Primitive::name).to_owned();
        }
        let struct_specifier = &specifier.children[0];
        self.visit_struct_specifier(struct_specifier);
        struct_specifier.children[1].text().to_owned()
    }

    fn visit_struct_specifier(&mut self, ast: &Ast) {
        let n = ast.children.len();
        if n >= 4 {
            // STRUCT ID LC [DefList] RC
            let name = ast.children[1].text().to_owned();
            if self.insert_reporting(Symbol::struct_def(name.clone()), ast.line) && n == 5 {
                let members = self.collect_struct_members(&ast.children[3]);
                if let Some(symbol) = self.table.global_mut(&name) {
                    symbol.members = members;
                }
            }
        } else if n == 2 {
            // STRUCT ID: a reference to an already-defined tag.
            if self.table.lookup_global(ast.children[1].text()).is_none() {
                self.report(ErrorClass::UndeclaredStruct, ast.line);
            }
        }
    }

    fn collect_struct_members(&mut self, def_list: &Ast) -> Vec<Symbol> {
        let mut members = Vec::new();
        for def in cons_list(def_list) {
            let ty = self.type_from_specifier(&def.children[0]);
            for dec in comma_list(&def.children[1]) {
                members.push(Self::visit_var_dec(&ty, &dec.children[0]));
            }
        }
        members
    }

    /// Builds a variable symbol from a `VarDec` chain, accumulating array
    /// dimensions onto the type string.
    fn visit_var_dec(ty: &str, ast: &Ast) -> Symbol {
        match ast.children.as_slice() {
            [id] => Symbol::variable(id.text(), ty),
            [inner, _lb, size, _rb] => {
                let mut symbol = Self::visit_var_dec(ty, inner);
                symbol.ty.push_str(&format!("[{}]", size.val));
                symbol
            }
            _ => Symbol::variable("", ty),
        }
    }

    fn visit_param_dec(&mut self, ast: &Ast) -> Symbol {
        let ty = self.type_from_specifier(&ast.children[0]);
        Self::visit_var_dec(&ty, &ast.children[1])
    }

    /// Checks a `FunDec`, binding formals into the current (function) scope,
    /// and returns the function symbol with its parameter type list.
    fn visit_fun_dec(&mut self, ast: &Ast) -> Symbol {
        let mut function = Symbol::function(ast.children[0].text());
        if ast.children.len() == 4 {
            for param_dec in comma_list(&ast.children[2]) {
                let param = self.visit_param_dec(param_dec);
                function.params.push(param.ty.clone());
                self.insert_reporting(param, ast.line);
            }
        }
        function
    }

    fn visit_def_list(&mut self, def_list: &Ast) {
        for def in cons_list(def_list) {
            let ty = self.type_from_specifier(&def.children[0]);
            for dec in comma_list(&def.children[1]) {
                let symbol = Self::visit_var_dec(&ty, &dec.children[0]);
                self.insert_reporting(symbol, def.line);
            }
        }
    }

    fn visit_comp_st(&mut self, ast: &Ast) {
        self.table.push_scope();
        if ast.children.get(1).is_some_and(|c| c.op == AstOp::DefList) {
            self.visit_def_list(&ast.children[1]);
        }
        // The generic walk reaches statement and initializer expressions;
        // definition-list symbols were already inserted above.
        self.visit_children(ast);
        self.table.pop_scope();
    }

    fn visit_stmt(&mut self, ast: &Ast) {
        if ast.children.len() == 3 && ast.children[0].op == AstOp::Return {
            let returned = self.visit_exp(&ast.children[1]);
            let declared =
                ExprType::new(true, self.current_function.as_ref().map_or(String::new(), |f| f.ty.clone()));
            if !self.table.types_compatible(&declared, &returned) {
                self.report(ErrorClass::ReturnTypeMismatch, ast.line);
            }
        } else {
            self.visit_children(ast);
        }
    }

    fn visit_args(&mut self, args: &Ast) -> Vec<ExprType> {
        comma_list(args).into_iter().map(|arg| self.visit_exp(arg)).collect()
    }

    fn visit_exp(&mut self, ast: &Ast) -> ExprType {
        let line = ast.line;
        match ast.children.as_slice() {
            // ID LP Args RP
            [callee, _lp, args, _rp] if callee.op == AstOp::Id => self.check_call(callee, Some(args), line),
            // Exp LB Exp RB
            [array, lb, index, _rb] if lb.op == AstOp::Lb => {
                let array_type = self.visit_exp(array);
                let index_type = self.visit_exp(index);
                let mut ok = true;
                if !array_type.is_array() {
                    self.report(ErrorClass::IndexNonArray, line);
                    ok = false;
                }
                if index_type.ty != "int" {
                    self.report(ErrorClass::NonIntegerIndex, line);
                    ok = false;
                }
                if ok { ExprType::new(true, pop_array_bracket(&array_type.ty)) } else { ExprType::invalid() }
            }
            // Exp ASSIGN Exp
            [left, assign, right] if assign.op == AstOp::Assign => {
                let ltype = self.visit_exp(left);
                let rtype = self.visit_exp(right);
                if !self.table.types_compatible(&ltype, &rtype) {
                    self.report(ErrorClass::AssignmentTypeMismatch, line);
                    ExprType::invalid()
                } else if ltype.valid && rtype.valid && !ltype.l_value {
                    self.report(ErrorClass::AssignToRvalue, line);
                    ExprType::invalid()
                } else {
                    ExprType::new(false, ltype.ty)
                }
            }
            // Exp <binop> Exp
            [left, op, right] if left.op == AstOp::Exp && right.op == AstOp::Exp => {
                let ltype = self.visit_exp(left);
                let rtype = self.visit_exp(right);
                if !self.table.types_compatible(&ltype, &rtype) {
                    self.report(ErrorClass::OperandTypeMismatch, line);
                    return ExprType::invalid();
                }
                if ltype.valid && rtype.valid {
                    match op.op {
                        AstOp::And | AstOp::Or => {
                            if !ltype.is_int() || !rtype.is_int() {
                                self.report(ErrorClass::NonIntegralBoolean, line);
                            }
                        }
                        AstOp::Plus | AstOp::Minus | AstOp::Mul | AstOp::Div => {
                            if !ltype.is_numeric() || !rtype.is_numeric() {
                                self.report(ErrorClass::NonNumericArithmetic, line);
                            }
                        }
                        _ => {
                            if ltype.is_char() || rtype.is_char() {
                                self.report(ErrorClass::CharInBinaryOp, line);
                            }
                        }
                    }
                }
                ExprType::new(false, ltype.ty)
            }
            // Exp DOT ID
            [object, dot, field] if dot.op == AstOp::Dot => {
                let ltype = self.visit_exp(object);
                let field_name = field.text();
                match self.table.lookup_global(&ltype.ty).cloned() {
                    Some(symbol) if symbol.kind == SymbolKind::StructDef => {
                        match symbol.members.iter().find(|m| m.name == field_name) {
                            Some(member) => ExprType::new(true, member.ty.clone()),
                            None => {
                                self.report(ErrorClass::UndeclaredMember, line);
                                ExprType::invalid()
                            }
                        }
                    }
                    _ => {
                        if ltype.valid {
                            self.report(ErrorClass::MemberOfNonStruct, line);
                        }
                        ExprType::invalid()
                    }
                }
            }
            // ID LP RP
            [callee, lp, _rp] if callee.op == AstOp::Id && lp.op == AstOp::Lp => self.check_call(callee, None, line),
            // LP Exp RP
            [lp, inner, _rp] if lp.op == AstOp::Lp => self.visit_exp(inner),
            // MINUS Exp | NOT Exp
            [sign, operand] => {
                let mut operand_type = self.visit_exp(operand);
                if operand_type.valid {
                    match sign.op {
                        AstOp::Not => {
                            if !operand_type.is_int() {
                                self.report(ErrorClass::NonIntegralBoolean, line);
                            }
                        }
                        AstOp::Minus => {
                            if !operand_type.is_numeric() {
                                self.report(ErrorClass::NonNumericArithmetic, line);
                            }
                        }
                        _ => {}
                    }
                }
                operand_type.l_value = false;
                operand_type
            }
            [leaf] => match leaf.op {
                AstOp::Id => {
                    let name = leaf.text();
                    if let Some(symbol) = self.table.lookup(name) {
                        ExprType::new(true, symbol.ty.clone())
                    } else {
                        self.report(ErrorClass::UndeclaredVariable, line);
                        ExprType::invalid()
                    }
                }
                AstOp::IntLit => ExprType::new(false, "int"),
                AstOp::FloatLit => ExprType::new(false, "float"),
                AstOp::CharLit => ExprType::new(false, "char"),
                _ => ExprType::invalid(),
            },
            _ => {
                self.visit_children(ast);
                ExprType::invalid()
            }
        }
    }

    /// Checks a call expression: the callee must be a globally-declared
    /// function and the actual argument types must match the declared
    /// parameter types positionally.
    fn check_call(&mut self, callee: &Ast, args: Option<&Ast>, line: i32) -> ExprType {
        let name = callee.text();
        let Some(symbol) = self.table.lookup_global(name).cloned() else {
            self.report(ErrorClass::UndeclaredFunction, line);
            return ExprType::invalid();
        };
        if symbol.kind != SymbolKind::Function {
            self.report(ErrorClass::CallNonFunction, line);
            return ExprType::invalid();
        }
        let matches = match args {
            Some(args) => {
                let arg_types = self.visit_args(args);
                arg_types.len() == symbol.params.len()
                    && arg_types
                        .iter()
                        .zip(&symbol.params)
                        .all(|(arg, param)| self.table.types_compatible(arg, &ExprType::new(false, param.clone())))
            }
            None => symbol.params.is_empty(),
        };
        if matches {
            ExprType::new(false, symbol.ty)
        } else {
            self.report(ErrorClass::ArgumentMismatch, line);
            ExprType::invalid()
        }
    }
}
