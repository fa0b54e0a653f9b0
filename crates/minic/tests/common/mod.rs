//! AST construction helpers shared by the integration tests.
//!
//! These build the same tree shapes an external parser would hand the
//! middle-end, one helper per grammar production.
#![allow(dead_code)]

use minic::{Ast, AstOp, Primitive};

pub fn exp(children: Vec<Ast>, line: i32) -> Ast {
    let mut e = Ast::new(AstOp::Exp, line);
    e.children = children;
    e
}

pub fn e_id(name: &str, line: i32) -> Ast {
    exp(vec![Ast::id(name, line)], line)
}

pub fn e_int(value: i32, line: i32) -> Ast {
    exp(vec![Ast::int(value, line)], line)
}

pub fn e_float(text: &str, line: i32) -> Ast {
    exp(vec![Ast::float_lit(text, line)], line)
}

pub fn e_char(text: &str, line: i32) -> Ast {
    exp(vec![Ast::char_lit(text, line)], line)
}

pub fn e_bin(left: Ast, op: AstOp, right: Ast, line: i32) -> Ast {
    exp(vec![left, Ast::sign(op), right], line)
}

pub fn e_assign(left: Ast, right: Ast, line: i32) -> Ast {
    exp(vec![left, Ast::sign(AstOp::Assign), right], line)
}

pub fn e_neg(operand: Ast, line: i32) -> Ast {
    exp(vec![Ast::sign(AstOp::Minus), operand], line)
}

pub fn e_not(operand: Ast, line: i32) -> Ast {
    exp(vec![Ast::sign(AstOp::Not), operand], line)
}

pub fn e_paren(inner: Ast, line: i32) -> Ast {
    exp(vec![Ast::sign(AstOp::Lp), inner, Ast::sign(AstOp::Rp)], line)
}

pub fn e_index(base: Ast, index: Ast, line: i32) -> Ast {
    exp(vec![base, Ast::sign(AstOp::Lb), index, Ast::sign(AstOp::Rb)], line)
}

pub fn e_dot(object: Ast, field: &str, line: i32) -> Ast {
    exp(vec![object, Ast::sign(AstOp::Dot), Ast::id(field, line)], line)
}

pub fn args(items: Vec<Ast>, line: i32) -> Ast {
    let mut list = None;
    for item in items.into_iter().rev() {
        list = Some(match list {
            None => Ast::new(AstOp::Args, line).child(item),
            Some(rest) => Ast::new(AstOp::Args, line).child(item).child(Ast::sign(AstOp::Comma)).child(rest),
        });
    }
    list.expect("argument list must not be empty")
}

pub fn e_call(name: &str, arguments: Vec<Ast>, line: i32) -> Ast {
    if arguments.is_empty() {
        exp(vec![Ast::id(name, line), Ast::sign(AstOp::Lp), Ast::sign(AstOp::Rp)], line)
    } else {
        exp(vec![Ast::id(name, line), Ast::sign(AstOp::Lp), args(arguments, line), Ast::sign(AstOp::Rp)], line)
    }
}

pub fn var_dec(name: &str, line: i32) -> Ast {
    Ast::new(AstOp::VarDec, line).child(Ast::id(name, line))
}

pub fn var_dec_array(name: &str, dims: &[i32], line: i32) -> Ast {
    let mut node = var_dec(name, line);
    for &dim in dims {
        node = Ast::new(AstOp::VarDec, line)
            .child(node)
            .child(Ast::sign(AstOp::Lb))
            .child(Ast::int(dim, line))
            .child(Ast::sign(AstOp::Rb));
    }
    node
}

pub fn dec(declarator: Ast, line: i32) -> Ast {
    Ast::new(AstOp::Dec, line).child(declarator)
}

pub fn dec_init(declarator: Ast, init: Ast, line: i32) -> Ast {
    Ast::new(AstOp::Dec, line).child(declarator).child(Ast::sign(AstOp::Assign)).child(init)
}

pub fn dec_list(decs: Vec<Ast>, line: i32) -> Ast {
    let mut list = None;
    for item in decs.into_iter().rev() {
        list = Some(match list {
            None => Ast::new(AstOp::DecList, line).child(item),
            Some(rest) => Ast::new(AstOp::DecList, line).child(item).child(Ast::sign(AstOp::Comma)).child(rest),
        });
    }
    list.expect("declarator list must not be empty")
}

pub fn spec(primitive: Primitive, line: i32) -> Ast {
    Ast::specifier(primitive, line)
}

/// `struct Tag { defs }` as a specifier.
pub fn spec_struct_def(tag: &str, defs: Vec<Ast>, line: i32) -> Ast {
    let struct_specifier = Ast::new(AstOp::StructSpecifier, line)
        .child(Ast::sign(AstOp::Struct))
        .child(Ast::id(tag, line))
        .child(Ast::sign(AstOp::Lc))
        .child(def_list(defs, line))
        .child(Ast::sign(AstOp::Rc));
    Ast::new(AstOp::Specifier, line).child(struct_specifier)
}

/// `struct Tag` as a specifier referring to an existing definition.
pub fn spec_struct_ref(tag: &str, line: i32) -> Ast {
    let struct_specifier =
        Ast::new(AstOp::StructSpecifier, line).child(Ast::sign(AstOp::Struct)).child(Ast::id(tag, line));
    Ast::new(AstOp::Specifier, line).child(struct_specifier)
}

pub fn def(specifier: Ast, decs: Vec<Ast>, line: i32) -> Ast {
    Ast::new(AstOp::Def, line).child(specifier).child(dec_list(decs, line)).child(Ast::sign(AstOp::Semi))
}

pub fn def_scalar(primitive: Primitive, name: &str, line: i32) -> Ast {
    def(spec(primitive, line), vec![dec(var_dec(name, line), line)], line)
}

pub fn def_list(defs: Vec<Ast>, line: i32) -> Ast {
    let mut list = Ast::new(AstOp::DefList, line);
    for item in defs.into_iter().rev() {
        list = Ast::new(AstOp::DefList, line).child(item).child(list);
    }
    list
}

pub fn stmt_list(stmts: Vec<Ast>, line: i32) -> Ast {
    let mut list = Ast::new(AstOp::StmtList, line);
    for item in stmts.into_iter().rev() {
        list = Ast::new(AstOp::StmtList, line).child(item).child(list);
    }
    list
}

pub fn stmt_exp(e: Ast, line: i32) -> Ast {
    Ast::new(AstOp::Stmt, line).child(e).child(Ast::sign(AstOp::Semi))
}

pub fn stmt_return(e: Ast, line: i32) -> Ast {
    Ast::new(AstOp::Stmt, line).child(Ast::sign(AstOp::Return)).child(e).child(Ast::sign(AstOp::Semi))
}

pub fn stmt_if(cond: Ast, then: Ast, line: i32) -> Ast {
    Ast::new(AstOp::Stmt, line)
        .child(Ast::sign(AstOp::If))
        .child(Ast::sign(AstOp::Lp))
        .child(cond)
        .child(Ast::sign(AstOp::Rp))
        .child(then)
}

pub fn stmt_if_else(cond: Ast, then: Ast, otherwise: Ast, line: i32) -> Ast {
    stmt_if(cond, then, line).child(Ast::sign(AstOp::Else)).child(otherwise)
}

pub fn stmt_while(cond: Ast, body: Ast, line: i32) -> Ast {
    Ast::new(AstOp::Stmt, line)
        .child(Ast::sign(AstOp::While))
        .child(Ast::sign(AstOp::Lp))
        .child(cond)
        .child(Ast::sign(AstOp::Rp))
        .child(body)
}

pub fn stmt_do_while(body: Ast, cond: Ast, line: i32) -> Ast {
    Ast::new(AstOp::Stmt, line)
        .child(Ast::sign(AstOp::Do))
        .child(body)
        .child(Ast::sign(AstOp::While))
        .child(Ast::sign(AstOp::Lp))
        .child(cond)
        .child(Ast::sign(AstOp::Rp))
        .child(Ast::sign(AstOp::Semi))
}

/// Absent `for` clauses are NOP placeholder nodes.
pub fn stmt_for(init: Option<Ast>, cond: Option<Ast>, step: Option<Ast>, body: Ast, line: i32) -> Ast {
    let clause = |c: Option<Ast>| c.unwrap_or_else(|| Ast::sign(AstOp::Nop));
    Ast::new(AstOp::Stmt, line)
        .child(Ast::sign(AstOp::For))
        .child(Ast::sign(AstOp::Lp))
        .child(clause(init))
        .child(Ast::sign(AstOp::Semi))
        .child(clause(cond))
        .child(Ast::sign(AstOp::Semi))
        .child(clause(step))
        .child(Ast::sign(AstOp::Rp))
        .child(body)
}

pub fn stmt_break(line: i32) -> Ast {
    Ast::new(AstOp::Stmt, line).child(Ast::sign(AstOp::Break)).child(Ast::sign(AstOp::Semi))
}

pub fn stmt_continue(line: i32) -> Ast {
    Ast::new(AstOp::Stmt, line).child(Ast::sign(AstOp::Continue)).child(Ast::sign(AstOp::Semi))
}

pub fn comp_st(defs: Vec<Ast>, stmts: Vec<Ast>, line: i32) -> Ast {
    Ast::new(AstOp::CompSt, line)
        .child(Ast::sign(AstOp::Lc))
        .child(def_list(defs, line))
        .child(stmt_list(stmts, line))
        .child(Ast::sign(AstOp::Rc))
}

pub fn stmt_block(defs: Vec<Ast>, stmts: Vec<Ast>, line: i32) -> Ast {
    Ast::new(AstOp::Stmt, line).child(comp_st(defs, stmts, line))
}

pub fn param_dec(specifier: Ast, declarator: Ast, line: i32) -> Ast {
    Ast::new(AstOp::ParamDec, line).child(specifier).child(declarator)
}

pub fn var_list(params: Vec<Ast>, line: i32) -> Ast {
    let mut list = None;
    for item in params.into_iter().rev() {
        list = Some(match list {
            None => Ast::new(AstOp::VarList, line).child(item),
            Some(rest) => Ast::new(AstOp::VarList, line).child(item).child(Ast::sign(AstOp::Comma)).child(rest),
        });
    }
    list.expect("parameter list must not be empty")
}

/// `ret name(params) body` as an external definition.
pub fn function(ret: Primitive, name: &str, params: Vec<Ast>, body: Ast, line: i32) -> Ast {
    let mut fun_dec = Ast::new(AstOp::FunDec, line).child(Ast::id(name, line)).child(Ast::sign(AstOp::Lp));
    if !params.is_empty() {
        fun_dec = fun_dec.child(var_list(params, line));
    }
    fun_dec = fun_dec.child(Ast::sign(AstOp::Rp));
    Ast::new(AstOp::ExtDef, line).child(spec(ret, line)).child(fun_dec).child(body)
}

/// `specifier declarators ;` at the top level.
pub fn global_vars(specifier: Ast, declarators: Vec<Ast>, line: i32) -> Ast {
    let mut list = None;
    for item in declarators.into_iter().rev() {
        list = Some(match list {
            None => Ast::new(AstOp::ExtDecList, line).child(item),
            Some(rest) => Ast::new(AstOp::ExtDecList, line).child(item).child(Ast::sign(AstOp::Comma)).child(rest),
        });
    }
    Ast::new(AstOp::ExtDef, line)
        .child(specifier)
        .child(list.expect("declarator list must not be empty"))
        .child(Ast::sign(AstOp::Semi))
}

pub fn program(ext_defs: Vec<Ast>) -> Ast {
    let mut list = Ast::new(AstOp::ExtDefList, 0);
    for item in ext_defs.into_iter().rev() {
        list = Ast::new(AstOp::ExtDefList, 0).child(item).child(list);
    }
    Ast::new(AstOp::Program, 0).child(list)
}
