#![doc = include_str!("../../../README.md")]

pub mod ast;
mod compile;
pub mod diagnostics;
pub mod intern;
pub mod ir;
pub mod semantic;
pub mod symbols;

pub use crate::{
    ast::{Ast, AstOp, Primitive},
    compile::{ModuleIr, compile, compile_with_limits},
    diagnostics::{Diagnostic, Diagnostics, ErrorClass},
    intern::{NameId, NameInterner},
    ir::{
        Instr, InstrId, InstrList, IrGen, Opcode, PassLimits, Relop, Value, ValueAllocator, inline_functions, optimize,
    },
    semantic::analyze,
    symbols::{ExprType, Symbol, SymbolKind, SymbolTable},
};
