//! The full middle-end pipeline: analyze, lower, inline, optimize.

use std::fmt;

use crate::{
    ast::Ast,
    diagnostics::Diagnostics,
    intern::NameInterner,
    ir::{InstrList, IrGen, PassLimits, inline_functions, optimize},
    semantic,
};

/// The optimized IR of one translation unit.
///
/// `Display` renders the instruction sequence one per line in the canonical
/// text format.
#[derive(Debug)]
pub struct ModuleIr {
    pub code: InstrList,
    pub names: NameInterner,
}

impl fmt::Display for ModuleIr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code.render(&self.names))
    }
}

/// Compiles a translation unit with default pass limits.
///
/// Semantic diagnostics gate lowering: a unit with any error returns them
/// all and produces no IR. Drivers should map `Err` to a nonzero exit
/// status.
pub fn compile(ast: &Ast) -> Result<ModuleIr, Diagnostics> {
    compile_with_limits(ast, &PassLimits::default())
}

/// [`compile`] with explicit optimizer/inliner bounds.
pub fn compile_with_limits(ast: &Ast, limits: &PassLimits) -> Result<ModuleIr, Diagnostics> {
    let diagnostics = semantic::analyze(ast);
    if !diagnostics.is_empty() {
        return Err(Diagnostics(diagnostics));
    }
    let mut lowering = IrGen::new();
    let mut code = lowering.translate(ast);
    let (names, mut alloc) = lowering.finish();
    inline_functions(&mut code, &mut alloc, limits);
    optimize(&mut code, limits);
    Ok(ModuleIr { code, names })
}
