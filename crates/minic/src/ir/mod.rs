//! The linear three-address intermediate representation.
//!
//! [`value::Value`] describes operands, [`code::InstrList`] holds the
//! doubly-linked instruction sequence, [`lower`] translates a validated AST
//! into it, and [`opt`]/[`inline`] rewrite it in place.

pub mod code;
pub mod inline;
pub mod lower;
pub mod opt;
pub mod value;

pub use code::{Instr, InstrId, InstrList, Opcode, Relop};
pub use inline::inline_functions;
pub use lower::IrGen;
pub use opt::{PassLimits, optimize};
pub use value::{Value, ValueAllocator};
