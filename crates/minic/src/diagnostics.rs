//! Numbered semantic error classes and their rendering.
//!
//! Semantic errors never abort analysis: the analyzer records a
//! [`Diagnostic`] and keeps going so independent errors in the same unit all
//! surface. Each diagnostic renders as one line,
//! `Error type N at Line L: <message>`.

use std::fmt;

/// The numbered semantic error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Use of an undeclared variable.
    UndeclaredVariable = 1,
    /// Invocation of an undeclared function.
    UndeclaredFunction = 2,
    /// Variable redefined in the same scope.
    VariableRedefined = 3,
    /// Function redefined at global scope.
    FunctionRedefined = 4,
    /// Type mismatch across an assignment.
    AssignmentTypeMismatch = 5,
    /// R-value on the left of an assignment.
    AssignToRvalue = 6,
    /// Operand-type mismatch across a binary operator.
    OperandTypeMismatch = 7,
    /// Return value type mismatches the function's declared return type.
    ReturnTypeMismatch = 8,
    /// Call argument list mismatches the declared parameters.
    ArgumentMismatch = 9,
    /// Indexing a non-array.
    IndexNonArray = 10,
    /// Call operator applied to a non-function name.
    CallNonFunction = 11,
    /// Indexing by a non-integer.
    NonIntegerIndex = 12,
    /// Field access on a non-struct.
    MemberOfNonStruct = 13,
    /// Access of an undeclared struct field.
    UndeclaredMember = 14,
    /// Struct redefined.
    StructRedefined = 15,
    /// Use of an undeclared struct.
    UndeclaredStruct = 16,
    /// Non-integral operand to a boolean operator.
    NonIntegralBoolean = 17,
    /// Non-numeric operand to an arithmetic operator.
    NonNumericArithmetic = 18,
    /// `char` participating in a binary comparison.
    CharInBinaryOp = 19,
}

impl ErrorClass {
    /// The numeric class printed in the diagnostic line.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The fixed message for this class.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::UndeclaredVariable => "variable is used without definition",
            Self::UndeclaredFunction => "function is invoked without definition",
            Self::VariableRedefined => "variable is redefined in the same scope",
            Self::FunctionRedefined => "function is redefined in the global scope",
            Self::AssignmentTypeMismatch => "unmatching types on both sides of assignment",
            Self::AssignToRvalue => "rvalue on the left side of assignment",
            Self::OperandTypeMismatch => "unmatching operands on both sides of operator",
            Self::ReturnTypeMismatch => "function return type mismatch the declared type",
            Self::ArgumentMismatch => "function's arguments mismatch the declared arguments",
            Self::IndexNonArray => "indexing on non-array",
            Self::CallNonFunction => "invoking function operator on non-function names",
            Self::NonIntegerIndex => "indexing by non-integer",
            Self::MemberOfNonStruct => "accessing member of non-struct variables",
            Self::UndeclaredMember => "accessing an undefined struct member",
            Self::StructRedefined => "struct is redefined in the global scope",
            Self::UndeclaredStruct => "struct is used without definition",
            Self::NonIntegralBoolean => "non-integral boolean operation",
            Self::NonNumericArithmetic => "non-numeral arithmetic operation",
            Self::CharInBinaryOp => "char in binary operation",
        }
    }
}

/// One reported semantic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    pub class: ErrorClass,
    pub line: i32,
}

impl Diagnostic {
    #[must_use]
    pub fn new(class: ErrorClass, line: i32) -> Self {
        Self { class, line }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error type {} at Line {}: {}", self.class.code(), self.line, self.class.message())
    }
}

/// All diagnostics reported for one translation unit, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.0 {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_line_format() {
        let d = Diagnostic::new(ErrorClass::UndeclaredVariable, 7);
        assert_eq!(d.to_string(), "Error type 1 at Line 7: variable is used without definition");
    }

    #[test]
    fn class_codes_are_the_documented_numbers() {
        assert_eq!(ErrorClass::UndeclaredVariable.code(), 1);
        assert_eq!(ErrorClass::ArgumentMismatch.code(), 9);
        assert_eq!(ErrorClass::CharInBinaryOp.code(), 19);
    }
}
