// File: src/interpreter/control_flow.rs
//
// Control flow signals for loops and early returns.
//
// Executing a statement yields a ControlFlow instead of unwinding with an
// error. Loops consume Break and Continue, calls consume Return; every other
// statement passes an abnormal signal straight up to its caller.

use super::value::Value;

/// Outcome of executing one statement
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ControlFlow {
    /// Fall through to the next statement
    Normal,
    /// `return` with its value (nil when no expression was given)
    Return(Value),
    /// Exit the innermost loop
    Break,
    /// Skip to the next iteration of the innermost loop
    Continue,
}

impl ControlFlow {
    pub(crate) fn is_normal(&self) -> bool {
        matches!(self, ControlFlow::Normal)
    }
}
