// File: src/interpreter/value.rs
//
// Runtime value types for the loxwalk language.
// The dynamic value domain is nil, booleans, double-precision numbers,
// strings and callables (user closures and built-in natives).

use super::environment::Environment;
use crate::ast::Lambda;
use crate::lexer::Token;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A closure: the declaration plus the exact frame that was active when it
/// was evaluated. Every call runs in a fresh child of `closure`.
pub struct Function {
    pub name: Option<Token>,
    pub declaration: Rc<Lambda>,
    pub closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }
}

impl fmt::Debug for Function {
    // The captured frame may contain this very function; never print it.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Function({}/{})", name.lexeme, self.arity()),
            None => write!(f, "Lambda({})", self.arity()),
        }
    }
}

/// A built-in callable, dispatched by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
}

impl Value {
    /// nil and false are falsey; everything else (including 0 and "") is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

/// Language equality: defined across all types, nil equal only to nil,
/// callables equal only to themselves.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Function(function) => match &function.name {
                Some(name) => write!(f, "<fn {}>", name.lexeme),
                None => write!(f, "<lambda>"),
            },
            Value::Native(native) => write!(f, "<native fn {}>", native.name),
        }
    }
}

/// Integral numbers print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
