// File: src/ast.rs
//
// Abstract Syntax Tree (AST) definitions for the loxwalk language.
//
// Expressions (Expr) produce values; statements (Stmt) perform actions and
// control flow. Nodes are never mutated after the parser builds them. The
// nodes the resolver binds (Variable, Assign) carry an ExprId so the binding
// table can be keyed by node identity rather than by structure.

use crate::lexer::Token;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Identity of a resolvable expression node.
///
/// Ids are unique for the lifetime of the process, so nodes parsed from
/// separate REPL inputs never share a key in the interpreter's binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    pub fn fresh() -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
        ExprId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Constant values that can appear directly in source.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
}

/// Parameters and body shared by function declarations and lambda expressions.
#[derive(Debug)]
pub struct Lambda {
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// Not `Clone`: a copied Variable/Assign node would share its ExprId.
#[derive(Debug)]
pub enum Expr {
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },
    /// Arithmetic, comparison, equality and the comma operator.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },
    Lambda(Rc<Lambda>),
    Grouping(Box<Expr>),
    Literal(LiteralValue),
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Unary {
        operator: Token,
        operand: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Variable {
        id: ExprId,
        name: Token,
    },
}

impl Expr {
    pub fn variable(name: Token) -> Self {
        Expr::Variable { id: ExprId::fresh(), name }
    }

    pub fn assign(name: Token, value: Expr) -> Self {
        Expr::Assign { id: ExprId::fresh(), name, value: Box::new(value) }
    }

    pub fn binary(left: Expr, operator: Token, right: Expr) -> Self {
        Expr::Binary { left: Box::new(left), operator, right: Box::new(right) }
    }

    pub fn logical(left: Expr, operator: Token, right: Expr) -> Self {
        Expr::Logical { left: Box::new(left), operator, right: Box::new(right) }
    }

    pub fn ternary(condition: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Expr::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }
}

/// How a print statement renders its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintStyle {
    /// `print expr;` writes the value.
    Value,
    /// `printSexpr expr;` writes the prefix form of the expression and its value.
    Sexpr,
}

#[derive(Debug)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Expression(Expr),
    Function {
        name: Token,
        lambda: Rc<Lambda>,
    },
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        /// Set on loops desugared from `for` with an increment clause; the
        /// body is then a block whose last statement is that increment.
        has_increment: bool,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// `break` or `continue`, told apart by the keyword's kind.
    LoopControl {
        keyword: Token,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    PrintExpr {
        style: PrintStyle,
        expr: Expr,
    },
}
