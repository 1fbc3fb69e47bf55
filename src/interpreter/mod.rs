// File: src/interpreter/mod.rs
//
// Tree-walking interpreter for the loxwalk language.
// Executes programs by traversing the AST produced by the parser, using the
// scope distances recorded by the resolver to find local variables.
//
// The interpreter owns two environment handles: the global frame, which lives
// as long as the interpreter, and the current frame, which changes as blocks
// and calls are entered and left. Statements report their outcome as a
// ControlFlow so break, continue and return never unwind through errors;
// runtime errors abort the current top-level unit with a RuntimeError.

mod control_flow;
mod environment;
mod native_functions;
mod value;

pub use environment::{Environment, Slot};
pub use value::{format_number, Function, NativeFunction, Value};

use control_flow::ControlFlow;

use crate::ast::{Expr, ExprId, Lambda, LiteralValue, PrintStyle, Stmt};
use crate::errors::{RuntimeError, RuntimeErrorKind};
use crate::lexer::{Token, TokenKind};
use crate::printer;
use crate::resolver::Bindings;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// Deepest allowed nesting of user function calls.
pub const MAX_CALL_DEPTH: usize = 256;

type ExecResult = Result<ControlFlow, RuntimeError>;
type EvalResult = Result<Value, RuntimeError>;

/// Main interpreter that executes loxwalk programs
pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Scope distances for local Variable/Assign nodes, accumulated across runs.
    locals: Bindings,
    output: Option<Arc<Mutex<Vec<u8>>>>,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new interpreter with only the built-in globals defined
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        for native in native_functions::registry() {
            let name = native.name;
            globals.borrow_mut().define(name, Value::Native(Rc::new(native)), true);
        }

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: Bindings::new(),
            output: None,
            call_depth: 0,
        }
    }

    /// Redirect `print` output into a shared buffer instead of stdout.
    pub fn set_output(&mut self, output: Arc<Mutex<Vec<u8>>>) {
        self.output = Some(output);
    }

    /// Merge the resolver's bindings for the next unit of code. Earlier
    /// bindings stay, since closures from earlier units may still run.
    pub fn resolve(&mut self, bindings: Bindings) {
        self.locals.extend(bindings);
    }

    /// Execute a resolved program, stopping at the first runtime error.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in stmts {
            match self.execute(stmt) {
                Ok(ControlFlow::Normal) => {}
                Ok(flow) => {
                    tracing::warn!(?flow, "control flow escaped to top level, stopping");
                    break;
                }
                Err(err) => return Err(self.recover(err)),
            }
        }
        Ok(())
    }

    /// Evaluate a single resolved expression (REPL expression mode).
    pub fn evaluate_expression(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        self.evaluate(expr).map_err(|err| self.recover(err))
    }

    /// Names currently defined in the global frame, sorted.
    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().names()
    }

    /// Global bindings with their current slots, sorted by name.
    pub fn global_bindings(&self) -> Vec<(String, Slot)> {
        self.globals.borrow().slots()
    }

    /// After an error the current frame is always the global one again, so the
    /// next unit starts clean even if the error escaped a nested call.
    fn recover(&mut self, err: RuntimeError) -> RuntimeError {
        tracing::debug!(error = %err.kind, line = err.line, "runtime error");
        self.environment = Rc::clone(&self.globals);
        self.call_depth = 0;
        err
    }

    fn write_output(&self, msg: &str) {
        if let Some(out) = &self.output {
            if let Ok(mut buffer) = out.lock() {
                let _ = writeln!(buffer, "{}", msg);
            }
        } else {
            println!("{}", msg);
        }
    }

    /// Run `f` with `env` as the current frame, restoring the previous frame
    /// afterwards whatever the outcome.
    fn in_environment<T>(
        &mut self,
        env: Environment,
        f: impl FnOnce(&mut Self) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, Rc::new(RefCell::new(env)));
        let result = f(self);
        self.environment = previous;
        result
    }

    fn child_environment(&self) -> Environment {
        Environment::new_enclosed(Rc::clone(&self.environment))
    }

    fn execute_all(&mut self, stmts: &[Stmt]) -> ExecResult {
        for stmt in stmts {
            let flow = self.execute(stmt)?;
            if !flow.is_normal() {
                return Ok(flow);
            }
        }
        Ok(ControlFlow::Normal)
    }

    /// Evaluates a single statement
    fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Block(body) => {
                let env = self.child_environment();
                self.in_environment(env, |interp| interp.execute_all(body))
            }
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(ControlFlow::Normal)
            }
            Stmt::Function { name, lambda } => {
                let function = self.closure(Some(name.clone()), lambda);
                self.environment.borrow_mut().define(&name.lexeme, function, true);
                Ok(ControlFlow::Normal)
            }
            Stmt::Var { name, initializer } => {
                match initializer {
                    Some(initializer) => {
                        let value = self.evaluate(initializer)?;
                        self.environment.borrow_mut().define(&name.lexeme, value, true);
                    }
                    None => self.environment.borrow_mut().define(&name.lexeme, Value::Nil, false),
                }
                Ok(ControlFlow::Normal)
            }
            Stmt::While { condition, body, has_increment } => {
                while self.evaluate(condition)?.is_truthy() {
                    let flow = if *has_increment {
                        self.execute_for_body(body)?
                    } else {
                        self.execute(body)?
                    };
                    match flow {
                        ControlFlow::Normal | ControlFlow::Continue => {}
                        ControlFlow::Break => break,
                        ControlFlow::Return(value) => return Ok(ControlFlow::Return(value)),
                    }
                }
                Ok(ControlFlow::Normal)
            }
            Stmt::If { condition, then_branch, else_branch } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(ControlFlow::Normal)
                }
            }
            Stmt::LoopControl { keyword } => match keyword.kind {
                TokenKind::Continue => Ok(ControlFlow::Continue),
                _ => Ok(ControlFlow::Break),
            },
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(ControlFlow::Return(value))
            }
            Stmt::PrintExpr { style, expr } => {
                let value = self.evaluate(expr)?;
                match style {
                    PrintStyle::Value => self.write_output(&value.to_string()),
                    PrintStyle::Sexpr => {
                        self.write_output(&format!("{} => {}", printer::to_prefix(expr), value))
                    }
                }
                Ok(ControlFlow::Normal)
            }
        }
    }

    /// Body of a loop desugared from `for` with an increment: a block whose
    /// last statement is the increment. The increment runs after the body
    /// falls through or continues, in the same block frame.
    fn execute_for_body(&mut self, body: &Stmt) -> ExecResult {
        let Stmt::Block(stmts) = body else {
            return self.execute(body);
        };
        let Some((increment, inner)) = stmts.split_last() else {
            return Ok(ControlFlow::Normal);
        };

        let env = self.child_environment();
        self.in_environment(env, |interp| match interp.execute_all(inner)? {
            ControlFlow::Normal | ControlFlow::Continue => interp.execute(increment),
            flow => Ok(flow),
        })
    }

    fn closure(&self, name: Option<Token>, lambda: &Rc<Lambda>) -> Value {
        Value::Function(Rc::new(Function {
            name,
            declaration: Rc::clone(lambda),
            closure: Rc::clone(&self.environment),
        }))
    }

    /// Evaluates an expression and returns its value
    fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(Rc::clone(s)),
            }),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Variable { id, name } => self.look_up_variable(*id, name),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                let result = match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),
                    None => self.globals.borrow_mut().assign(&name.lexeme, value.clone()),
                };
                result.map_err(|kind| RuntimeError::at(name, kind))?;
                Ok(value)
            }
            Expr::Unary { operator, operand } => {
                let operand = self.evaluate(operand)?;
                match operator.kind {
                    TokenKind::Minus => match operand {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::at(operator, RuntimeErrorKind::OperandMustBeNumber)),
                    },
                    _ => Ok(Value::Bool(!operand.is_truthy())),
                }
            }
            Expr::Binary { left, operator, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }
            Expr::Logical { left, operator, right } => {
                let left = self.evaluate(left)?;
                let short_circuit = match operator.kind {
                    TokenKind::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expr::Ternary { condition, then_branch, else_branch } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            Expr::Lambda(lambda) => Ok(self.closure(None, lambda)),
            Expr::Call { callee, paren, arguments } => {
                let callee = self.evaluate(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }
                self.call_value(callee, args, paren)
            }
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> EvalResult {
        let result = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };
        result.map_err(|kind| RuntimeError::at(name, kind))
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>, paren: &Token) -> EvalResult {
        match callee {
            Value::Function(function) => {
                check_arity(function.arity(), args.len(), paren)?;
                self.call_function(&function, args, paren)
            }
            Value::Native(native) => {
                check_arity(native.arity, args.len(), paren)?;
                tracing::trace!(native = native.name, "native call");
                native_functions::call_native_function(native.name, &args)
                    .map_err(|message| RuntimeError::at(paren, RuntimeErrorKind::Native(message)))
            }
            _ => Err(RuntimeError::at(paren, RuntimeErrorKind::NotCallable)),
        }
    }

    /// Bind arguments in a fresh child of the closure frame and run the body
    /// there; parameters and body locals share that one frame.
    fn call_function(&mut self, function: &Function, args: Vec<Value>, paren: &Token) -> EvalResult {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::at(paren, RuntimeErrorKind::StackOverflow));
        }
        tracing::trace!(function = ?function, depth = self.call_depth, "call");

        let mut frame = Environment::new_enclosed(Rc::clone(&function.closure));
        for (param, arg) in function.declaration.params.iter().zip(args) {
            frame.define(&param.lexeme, arg, true);
        }

        self.call_depth += 1;
        let result = self.in_environment(frame, |interp| interp.execute_all(&function.declaration.body));
        self.call_depth -= 1;

        match result? {
            ControlFlow::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<(), RuntimeError> {
    if expected == got {
        Ok(())
    } else {
        Err(RuntimeError::at(paren, RuntimeErrorKind::ArityMismatch { expected, got }))
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::at(operator, RuntimeErrorKind::OperandsMustBeNumbers)),
    }
}

/// Strict binary operators; both operands have already been evaluated left to right.
fn binary(operator: &Token, left: Value, right: Value) -> EvalResult {
    let value = match operator.kind {
        TokenKind::Comma => right,
        TokenKind::EqualEqual => Value::Bool(left == right),
        TokenKind::BangEqual => Value::Bool(left != right),
        TokenKind::Plus => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::Str(a), Value::Str(b)) => Value::Str(Rc::from(format!("{}{}", a, b))),
            _ => return Err(RuntimeError::at(operator, RuntimeErrorKind::InvalidAddition)),
        },
        _ => {
            let (a, b) = number_operands(operator, &left, &right)?;
            match operator.kind {
                TokenKind::Minus => Value::Number(a - b),
                TokenKind::Star => Value::Number(a * b),
                TokenKind::Slash => Value::Number(a / b),
                TokenKind::Greater => Value::Bool(a > b),
                TokenKind::GreaterEqual => Value::Bool(a >= b),
                TokenKind::Less => Value::Bool(a < b),
                TokenKind::LessEqual => Value::Bool(a <= b),
                _ => {
                    let kind = RuntimeErrorKind::UnsupportedOperator(operator.lexeme.clone());
                    return Err(RuntimeError::at(operator, kind));
                }
            }
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn op(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, 4)
    }

    #[test]
    fn binary_maps_each_operator() {
        let (one, two) = (Value::Number(1.0), Value::Number(2.0));
        assert_eq!(binary(&op(TokenKind::Comma, ","), one.clone(), two.clone()), Ok(two.clone()));
        assert_eq!(binary(&op(TokenKind::Slash, "/"), one.clone(), two.clone()), Ok(Value::Number(0.5)));
        assert_eq!(binary(&op(TokenKind::LessEqual, "<="), one.clone(), two), Ok(Value::Bool(true)));
        assert_eq!(binary(&op(TokenKind::BangEqual, "!="), one, Value::Nil), Ok(Value::Bool(true)));
    }

    #[test]
    fn operators_without_a_binary_meaning_are_rejected() {
        let result = binary(&op(TokenKind::Bang, "!"), Value::Number(1.0), Value::Number(2.0));
        assert_eq!(
            result,
            Err(RuntimeError::new(RuntimeErrorKind::UnsupportedOperator("!".to_string()), 4))
        );
    }
}
