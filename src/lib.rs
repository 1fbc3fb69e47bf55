// File: src/lib.rs
//
// Library interface for the loxwalk interpreter.
// Exposes the pipeline stages for the binary, the REPL and integration tests,
// plus `run_source`, which drives one unit of source through all of them:
// lex -> parse -> resolve -> interpret.

pub mod ast;
pub mod errors;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod repl;
pub mod resolver;

use ast::Stmt;
use errors::{Reporter, RuntimeError};
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use thiserror::Error;

/// Why a unit of source did not run to completion.
#[derive(Debug, Error)]
pub enum RunError {
    /// Lexical, parse or resolution errors were reported; nothing executed.
    #[error("{0} compile error(s)")]
    Compile(usize),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Lex and parse `source`, collecting diagnostics in `reporter`.
pub fn parse_source(source: &str, reporter: &mut Reporter) -> Vec<Stmt> {
    let tokens = lexer::tokenize(source, reporter);
    tracing::debug!(tokens = tokens.len(), "lexed source");
    Parser::new(tokens, reporter).parse_program()
}

/// Run one unit of source against `interpreter`, whose globals persist
/// between calls. Diagnostics (warnings included) are left in `reporter`.
pub fn run_source(
    source: &str,
    interpreter: &mut Interpreter,
    reporter: &mut Reporter,
) -> Result<(), RunError> {
    let stmts = parse_source(source, reporter);
    compile_status(reporter)?;
    execute_program(&stmts, interpreter, reporter)
}

/// Resolve and execute an already parsed program.
pub fn execute_program(
    stmts: &[Stmt],
    interpreter: &mut Interpreter,
    reporter: &mut Reporter,
) -> Result<(), RunError> {
    let mut resolver = Resolver::new(reporter).with_globals(interpreter.global_names());
    resolver.resolve_program(stmts);
    let bindings = resolver.into_bindings();
    compile_status(reporter)?;

    tracing::debug!(statements = stmts.len(), locals = bindings.len(), "executing program");
    interpreter.resolve(bindings);
    interpreter.interpret(stmts)?;
    Ok(())
}

fn compile_status(reporter: &Reporter) -> Result<(), RunError> {
    match reporter.errors().count() {
        0 => Ok(()),
        count => Err(RunError::Compile(count)),
    }
}
