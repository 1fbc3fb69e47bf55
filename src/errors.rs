// File: src/errors.rs
//
// Error handling and reporting for the loxwalk interpreter.
// Every compile-time problem (lexical, parse, resolution) becomes a
// Diagnostic collected by a single Reporter sink; runtime failures are
// RuntimeError values that abort the current execution unit.

use crate::lexer::{Token, TokenKind};
use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// How serious a diagnostic is. Only errors block execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

/// A single line-tagged compile-time message.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    /// Lexeme of the offending token, `None` for end of input and lexical errors.
    pub lexeme: Option<String>,
    pub message: String,
}

impl Diagnostic {
    /// Colorized rendering for terminals. `Display` stays plain.
    pub fn render(&self) -> String {
        let severity = match self.severity {
            Severity::Error => self.severity.to_string().red().bold(),
            Severity::Warning => self.severity.to_string().yellow().bold(),
        };
        let line = format!("[line {}]", self.line).bright_blue();
        match &self.lexeme {
            Some(lexeme) => format!(
                "{} {} at '{}': {}",
                line,
                severity,
                lexeme.bright_white(),
                self.message.bold()
            ),
            None => format!("{} {}: {}", line, severity, self.message.bold()),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.lexeme {
            Some(lexeme) => write!(
                f,
                "[line {}] {} at '{}': {}",
                self.line, self.severity, lexeme, self.message
            ),
            None => write!(f, "[line {}] {}: {}", self.line, self.severity, self.message),
        }
    }
}

/// Shared sink for lexer, parser and resolver diagnostics.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an error that has no token, only a line (lexical errors).
    pub fn error(&mut self, line: usize, message: impl Into<String>) {
        self.push(Severity::Error, line, None, message.into());
    }

    /// Report an error at a token.
    pub fn error_at(&mut self, token: &Token, message: impl Into<String>) {
        self.push(Severity::Error, token.line, Self::location(token), message.into());
    }

    /// Report a warning at a token. Warnings never block execution.
    pub fn warning_at(&mut self, token: &Token, message: impl Into<String>) {
        self.push(Severity::Warning, token.line, Self::location(token), message.into());
    }

    fn location(token: &Token) -> Option<String> {
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token.lexeme.clone())
        }
    }

    fn push(&mut self, severity: Severity, line: usize, lexeme: Option<String>, message: String) {
        tracing::debug!(%severity, line, message = %message, "diagnostic reported");
        self.diagnostics.push(Diagnostic { severity, line, lexeme, message });
    }

    /// True once any error-severity diagnostic has been reported.
    pub fn had_error(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Print every collected diagnostic to stderr.
    pub fn emit(&self) {
        for diagnostic in &self.diagnostics {
            eprintln!("{}", diagnostic.render());
        }
    }

    /// Drop every diagnostic after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.diagnostics.truncate(len);
    }

    /// Move every diagnostic collected by a scratch reporter into this one.
    pub fn absorb(&mut self, other: Reporter) {
        self.diagnostics.extend(other.diagnostics);
    }
}

/// The distinct ways execution can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Unassigned variable '{0}' accessed.")]
    UnassignedVariable(String),
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Operands must be two numbers or two strings.")]
    InvalidAddition,
    #[error("Can only call functions.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: usize, got: usize },
    #[error("Unsupported operator '{0}'.")]
    UnsupportedOperator(String),
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("{0}")]
    Native(String),
}

/// A runtime failure tagged with the source line of the token that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}\n[line {line}]")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: usize,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, line: usize) -> Self {
        Self { kind, line }
    }

    pub fn at(token: &Token, kind: RuntimeErrorKind) -> Self {
        Self::new(kind, token.line)
    }

    /// Colorized rendering for terminals.
    pub fn render(&self) -> String {
        format!(
            "{} {}\n{}",
            "Runtime Error:".red().bold(),
            self.kind.to_string().bold(),
            format!("[line {}]", self.line).bright_blue()
        )
    }
}
