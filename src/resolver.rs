// File: src/resolver.rs
//
// Static resolution pass for the loxwalk language.
//
// Walks the AST once before execution with a stack of lexical scopes
// (innermost last) that mirrors the environments the interpreter will create:
// one per block and one per function call. Every Variable/Assign node that
// names a local gets a scope distance in the binding table; anything not found
// is left for the interpreter to look up among the globals at run time.
//
// Diagnostics (all routed through the shared Reporter, none stop the pass):
// - redeclaration within one scope
// - reading a variable inside its own initializer
// - `return` outside a function, `break`/`continue` outside a loop
// - unused locals (warning, emitted when their scope closes)

use crate::ast::{Expr, ExprId, Lambda, Stmt};
use crate::errors::Reporter;
use crate::lexer::Token;
use std::collections::HashMap;

/// Scope distance for each locally bound Variable/Assign node.
pub type Bindings = HashMap<ExprId, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    None,
    While,
}

#[derive(Debug)]
struct Binding {
    name: Token,
    defined: bool,
    referenced: bool,
    /// Declaration order within the scope, for stable warning output.
    order: usize,
}

pub struct Resolver<'r> {
    scopes: Vec<HashMap<String, Binding>>,
    /// Top-level names; the flag is false while the initializer is resolved.
    globals: HashMap<String, bool>,
    bindings: Bindings,
    current_function: FunctionKind,
    current_loop: LoopKind,
    reporter: &'r mut Reporter,
}

impl<'r> Resolver<'r> {
    pub fn new(reporter: &'r mut Reporter) -> Self {
        Resolver {
            scopes: Vec::new(),
            globals: HashMap::new(),
            bindings: Bindings::new(),
            current_function: FunctionKind::None,
            current_loop: LoopKind::None,
            reporter,
        }
    }

    /// Seed global names already defined by earlier executions (REPL inputs),
    /// so `var a = a;` can read the previous `a`.
    pub fn with_globals(mut self, names: impl IntoIterator<Item = String>) -> Self {
        for name in names {
            self.globals.insert(name, true);
        }
        self
    }

    pub fn resolve_program(&mut self, stmts: &[Stmt]) {
        self.resolve_stmts(stmts);
    }

    pub fn resolve_expression(&mut self, expr: &Expr) {
        self.resolve_expr(expr);
    }

    pub fn into_bindings(self) -> Bindings {
        self.bindings
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(body) => {
                self.begin_scope();
                self.resolve_stmts(body);
                self.end_scope();
            }
            Stmt::Expression(expr) | Stmt::PrintExpr { expr, .. } => self.resolve_expr(expr),
            Stmt::Function { name, lambda } => {
                // Defined before the body so the function can recurse.
                self.declare(name);
                self.define(name);
                self.resolve_function(lambda);
            }
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Stmt::While { condition, body, .. } => {
                let enclosing_loop = self.current_loop;
                self.current_loop = LoopKind::While;
                self.resolve_expr(condition);
                self.resolve_stmt(body);
                self.current_loop = enclosing_loop;
            }
            Stmt::If { condition, then_branch, else_branch } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::LoopControl { keyword } => {
                if self.current_loop == LoopKind::None {
                    let message = format!("Can't use '{}' outside of a loop.", keyword.lexeme);
                    self.reporter.error_at(keyword, message);
                }
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    self.reporter.error_at(keyword, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Call { callee, arguments, .. } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
            Expr::Lambda(lambda) => self.resolve_function(lambda),
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Literal(_) => {}
            Expr::Unary { operand, .. } => self.resolve_expr(operand),
            Expr::Ternary { condition, then_branch, else_branch } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            Expr::Variable { id, name } => {
                let pending = match self.scopes.last() {
                    Some(scope) => scope.get(&name.lexeme).is_some_and(|b| !b.defined),
                    None => self.globals.get(&name.lexeme) == Some(&false),
                };
                if pending {
                    self.reporter.error_at(name, "Can't read local variable in its own initializer.");
                }
                self.resolve_local(*id, name);
            }
        }
    }

    /// Parameters and body share one scope, matching the single environment
    /// the interpreter creates per call.
    fn resolve_function(&mut self, lambda: &Lambda) {
        let enclosing_function = self.current_function;
        let enclosing_loop = self.current_loop;
        self.current_function = FunctionKind::Function;
        self.current_loop = LoopKind::None;

        self.begin_scope();
        for param in &lambda.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&lambda.body);
        self.end_scope();

        self.current_function = enclosing_function;
        self.current_loop = enclosing_loop;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        let mut unused: Vec<Binding> = scope.into_values().filter(|b| !b.referenced).collect();
        unused.sort_by_key(|b| b.order);
        for binding in unused {
            self.reporter.warning_at(&binding.name, "Variable is unused.");
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            // Redefining an existing global keeps it readable in the new initializer.
            self.globals.entry(name.lexeme.clone()).or_insert(false);
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.reporter.error_at(name, "Already a variable with this name in this scope.");
        }
        let order = scope.len();
        scope.insert(
            name.lexeme.clone(),
            Binding { name: name.clone(), defined: false, referenced: false, order },
        );
    }

    fn define(&mut self, name: &Token) {
        match self.scopes.last_mut() {
            Some(scope) => {
                if let Some(binding) = scope.get_mut(&name.lexeme) {
                    binding.defined = true;
                }
            }
            None => {
                self.globals.insert(name.lexeme.clone(), true);
            }
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        let depth = self.scopes.len();
        for (index, scope) in self.scopes.iter_mut().enumerate().rev() {
            if let Some(binding) = scope.get_mut(&name.lexeme) {
                binding.referenced = true;
                let distance = depth - 1 - index;
                tracing::trace!(name = %name.lexeme, line = name.line, distance, "resolved local");
                self.bindings.insert(id, distance);
                return;
            }
        }
    }
}

/// Resolve a whole program in one call.
pub fn resolve(stmts: &[Stmt], reporter: &mut Reporter) -> Bindings {
    let mut resolver = Resolver::new(reporter);
    resolver.resolve_program(stmts);
    resolver.into_bindings()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Severity;
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn resolve_source(source: &str) -> (Bindings, Reporter) {
        let mut reporter = Reporter::new();
        let tokens = tokenize(source, &mut reporter);
        let stmts = Parser::new(tokens, &mut reporter).parse_program();
        assert!(!reporter.had_error(), "parse failed: {:?}", reporter.diagnostics());
        let bindings = resolve(&stmts, &mut reporter);
        (bindings, reporter)
    }

    fn messages(reporter: &Reporter) -> Vec<String> {
        reporter.diagnostics().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn distances_count_enclosing_scopes() {
        let (bindings, reporter) = resolve_source("{ var a = 1; { { print a; } } }");
        assert!(reporter.diagnostics().is_empty());
        let distances: Vec<usize> = bindings.values().copied().collect();
        assert_eq!(distances, vec![2]);
    }

    #[test]
    fn globals_get_no_distance() {
        let (bindings, reporter) = resolve_source("var a = 1; print a; a = 2;");
        assert!(bindings.is_empty());
        assert!(reporter.diagnostics().is_empty());
    }

    #[test]
    fn function_parameters_live_in_the_body_scope() {
        let (bindings, reporter) = resolve_source("fun f(x) { return x; }");
        assert!(reporter.diagnostics().is_empty());
        assert_eq!(bindings.values().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn self_referential_initializer_is_an_error() {
        let (_, reporter) = resolve_source("var a = a;");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );

        let (_, reporter) = resolve_source("{ var b = 1; { var b = b; print b; } print b; }");
        assert_eq!(reporter.errors().count(), 1);
    }

    #[test]
    fn redefining_a_defined_global_may_read_the_old_value() {
        let (_, reporter) = resolve_source("var a = 1; var a = a + 1;");
        assert!(!reporter.had_error());
    }

    #[test]
    fn seeded_globals_are_already_defined() {
        let mut reporter = Reporter::new();
        let tokens = tokenize("var a = a;", &mut reporter);
        let stmts = Parser::new(tokens, &mut reporter).parse_program();
        let mut resolver = Resolver::new(&mut reporter).with_globals(vec!["a".to_string()]);
        resolver.resolve_program(&stmts);
        assert!(!reporter.had_error());
    }

    #[test]
    fn redeclaration_in_one_scope_is_an_error_but_shadowing_is_not() {
        let (_, reporter) = resolve_source("{ var a = 1; var a = 2; print a; }");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );

        let (_, reporter) = resolve_source("{ var a = 1; { var a = 2; print a; } print a; }");
        assert!(reporter.diagnostics().is_empty());
    }

    #[test]
    fn return_outside_function_is_an_error() {
        let (_, reporter) = resolve_source("return 1;");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn loop_control_outside_loop_is_an_error() {
        let (_, reporter) = resolve_source("break;\nwhile (true) { continue; }");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Error at 'break': Can't use 'break' outside of a loop."]
        );
    }

    #[test]
    fn loop_control_does_not_cross_a_function_boundary() {
        let (_, reporter) = resolve_source("while (true) { var f = () => { break; }; f(); }");
        assert_eq!(reporter.errors().count(), 1);
    }

    #[test]
    fn resolution_continues_after_errors() {
        let (_, reporter) = resolve_source("return 1;\nbreak;\nvar a = a;");
        assert_eq!(reporter.errors().count(), 3);
    }

    #[test]
    fn unused_local_warns_once_when_its_scope_closes() {
        let (_, reporter) = resolve_source("{ var unused = 1; }");
        assert_eq!(
            messages(&reporter),
            vec!["[line 1] Warning at 'unused': Variable is unused."]
        );
        assert!(!reporter.had_error());
    }

    #[test]
    fn reading_inside_a_nested_closure_counts_as_use() {
        let (_, reporter) = resolve_source("{ var n = 1; var f = () => n; f(); }");
        assert!(reporter.diagnostics().is_empty());
    }

    #[test]
    fn unused_warnings_follow_declaration_order() {
        let (_, reporter) = resolve_source("{ var c = 1; var a = 2; var b = 3; }");
        let names: Vec<Option<String>> =
            reporter.warnings().map(|d| d.lexeme.clone()).collect();
        assert_eq!(
            names,
            vec![Some("c".to_string()), Some("a".to_string()), Some("b".to_string())]
        );
        assert!(reporter.diagnostics().iter().all(|d| d.severity == Severity::Warning));
    }
}
