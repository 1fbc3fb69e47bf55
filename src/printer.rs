// File: src/printer.rs
//
// Debug renderings of the AST. Both printers are pure read-only traversals:
// - prefix (S-expression) form, e.g. `(+ 1 (* 2 3))`, for expressions and statements
// - postfix (reverse Polish) form, e.g. `1 2 3 * +`, for expressions
//
// Used by `printSexpr`, the `ast` subcommand and the parser tests.

use crate::ast::{Expr, LiteralValue, PrintStyle, Stmt};
use crate::interpreter::format_number;

fn literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Nil => "nil".to_string(),
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Number(n) => format_number(*n),
        LiteralValue::Str(s) => format!("\"{}\"", s),
    }
}

fn parenthesize(name: &str, parts: impl IntoIterator<Item = String>) -> String {
    let mut out = format!("({}", name);
    for part in parts {
        out.push(' ');
        out.push_str(&part);
    }
    out.push(')');
    out
}

/// Prefix rendering of an expression.
pub fn to_prefix(expr: &Expr) -> String {
    match expr {
        Expr::Assign { name, value, .. } => {
            parenthesize("=", [name.lexeme.clone(), to_prefix(value)])
        }
        Expr::Binary { left, operator, right } | Expr::Logical { left, operator, right } => {
            parenthesize(&operator.lexeme, [to_prefix(left), to_prefix(right)])
        }
        Expr::Call { callee, arguments, .. } => parenthesize(
            "call",
            std::iter::once(to_prefix(callee)).chain(arguments.iter().map(to_prefix)),
        ),
        Expr::Lambda(lambda) => {
            let params: Vec<&str> = lambda.params.iter().map(|p| p.lexeme.as_str()).collect();
            parenthesize(
                "lambda",
                std::iter::once(format!("({})", params.join(" ")))
                    .chain(lambda.body.iter().map(to_prefix_stmt)),
            )
        }
        Expr::Grouping(inner) => parenthesize("group", [to_prefix(inner)]),
        Expr::Literal(value) => literal(value),
        Expr::Unary { operator, operand } => parenthesize(&operator.lexeme, [to_prefix(operand)]),
        Expr::Ternary { condition, then_branch, else_branch } => parenthesize(
            "?",
            [to_prefix(condition), to_prefix(then_branch), to_prefix(else_branch)],
        ),
        Expr::Variable { name, .. } => name.lexeme.clone(),
    }
}

/// Prefix rendering of a statement. Expression statements render as their expression.
pub fn to_prefix_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Block(body) => parenthesize("block", body.iter().map(to_prefix_stmt)),
        Stmt::Expression(expr) => to_prefix(expr),
        Stmt::Function { name, lambda } => {
            let params: Vec<&str> = lambda.params.iter().map(|p| p.lexeme.as_str()).collect();
            parenthesize(
                &format!("fun {}", name.lexeme),
                std::iter::once(format!("({})", params.join(" ")))
                    .chain(lambda.body.iter().map(to_prefix_stmt)),
            )
        }
        Stmt::Var { name, initializer } => parenthesize(
            "var",
            std::iter::once(name.lexeme.clone()).chain(initializer.iter().map(to_prefix)),
        ),
        Stmt::While { condition, body, .. } => {
            parenthesize("while", [to_prefix(condition), to_prefix_stmt(body)])
        }
        Stmt::If { condition, then_branch, else_branch } => parenthesize(
            "if",
            [to_prefix(condition), to_prefix_stmt(then_branch)]
                .into_iter()
                .chain(else_branch.iter().map(|s| to_prefix_stmt(s))),
        ),
        Stmt::LoopControl { keyword } => format!("({})", keyword.lexeme),
        Stmt::Return { value, .. } => parenthesize("return", value.iter().map(to_prefix)),
        Stmt::PrintExpr { style, expr } => {
            let name = match style {
                PrintStyle::Value => "print",
                PrintStyle::Sexpr => "printSexpr",
            };
            parenthesize(name, [to_prefix(expr)])
        }
    }
}

fn polishize(name: &str, parts: impl IntoIterator<Item = String>) -> String {
    let mut out = String::new();
    for part in parts {
        out.push_str(&part);
        out.push(' ');
    }
    out.push_str(name);
    out
}

/// Postfix (reverse Polish) rendering of an expression.
pub fn to_postfix(expr: &Expr) -> String {
    match expr {
        Expr::Assign { name, value, .. } => polishize("=", [name.lexeme.clone(), to_postfix(value)]),
        Expr::Binary { left, operator, right } | Expr::Logical { left, operator, right } => {
            polishize(&operator.lexeme, [to_postfix(left), to_postfix(right)])
        }
        Expr::Call { callee, arguments, .. } => polishize(
            "call",
            std::iter::once(to_postfix(callee)).chain(arguments.iter().map(to_postfix)),
        ),
        Expr::Lambda(lambda) => format!("<lambda/{}>", lambda.params.len()),
        Expr::Grouping(inner) => polishize("group", [to_postfix(inner)]),
        Expr::Literal(value) => literal(value),
        Expr::Unary { operator, operand } => polishize(&operator.lexeme, [to_postfix(operand)]),
        Expr::Ternary { condition, then_branch, else_branch } => polishize(
            "?:",
            [to_postfix(condition), to_postfix(then_branch), to_postfix(else_branch)],
        ),
        Expr::Variable { name, .. } => name.lexeme.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Reporter;
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn parse_expr(source: &str) -> Expr {
        let mut reporter = Reporter::new();
        let tokens = tokenize(source, &mut reporter);
        let parsed = Parser::new(tokens, &mut reporter).parse_single_expression();
        match parsed {
            Some(expr) => expr,
            None => panic!("failed to parse {:?}: {:?}", source, reporter.diagnostics()),
        }
    }

    #[test]
    fn prefix_renders_literals_in_display_form() {
        assert_eq!(to_prefix(&parse_expr("(1.5 + 2) * \"s\"")), "(* (group (+ 1.5 2)) \"s\")");
        assert_eq!(to_prefix(&parse_expr("nil == false")), "(== nil false)");
    }

    #[test]
    fn postfix_puts_operators_last() {
        assert_eq!(to_postfix(&parse_expr("(1 + 2) * (4 - 3)")), "1 2 + group 4 3 - group *");
        assert_eq!(to_postfix(&parse_expr("-x")), "x -");
        assert_eq!(to_postfix(&parse_expr("a ? b : c")), "a b c ?:");
        assert_eq!(to_postfix(&parse_expr("f(1, g)")), "f 1 g call");
    }

    #[test]
    fn lambdas_render_parameters_and_body() {
        assert_eq!(to_prefix(&parse_expr("(a, b) => a")), "(lambda (a b) (return a))");
        assert_eq!(to_postfix(&parse_expr("(a, b) => a")), "<lambda/2>");
    }
}
