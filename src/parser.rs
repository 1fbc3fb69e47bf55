// File: src/parser.rs
//
// Recursive descent parser for the loxwalk language.
// Transforms a sequence of tokens into an Abstract Syntax Tree (AST).
//
// One method per precedence level, lowest to highest:
//   comma -> assignment -> or -> and -> ternary (?:, right-assoc)
//   -> ternary (?.:, left-assoc) -> equality -> comparison -> term -> factor
//   -> unary -> call -> primary
//
// Lambdas are recognised speculatively at the assignment level: the parser
// takes a checkpoint, tries to read a parameter list followed by `=>`, and
// rewinds to the checkpoint if that fails. A failed `consume` aborts the
// current statement; the parser then synchronizes at the next statement
// boundary so a single pass reports as many errors as possible.

use crate::ast::{Expr, Lambda, LiteralValue, PrintStyle, Stmt};
use crate::errors::Reporter;
use crate::lexer::{Literal, Token, TokenKind};
use std::rc::Rc;

/// Maximum number of call arguments and function parameters.
pub const MAX_ARGUMENTS: usize = 255;

/// Local parse failure, caught at statement granularity.
#[derive(Debug)]
struct ParseError;

type ParseResult<T> = Result<T, ParseError>;

/// Saved cursor position for speculative parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl From<&Literal> for LiteralValue {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Number(n) => LiteralValue::Number(*n),
            Literal::Str(s) => LiteralValue::Str(Rc::from(s.as_str())),
        }
    }
}

/// Parser maintains position in token stream and reports problems to a shared sink
pub struct Parser<'r> {
    tokens: Vec<Token>,
    pos: usize,
    reporter: &'r mut Reporter,
}

impl<'r> Parser<'r> {
    /// Creates a new parser from a vector of tokens.
    /// A missing trailing `Eof` token is supplied.
    pub fn new(mut tokens: Vec<Token>, reporter: &'r mut Reporter) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenKind::Eof, "", line));
        }
        Parser { tokens, pos: 0, reporter }
    }

    /// Parse the entire token stream into a program.
    ///
    /// Statements that fail to parse are dropped after being reported; check
    /// the reporter before executing the result.
    pub fn parse_program(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }
        stmts
    }

    /// Parse the stream as one bare expression with no trailing semicolon.
    /// Used by the interactive shell after `parse_program` has failed.
    pub fn parse_single_expression(&mut self) -> Option<Expr> {
        let expr = self.expression().ok()?;
        if self.is_at_end() {
            Some(expr)
        } else {
            let token = self.peek().clone();
            self.reporter.error_at(&token, "Expect end of expression.");
            None
        }
    }

    /// Move the cursor back to the first token.
    pub fn reset(&mut self) {
        self.rewind(Checkpoint(0));
    }

    /// Number of diagnostics in the sink so far, including earlier stages.
    pub fn diagnostic_count(&self) -> usize {
        self.reporter.diagnostics().len()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.pos)
    }

    pub fn rewind(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.0.min(self.tokens.len() - 1);
    }

    // ----- statements -----

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_kind(TokenKind::Fun) {
            self.function()
        } else if self.match_kind(TokenKind::Var) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::Return => self.return_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::If => self.if_statement(),
            TokenKind::Print => self.print_statement(PrintStyle::Value),
            TokenKind::PrintSexpr => self.print_statement(PrintStyle::Sexpr),
            TokenKind::Break | TokenKind::Continue => self.loop_control(),
            TokenKind::LeftBrace => {
                self.advance();
                Ok(Stmt::Block(self.block()?))
            }
            _ => self.expression_statement(),
        }
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.advance();
        let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.expression()?) };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    /// `for` has no node of its own; it becomes
    /// `{ init; while (cond) { body; increment; } }`.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.advance(); // for
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(TokenKind::Semicolon) {
            None
        } else if self.match_kind(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition =
            if self.check(TokenKind::Semicolon) { None } else { Some(self.expression()?) };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment =
            if self.check(TokenKind::RightParen) { None } else { Some(self.expression()?) };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        let has_increment = increment.is_some();
        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal(LiteralValue::Bool(true)));
        body = Stmt::While { condition, body: Box::new(body), has_increment };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.advance(); // while
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after while condition.")?;
        let body = self.statement()?;
        Ok(Stmt::While { condition, body: Box::new(body), has_increment: false })
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.advance(); // if
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If { condition, then_branch, else_branch })
    }

    fn print_statement(&mut self, style: PrintStyle) -> ParseResult<Stmt> {
        self.advance(); // print / printSexpr
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::PrintExpr { style, expr })
    }

    fn loop_control(&mut self) -> ParseResult<Stmt> {
        let keyword = self.advance();
        let message = format!("Expect ';' after '{}'.", keyword.lexeme);
        self.consume(TokenKind::Semicolon, &message)?;
        Ok(Stmt::LoopControl { keyword })
    }

    /// Statements up to the closing brace; the opening brace is already consumed.
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(stmts)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn function(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect function name.")?;
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.check_parameter_count(&params);

        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.")?;
        let body = self.block()?;

        Ok(Stmt::Function { name, lambda: Rc::new(Lambda { params, body }) })
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;
        let initializer =
            if self.match_kind(TokenKind::Equal) { Some(self.expression()?) } else { None };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    // ----- expressions -----

    fn expression(&mut self) -> ParseResult<Expr> {
        self.comma()
    }

    fn comma(&mut self) -> ParseResult<Expr> {
        let mut expr = self.assignment()?;
        while self.match_kind(TokenKind::Comma) {
            let operator = self.previous().clone();
            let right = self.assignment()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    /// Also the grammar for call arguments and expression-bodied lambdas,
    /// which must not swallow commas.
    fn assignment(&mut self) -> ParseResult<Expr> {
        if let Some(lambda) = self.lambda()? {
            return Ok(lambda);
        }

        let expr = self.or()?;

        if self.match_kind(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::assign(name, value)),
                _ => {
                    self.reporter.error_at(&equals, "Invalid assignment target.");
                    Ok(value)
                }
            };
        }

        Ok(expr)
    }

    /// Returns `Ok(None)` with the cursor untouched when the upcoming tokens
    /// are not a lambda head.
    fn lambda(&mut self) -> ParseResult<Option<Expr>> {
        let checkpoint = self.checkpoint();
        let Some(params) = self.lambda_params() else {
            self.rewind(checkpoint);
            return Ok(None);
        };
        let arrow = self.previous().clone();
        self.check_parameter_count(&params);

        let body = if self.match_kind(TokenKind::LeftBrace) {
            self.block()?
        } else {
            let value = self.assignment()?;
            vec![Stmt::Return { keyword: arrow, value: Some(value) }]
        };

        Ok(Some(Expr::Lambda(Rc::new(Lambda { params, body }))))
    }

    /// `x =>` or `(a, b) =>`. Never reports; the caller rewinds on `None`.
    fn lambda_params(&mut self) -> Option<Vec<Token>> {
        let mut params = Vec::new();

        if self.match_kind(TokenKind::LeftParen) {
            if !self.check(TokenKind::RightParen) {
                loop {
                    if !self.check(TokenKind::Identifier) {
                        return None;
                    }
                    params.push(self.advance());
                    if !self.match_kind(TokenKind::Comma) {
                        break;
                    }
                }
            }
            if !self.match_kind(TokenKind::RightParen) {
                return None;
            }
        } else if self.check(TokenKind::Identifier) {
            params.push(self.advance());
        } else {
            return None;
        }

        self.match_kind(TokenKind::EqualGreater).then_some(params)
    }

    fn check_parameter_count(&mut self, params: &[Token]) {
        if let Some(extra) = params.get(MAX_ARGUMENTS) {
            self.reporter.error_at(extra, "Can't have more than 255 parameters.");
        }
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.match_kind(TokenKind::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::logical(expr, operator, right);
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.ternary_right()?;
        while self.match_kind(TokenKind::And) {
            let operator = self.previous().clone();
            let right = self.ternary_right()?;
            expr = Expr::logical(expr, operator, right);
        }
        Ok(expr)
    }

    /// `c ? a : b`; chains nest into the else position.
    fn ternary_right(&mut self) -> ParseResult<Expr> {
        let expr = self.ternary_left()?;
        if self.match_kind(TokenKind::Question) {
            let then_branch = self.ternary_left()?;
            self.consume(TokenKind::Colon, "Expect ':' after then branch of conditional.")?;
            let else_branch = self.ternary_right()?;
            return Ok(Expr::ternary(expr, then_branch, else_branch));
        }
        Ok(expr)
    }

    /// `c ?. a : b`; chains nest into the condition position.
    fn ternary_left(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_kind(TokenKind::QuestionDot) {
            let then_branch = self.equality()?;
            self.consume(TokenKind::Colon, "Expect ':' after then branch of conditional.")?;
            let else_branch = self.equality()?;
            expr = Expr::ternary(expr, then_branch, else_branch);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::BangEqual, TokenKind::EqualEqual], Self::comparison)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[TokenKind::Greater, TokenKind::GreaterEqual, TokenKind::Less, TokenKind::LessEqual],
            Self::term,
        )
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::Minus, TokenKind::Plus], Self::factor)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::Slash, TokenKind::Star], Self::unary)
    }

    /// Left-associative chain of `operand (op operand)*`.
    fn binary_level(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut expr = operand(self)?;
        while operators.contains(&self.peek().kind) {
            let operator = self.advance();
            let right = operand(self)?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if matches!(self.peek().kind, TokenKind::Bang | TokenKind::Minus) {
            let operator = self.advance();
            let operand = self.unary()?;
            return Ok(Expr::Unary { operator, operand: Box::new(operand) });
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        while self.match_kind(TokenKind::LeftParen) {
            expr = self.finish_call(expr)?;
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if arguments.len() == MAX_ARGUMENTS {
                    let token = self.peek().clone();
                    self.reporter.error_at(&token, "Can't have more than 255 arguments.");
                }
                arguments.push(self.assignment()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call { callee: Box::new(callee), paren, arguments })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let expr = match token.kind {
            TokenKind::False => Expr::Literal(LiteralValue::Bool(false)),
            TokenKind::True => Expr::Literal(LiteralValue::Bool(true)),
            TokenKind::Nil => Expr::Literal(LiteralValue::Nil),
            TokenKind::Number | TokenKind::String => {
                let value = token.literal.as_ref().map_or(LiteralValue::Nil, LiteralValue::from);
                Expr::Literal(value)
            }
            TokenKind::Identifier => Expr::variable(token),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::Grouping(Box::new(inner)));
            }
            _ => return Err(self.error(&token, "Expect expression.")),
        };
        self.advance();
        Ok(expr)
    }

    // ----- token cursor -----

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let token = self.peek().clone();
        Err(self.error(&token, message))
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consume and return the current token; the cursor never moves past `Eof`.
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn error(&mut self, token: &Token, message: &str) -> ParseError {
        self.reporter.error_at(token, message);
        ParseError
    }

    /// Discard tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        tracing::debug!(line = self.peek().line, "parser synchronizing after error");
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::PrintSexpr
                | TokenKind::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}
