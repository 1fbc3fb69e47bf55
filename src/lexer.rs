// File: src/lexer.rs
//
// Lexical analyzer (tokenizer) for the loxwalk language.
// Converts source code text into a stream of tokens for parsing.
//
// Supports:
// - Keywords: and, break, class, continue, else, false, for, fun, if, nil, or,
//   print, printSexpr, return, super, this, true, var, while
// - Identifiers, numbers (digits with optional fraction) and raw strings
// - Operators: ! != = == => < <= > >= ? ?. + - * / and punctuation ( ) { } , . : ;
// - Line comments (//) and nested block comments (/* /* */ */)
//
// Bad characters are reported and skipped; scanning always reaches the end.

use crate::errors::Reporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Colon,
    Semicolon,
    Slash,
    Star,
    Question,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    EqualGreater,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    QuestionDot,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Break,
    Class,
    Continue,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    PrintSexpr,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Eof,
}

/// Decoded value carried by number and string tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Token { kind, lexeme: lexeme.into(), literal: None, line }
    }
}

/// Full-identifier keyword lookup.
fn keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "and" => TokenKind::And,
        "break" => TokenKind::Break,
        "class" => TokenKind::Class,
        "continue" => TokenKind::Continue,
        "else" => TokenKind::Else,
        "false" => TokenKind::False,
        "for" => TokenKind::For,
        "fun" => TokenKind::Fun,
        "if" => TokenKind::If,
        "nil" => TokenKind::Nil,
        "or" => TokenKind::Or,
        "print" => TokenKind::Print,
        "printSexpr" => TokenKind::PrintSexpr,
        "return" => TokenKind::Return,
        "super" => TokenKind::Super,
        "this" => TokenKind::This,
        "true" => TokenKind::True,
        "var" => TokenKind::Var,
        "while" => TokenKind::While,
        _ => return None,
    };
    Some(kind)
}

struct Lexer<'r> {
    chars: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    reporter: &'r mut Reporter,
}

impl<'r> Lexer<'r> {
    fn new(source: &str, reporter: &'r mut Reporter) -> Self {
        Lexer {
            chars: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            reporter,
        }
    }

    fn run(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens.push(Token::new(TokenKind::Eof, "", self.line));
        self.tokens
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            ',' => self.add_token(TokenKind::Comma),
            '.' => self.add_token(TokenKind::Dot),
            '-' => self.add_token(TokenKind::Minus),
            '+' => self.add_token(TokenKind::Plus),
            ':' => self.add_token(TokenKind::Colon),
            ';' => self.add_token(TokenKind::Semicolon),
            '*' => self.add_token(TokenKind::Star),
            '!' => {
                let kind = if self.match_char('=') { TokenKind::BangEqual } else { TokenKind::Bang };
                self.add_token(kind);
            }
            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::EqualEqual
                } else if self.match_char('>') {
                    TokenKind::EqualGreater
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.match_char('=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.add_token(kind);
            }
            '>' => {
                let kind =
                    if self.match_char('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.add_token(kind);
            }
            '?' => {
                let kind =
                    if self.match_char('.') { TokenKind::QuestionDot } else { TokenKind::Question };
                self.add_token(kind);
            }
            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_char('*') {
                    let opened_at = self.line;
                    if !self.block_comment() {
                        self.reporter.error(opened_at, "Unterminated block comment.");
                    }
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            ' ' | '\t' | '\r' => {}
            '\n' => self.line += 1,
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if is_alpha(c) => self.identifier(),
            other => {
                self.reporter.error(self.line, format!("Unexpected character, '{}'.", other));
            }
        }
    }

    /// Scans the body of a block comment whose `/*` was already consumed.
    /// Nested comments recurse. Returns false when input ends first.
    fn block_comment(&mut self) -> bool {
        while !self.is_at_end() {
            match (self.peek(), self.peek_next()) {
                ('/', '*') => {
                    self.current += 2;
                    if !self.block_comment() {
                        return false;
                    }
                }
                ('*', '/') => {
                    self.current += 2;
                    return true;
                }
                (c, _) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    self.current += 1;
                }
            }
        }
        false
    }

    fn string(&mut self) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.reporter.error(self.line, "Unterminated string.");
            return;
        }

        self.advance(); // closing quote
        let value: String = self.chars[self.start + 1..self.current - 1].iter().collect();
        self.add_literal(TokenKind::String, Literal::Str(value));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.lexeme();
        match text.parse::<f64>() {
            Ok(value) => self.add_literal(TokenKind::Number, Literal::Number(value)),
            Err(_) => self.reporter.error(self.line, format!("Invalid number literal '{}'.", text)),
        }
    }

    fn identifier(&mut self) {
        while is_alpha(self.peek()) || self.peek().is_ascii_digit() {
            self.advance();
        }
        let kind = keyword(&self.lexeme()).unwrap_or(TokenKind::Identifier);
        self.add_token(kind);
    }

    fn lexeme(&self) -> String {
        self.chars[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, kind: TokenKind) {
        let token = Token::new(kind, self.lexeme(), self.line);
        self.tokens.push(token);
    }

    fn add_literal(&mut self, kind: TokenKind, literal: Literal) {
        let mut token = Token::new(kind, self.lexeme(), self.line);
        token.literal = Some(literal);
        self.tokens.push(token);
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() != expected || self.is_at_end() {
            return false;
        }
        self.current += 1;
        true
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        self.chars.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Tokenizes loxwalk source code into a vector of tokens.
///
/// Processes the input left to right in a single pass. Newlines only bump the
/// line counter; comments and whitespace never produce tokens. Problems are
/// reported to `reporter` and scanning continues.
///
/// # Arguments
/// * `source` - The program text
/// * `reporter` - Diagnostic sink for lexical errors
///
/// # Returns
/// The tokens in source order, always terminated by a single `Eof` token
pub fn tokenize(source: &str, reporter: &mut Reporter) -> Vec<Token> {
    let tokens = Lexer::new(source, reporter).run();
    tracing::trace!(count = tokens.len(), "tokenized source");
    tokens
}
