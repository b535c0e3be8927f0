//! Lexer: tokenizes vibescript source
//!
//! Produces a token stream for the parser. Each token remembers whether a
//! line break preceded it; the parser uses that to end statements that
//! have no semicolon.

use crate::error::{SyntaxError, SyntaxResult};

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw text, or the decoded value for string literals
    pub text: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub col: usize,
    /// A line break separates this token from the previous one
    pub newline_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            col,
            newline_before: false,
        }
    }
}

/// Token types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Fn,
    Let,
    If,
    Else,
    While,
    For,
    In,
    Break,
    Continue,
    Return,
    True,
    False,
    Nil,
    And,
    Or,
    Not,

    // Identifiers and literals
    Identifier,
    IntLiteral,
    FloatLiteral,
    StringLiteral,

    // Structural
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,
    Question,
    Pipe,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    EqEq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AndAnd,
    OrOr,
    Bang,

    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Fn => "fn",
            Self::Let => "let",
            Self::If => "if",
            Self::Else => "else",
            Self::While => "while",
            Self::For => "for",
            Self::In => "in",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Return => "return",
            Self::True => "true",
            Self::False => "false",
            Self::Nil => "nil",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Identifier => "identifier",
            Self::IntLiteral => "integer",
            Self::FloatLiteral => "float",
            Self::StringLiteral => "string literal",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::OpenBrace => "{",
            Self::CloseBrace => "}",
            Self::OpenBracket => "[",
            Self::CloseBracket => "]",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Dot => ".",
            Self::Arrow => "->",
            Self::Question => "?",
            Self::Pipe => "|",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Assign => "=",
            Self::PlusAssign => "+=",
            Self::MinusAssign => "-=",
            Self::StarAssign => "*=",
            Self::SlashAssign => "/=",
            Self::PercentAssign => "%=",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
            Self::Eof => "end of input",
        };
        f.write_str(text)
    }
}

fn keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "fn" => TokenKind::Fn,
        "let" => TokenKind::Let,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "nil" => TokenKind::Nil,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        _ => return None,
    };
    Some(kind)
}

/// Lexer for vibescript
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> SyntaxResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let newline_before = self.skip_whitespace_and_comments()?;

            if self.pos >= self.input.len() {
                let mut eof = Token::new(TokenKind::Eof, "", self.line, self.col);
                eof.newline_before = true;
                tokens.push(eof);
                break;
            }

            let mut token = self.next_token()?;
            token.newline_before = newline_before;
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> SyntaxResult<Token> {
        let ch = self.input[self.pos];
        let line = self.line;
        let col = self.col;

        let single = |kind: TokenKind| Token::new(kind, ch.to_string(), line, col);

        let token = match ch {
            '(' => single(TokenKind::OpenParen),
            ')' => single(TokenKind::CloseParen),
            '{' => single(TokenKind::OpenBrace),
            '}' => single(TokenKind::CloseBrace),
            '[' => single(TokenKind::OpenBracket),
            ']' => single(TokenKind::CloseBracket),
            ',' => single(TokenKind::Comma),
            ':' => single(TokenKind::Colon),
            ';' => single(TokenKind::Semicolon),
            '.' => single(TokenKind::Dot),
            '?' => single(TokenKind::Question),
            '"' | '\'' => return self.read_string_literal(ch),
            c if c.is_ascii_digit() => return self.read_number(),
            c if c.is_alphabetic() || c == '_' => return Ok(self.read_identifier_or_keyword()),
            '-' if self.peek_at(1) == Some('>') => return Ok(self.two(TokenKind::Arrow, "->")),
            '+' | '-' | '*' | '/' | '%' | '=' | '!' | '<' | '>' if self.peek_at(1) == Some('=') => {
                let kind = match ch {
                    '+' => TokenKind::PlusAssign,
                    '-' => TokenKind::MinusAssign,
                    '*' => TokenKind::StarAssign,
                    '/' => TokenKind::SlashAssign,
                    '%' => TokenKind::PercentAssign,
                    '=' => TokenKind::EqEq,
                    '!' => TokenKind::NotEq,
                    '<' => TokenKind::LessEq,
                    _ => TokenKind::GreaterEq,
                };
                return Ok(self.two(kind, format!("{ch}=")));
            }
            '&' if self.peek_at(1) == Some('&') => return Ok(self.two(TokenKind::AndAnd, "&&")),
            '|' if self.peek_at(1) == Some('|') => return Ok(self.two(TokenKind::OrOr, "||")),
            '|' => single(TokenKind::Pipe),
            '+' => single(TokenKind::Plus),
            '-' => single(TokenKind::Minus),
            '*' => single(TokenKind::Star),
            '/' => single(TokenKind::Slash),
            '%' => single(TokenKind::Percent),
            '=' => single(TokenKind::Assign),
            '!' => single(TokenKind::Bang),
            '<' => single(TokenKind::Less),
            '>' => single(TokenKind::Greater),
            _ => {
                return Err(SyntaxError::new(
                    line,
                    col,
                    format!("unexpected character '{ch}'"),
                ))
            }
        };

        self.advance();
        Ok(token)
    }

    fn two(&mut self, kind: TokenKind, text: impl Into<String>) -> Token {
        let token = Token::new(kind, text, self.line, self.col);
        self.advance();
        self.advance();
        token
    }

    fn read_string_literal(&mut self, quote: char) -> SyntaxResult<Token> {
        let line = self.line;
        let col = self.col;
        self.advance(); // opening quote

        let mut text = String::new();
        loop {
            let Some(ch) = self.current() else {
                return Err(SyntaxError::new(line, col, "unterminated string literal"));
            };
            if ch == quote {
                self.advance();
                break;
            }
            if ch == '\\' {
                let escape_line = self.line;
                let escape_col = self.col;
                self.advance();
                let escaped = match self.current() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some('0') => '\0',
                    Some('\\') => '\\',
                    Some('"') => '"',
                    Some('\'') => '\'',
                    Some(other) => {
                        return Err(SyntaxError::new(
                            escape_line,
                            escape_col,
                            format!("unknown escape sequence '\\{other}'"),
                        ))
                    }
                    None => return Err(SyntaxError::new(line, col, "unterminated string literal")),
                };
                text.push(escaped);
            } else {
                text.push(ch);
            }
            self.advance();
        }

        Ok(Token::new(TokenKind::StringLiteral, text, line, col))
    }

    fn read_number(&mut self) -> SyntaxResult<Token> {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();
        let mut is_float = false;

        self.read_digits(&mut text);

        if self.current() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }

        if matches!(self.current(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if sign {
                    if let Some(c) = self.current() {
                        text.push(c);
                    }
                    self.advance();
                }
                self.read_digits(&mut text);
            }
        }

        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        Ok(Token::new(kind, text, line, col))
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c != '_' {
                break;
            }
            self.advance();
        }
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();

        while let Some(c) = self.current() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = keyword(&text).unwrap_or(TokenKind::Identifier);
        Token::new(kind, text, line, col)
    }

    /// Returns whether a line break was skipped.
    fn skip_whitespace_and_comments(&mut self) -> SyntaxResult<bool> {
        let mut newline = false;
        while let Some(ch) = self.current() {
            if ch == '\n' {
                newline = true;
                self.advance();
            } else if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' || (ch == '/' && self.peek_at(1) == Some('/')) {
                while self.current().is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else if ch == '/' && self.peek_at(1) == Some('*') {
                let line = self.line;
                let col = self.col;
                self.advance();
                self.advance();
                loop {
                    match self.current() {
                        None => return Err(SyntaxError::new(line, col, "unterminated block comment")),
                        Some('*') if self.peek_at(1) == Some('/') => {
                            self.advance();
                            self.advance();
                            break;
                        }
                        Some(c) => {
                            newline |= c == '\n';
                            self.advance();
                        }
                    }
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(&ch) = self.input.get(self.pos) {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }
}
