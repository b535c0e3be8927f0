//! Parser: recursive descent parser for vibescript
//!
//! Consumes tokens from the lexer and produces a [`Program`]. Type
//! annotations are accepted anywhere a parameter, binding or return type may
//! appear and are discarded.

use std::sync::Arc;

use crate::ast::{BinaryOp, Expr, FunctionDef, Item, LogicalOp, Param, Program, Stmt, UnaryOp};
use crate::error::{SyntaxError, SyntaxResult};
use crate::lexer::{Lexer, Token, TokenKind};

/// Nesting limit for blocks and expressions.
const MAX_NESTING: usize = 64;

/// Parser for vibescript
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

impl Parser {
    /// Parse a whole source file.
    pub fn parse(input: &str) -> SyntaxResult<Program> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Self {
            tokens,
            pos: 0,
            nesting: 0,
        };
        parser.parse_program()
    }

    fn parse_program(&mut self) -> SyntaxResult<Program> {
        let mut items = Vec::new();

        while !self.check(TokenKind::Eof) {
            match self.peek_kind() {
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Fn => {
                    self.advance();
                    items.push(Item::Function(self.parse_function()?));
                }
                TokenKind::Let => {
                    let line = self.peek().line;
                    self.advance();
                    let (name, value) = self.parse_let_rest()?;
                    self.end_statement()?;
                    items.push(Item::Let { name, value, line });
                }
                _ => {
                    let tok = self.peek();
                    return Err(SyntaxError::new(
                        tok.line,
                        tok.col,
                        format!(
                            "only 'fn' and 'let' are allowed at the top level, found '{}'",
                            tok.text
                        ),
                    ));
                }
            }
        }

        Ok(Program { items })
    }

    /// After `fn`: `name(params) [-> Type] { body }`
    fn parse_function(&mut self) -> SyntaxResult<Arc<FunctionDef>> {
        let line = self.peek().line;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::OpenParen)?;

        let mut params: Vec<Param> = Vec::new();
        while !self.check(TokenKind::CloseParen) {
            let tok = self.peek().clone();
            let param_name = self.expect_identifier()?;
            if params.iter().any(|p| p.name == param_name) {
                return Err(SyntaxError::new(
                    tok.line,
                    tok.col,
                    format!("duplicate parameter '{param_name}'"),
                ));
            }
            if self.eat(TokenKind::Colon) {
                self.skip_type(&[TokenKind::Comma, TokenKind::CloseParen, TokenKind::Assign])?;
            }
            let default = if self.eat(TokenKind::Assign) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            if default.is_none() && params.iter().any(|p| p.default.is_some()) {
                return Err(SyntaxError::new(
                    tok.line,
                    tok.col,
                    format!("required parameter '{param_name}' follows a parameter with a default"),
                ));
            }
            params.push(Param {
                name: param_name,
                default,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;

        if self.eat(TokenKind::Arrow) {
            self.skip_type(&[TokenKind::OpenBrace])?;
        }

        let body = self.parse_block()?;
        Ok(Arc::new(FunctionDef {
            name,
            params,
            body,
            line,
        }))
    }

    /// After `let`: `name [: Type] = expr`
    fn parse_let_rest(&mut self) -> SyntaxResult<(String, Expr)> {
        let name = self.expect_identifier()?;
        if self.eat(TokenKind::Colon) {
            self.skip_type(&[TokenKind::Assign])?;
        }
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expression()?;
        Ok((name, value))
    }

    /// Discard a type annotation up to one of `stops` at bracket depth zero.
    fn skip_type(&mut self, stops: &[TokenKind]) -> SyntaxResult<()> {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            let kind = self.peek_kind();
            if kind == TokenKind::Eof {
                let tok = self.peek();
                return Err(SyntaxError::new(tok.line, tok.col, "unterminated type annotation"));
            }
            if depth == 0 && stops.contains(&kind) {
                break;
            }
            match kind {
                TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::Less | TokenKind::OpenBrace => {
                    depth += 1
                }
                TokenKind::CloseParen
                | TokenKind::CloseBracket
                | TokenKind::Greater
                | TokenKind::CloseBrace => {
                    if depth == 0 {
                        let tok = self.peek();
                        return Err(SyntaxError::new(
                            tok.line,
                            tok.col,
                            format!("unexpected '{}' in type annotation", tok.text),
                        ));
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.advance();
        }

        if self.pos == start {
            let tok = self.peek();
            return Err(SyntaxError::new(tok.line, tok.col, "expected a type"));
        }
        Ok(())
    }

    fn parse_block(&mut self) -> SyntaxResult<Vec<Stmt>> {
        self.enter()?;
        self.expect(TokenKind::OpenBrace)?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::CloseBrace) && !self.check(TokenKind::Eof) {
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::CloseBrace)?;
        self.leave();
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> SyntaxResult<Stmt> {
        match self.peek_kind() {
            TokenKind::Let => {
                self.advance();
                let (name, value) = self.parse_let_rest()?;
                self.end_statement()?;
                Ok(Stmt::Let { name, value })
            }
            TokenKind::If => {
                self.advance();
                self.parse_if()
            }
            TokenKind::While => {
                self.advance();
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                Ok(Stmt::While { condition, body })
            }
            TokenKind::For => {
                self.advance();
                let var = self.expect_identifier()?;
                self.expect(TokenKind::In)?;
                let iterable = self.parse_expression()?;
                let body = self.parse_block()?;
                Ok(Stmt::For {
                    var,
                    iterable,
                    body,
                })
            }
            TokenKind::Fn => {
                self.advance();
                Ok(Stmt::Function(self.parse_function()?))
            }
            TokenKind::Break => {
                self.advance();
                self.end_statement()?;
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.end_statement()?;
                Ok(Stmt::Continue)
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.end_statement()?;
                Ok(Stmt::Return(value))
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// After `if`.
    fn parse_if(&mut self) -> SyntaxResult<Stmt> {
        let mut branches = Vec::new();
        let mut otherwise = None;

        loop {
            let condition = self.parse_expression()?;
            let body = self.parse_block()?;
            branches.push((condition, body));

            if !self.eat(TokenKind::Else) {
                break;
            }
            if self.eat(TokenKind::If) {
                continue;
            }
            otherwise = Some(self.parse_block()?);
            break;
        }

        Ok(Stmt::If {
            branches,
            otherwise,
        })
    }

    fn parse_expression_statement(&mut self) -> SyntaxResult<Stmt> {
        let start = self.peek().clone();
        let expr = self.parse_expression()?;

        let op = match self.peek_kind() {
            TokenKind::Assign => Some(None),
            TokenKind::PlusAssign => Some(Some(BinaryOp::Add)),
            TokenKind::MinusAssign => Some(Some(BinaryOp::Sub)),
            TokenKind::StarAssign => Some(Some(BinaryOp::Mul)),
            TokenKind::SlashAssign => Some(Some(BinaryOp::Div)),
            TokenKind::PercentAssign => Some(Some(BinaryOp::Rem)),
            _ => None,
        };

        let stmt = match op {
            Some(op) => {
                if !matches!(expr, Expr::Name(_) | Expr::Index { .. } | Expr::Field { .. }) {
                    return Err(SyntaxError::new(
                        start.line,
                        start.col,
                        "invalid assignment target",
                    ));
                }
                self.advance();
                let value = self.parse_expression()?;
                Stmt::Assign {
                    target: expr,
                    op,
                    value,
                }
            }
            None => Stmt::Expr(expr),
        };

        self.end_statement()?;
        Ok(stmt)
    }

    fn at_statement_end(&self) -> bool {
        let tok = self.peek();
        tok.newline_before
            || matches!(
                tok.kind,
                TokenKind::Semicolon | TokenKind::CloseBrace | TokenKind::Eof
            )
    }

    /// A simple statement ends at `;`, a line break, `}` or end of input.
    fn end_statement(&mut self) -> SyntaxResult<()> {
        if self.eat(TokenKind::Semicolon) || self.at_statement_end() {
            return Ok(());
        }
        let tok = self.peek();
        Err(SyntaxError::new(
            tok.line,
            tok.col,
            format!("expected ';' or a line break, found '{}'", tok.text),
        ))
    }

    pub(crate) fn parse_expression(&mut self) -> SyntaxResult<Expr> {
        self.enter()?;
        let expr = self.parse_or()?;
        self.leave();
        Ok(expr)
    }

    fn parse_or(&mut self) -> SyntaxResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::OrOr) || self.eat(TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> SyntaxResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(TokenKind::AndAnd) || self.eat(TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Keyword `not` binds looser than comparisons: `not a == b` is `not (a == b)`.
    fn parse_not(&mut self) -> SyntaxResult<Expr> {
        if self.eat(TokenKind::Not) {
            self.enter()?;
            let operand = self.parse_not()?;
            self.leave();
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> SyntaxResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEq => BinaryOp::LessEq,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEq => BinaryOp::GreaterEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> SyntaxResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> SyntaxResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> SyntaxResult<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();

        // Fold `-<int>` so that i64::MIN is writable.
        if op == UnaryOp::Neg && self.check(TokenKind::IntLiteral) {
            let tok = self.advance().clone();
            let value = format!("-{}", tok.text).parse::<i64>().map_err(|_| {
                SyntaxError::new(tok.line, tok.col, format!("integer literal out of range: -{}", tok.text))
            })?;
            return self.parse_postfix_from(Expr::Int(value));
        }

        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> SyntaxResult<Expr> {
        let primary = self.parse_primary()?;
        self.parse_postfix_from(primary)
    }

    fn parse_postfix_from(&mut self, mut expr: Expr) -> SyntaxResult<Expr> {
        loop {
            let tok = self.peek();
            match tok.kind {
                // Calls and indexing do not continue across a line break.
                TokenKind::OpenParen if !tok.newline_before => {
                    self.advance();
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                TokenKind::OpenBracket if !tok.newline_before => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::CloseBracket)?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    if self.check(TokenKind::OpenParen) && !self.peek().newline_before {
                        self.advance();
                        let args = self.parse_arguments()?;
                        expr = Expr::MethodCall {
                            receiver: Box::new(expr),
                            method: name,
                            args,
                        };
                    } else {
                        expr = Expr::Field {
                            target: Box::new(expr),
                            name,
                        };
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// After `(`: comma separated expressions, trailing comma allowed.
    fn parse_arguments(&mut self) -> SyntaxResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check(TokenKind::CloseParen) {
            args.push(self.parse_expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> SyntaxResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::Nil)
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::IntLiteral => {
                self.advance();
                tok.text.parse::<i64>().map(Expr::Int).map_err(|_| {
                    SyntaxError::new(
                        tok.line,
                        tok.col,
                        format!("integer literal out of range: {}", tok.text),
                    )
                })
            }
            TokenKind::FloatLiteral => {
                self.advance();
                tok.text.parse::<f64>().map(Expr::Float).map_err(|_| {
                    SyntaxError::new(tok.line, tok.col, format!("invalid float literal: {}", tok.text))
                })
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expr::Str(tok.text))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::Name(tok.text))
            }
            TokenKind::OpenParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(expr)
            }
            TokenKind::OpenBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(TokenKind::CloseBracket) {
                    elements.push(self.parse_expression()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::CloseBracket)?;
                Ok(Expr::List(elements))
            }
            TokenKind::OpenBrace => {
                self.advance();
                self.parse_map_rest()
            }
            TokenKind::Eof => Err(SyntaxError::new(
                tok.line,
                tok.col,
                "expected an expression, found end of input",
            )),
            _ => Err(SyntaxError::new(
                tok.line,
                tok.col,
                format!("expected an expression, found '{}'", tok.text),
            )),
        }
    }

    /// After `{` in expression position. Bare identifier keys are strings.
    fn parse_map_rest(&mut self) -> SyntaxResult<Expr> {
        let mut entries = Vec::new();
        while !self.check(TokenKind::CloseBrace) {
            let key = if self.check(TokenKind::Identifier)
                && self.peek_kind_at(1) == TokenKind::Colon
            {
                Expr::Str(self.advance().text.clone())
            } else {
                self.parse_expression()?
            };
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseBrace)?;
        Ok(Expr::Map(entries))
    }

    fn enter(&mut self) -> SyntaxResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            let tok = self.peek();
            return Err(SyntaxError::new(tok.line, tok.col, "nesting too deep"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    // Helpers

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn expect(&mut self, kind: TokenKind) -> SyntaxResult<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let tok = self.peek();
        let found = if tok.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", tok.text)
        };
        Err(SyntaxError::new(
            tok.line,
            tok.col,
            format!("expected '{kind}', found {found}"),
        ))
    }

    fn expect_identifier(&mut self) -> SyntaxResult<String> {
        let tok = self.expect(TokenKind::Identifier)?;
        Ok(tok.text.clone())
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIB: &str = r#"
fn fib(n: int) -> int {
    if n < 2 { return n }
    let a = 0; let b = 1
    for i in range(1, n) {
        let next = a + b
        a = b
        b = next
    }
    return b
}
"#;

    #[test]
    fn parse_function() {
        let program = Parser::parse(FIB).unwrap();
        assert_eq!(program.items.len(), 1);
        let def = program.function("fib").unwrap();
        assert_eq!(def.params.len(), 1);
        assert_eq!(def.params[0].name, "n");
        assert_eq!(def.required_arity(), 1);
        assert_eq!(def.body.len(), 5);
        assert_eq!(def.line, 2);
    }

    #[test]
    fn parse_defaults_and_annotations() {
        let program = Parser::parse(
            r#"fn greet(name: str, greeting: Optional[str] = "Hello", punct: Dict<str, int> = nil) -> str {
                return greeting + ", " + name
            }"#,
        )
        .unwrap();
        let def = program.function("greet").unwrap();
        assert_eq!(def.required_arity(), 1);
        assert_eq!(def.max_arity(), 3);
        assert_eq!(def.params[1].default, Some(Expr::Str("Hello".into())));
    }

    #[test]
    fn top_level_let() {
        let program = Parser::parse("let LIMIT: int = 10\nfn f() { return LIMIT }").unwrap();
        assert_eq!(program.binding_names(), vec!["LIMIT", "f"]);
    }

    #[test]
    fn precedence() {
        let program = Parser::parse("let x = 1 + 2 * 3 == 7 and not false").unwrap();
        let Item::Let { value, .. } = &program.items[0] else {
            panic!("expected let");
        };
        let Expr::Logical { op, left, .. } = value else {
            panic!("expected logical, got {value:?}");
        };
        assert_eq!(*op, LogicalOp::And);
        assert!(matches!(**left, Expr::Binary { op: BinaryOp::Eq, .. }));
    }

    #[test]
    fn negative_literal_folds() {
        let program = Parser::parse("let m = -9223372036854775808").unwrap();
        assert!(matches!(
            &program.items[0],
            Item::Let { value: Expr::Int(i64::MIN), .. }
        ));
    }

    #[test]
    fn method_calls_and_maps() {
        let program = Parser::parse(
            "fn f(xs) {\n let m = {name: \"a\", \"count\": 2}\n xs.push(m.count)\n return xs[-1]\n}",
        )
        .unwrap();
        let def = program.function("f").unwrap();
        assert!(matches!(&def.body[1], Stmt::Expr(Expr::MethodCall { method, .. }) if method == "push"));
        assert!(matches!(&def.body[0], Stmt::Let { value: Expr::Map(entries), .. } if entries.len() == 2));
    }

    #[test]
    fn compound_assignment_targets() {
        let program = Parser::parse("fn f(m) { m[\"k\"] += 1; m.total -= 2; x *= 3 }").unwrap();
        let def = program.function("f").unwrap();
        assert_eq!(def.body.len(), 3);
        assert!(matches!(&def.body[0], Stmt::Assign { op: Some(BinaryOp::Add), target: Expr::Index { .. }, .. }));
        assert!(matches!(&def.body[1], Stmt::Assign { op: Some(BinaryOp::Sub), target: Expr::Field { .. }, .. }));
    }

    #[test]
    fn bare_return_before_brace_or_newline() {
        let program = Parser::parse("fn f(x) {\n if x { return }\n return\n}").unwrap();
        let def = program.function("f").unwrap();
        assert_eq!(def.body[1], Stmt::Return(None));
    }

    #[test]
    fn else_if_chain() {
        let program = Parser::parse(
            "fn sign(n) { if n < 0 { return -1 } else if n == 0 { return 0 } else { return 1 } }",
        )
        .unwrap();
        let def = program.function("sign").unwrap();
        let Stmt::If { branches, otherwise } = &def.body[0] else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 2);
        assert!(otherwise.is_some());
    }

    #[test]
    fn syntax_errors_have_positions() {
        let err = Parser::parse("fn f() {\n  return 1 +\n}").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("expected an expression"));

        let err = Parser::parse("fn f() { return 1 2 }").unwrap_err();
        assert!(err.message.contains("expected ';'"));

        let err = Parser::parse("print(1)").unwrap_err();
        assert!(err.message.contains("top level"));

        let err = Parser::parse("fn f(a = 1, b) { }").unwrap_err();
        assert!(err.message.contains("follows a parameter with a default"));

        let err = Parser::parse("fn f() { 1 = 2 }").unwrap_err();
        assert_eq!(err.message, "invalid assignment target");
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let source = format!("let x = {}1{}", "(".repeat(500), ")".repeat(500));
        let err = Parser::parse(&source).unwrap_err();
        assert_eq!(err.message, "nesting too deep");
    }

    #[test]
    fn call_does_not_continue_across_newline() {
        let program = Parser::parse("fn f(g) {\n let a = g\n (1)\n}").unwrap();
        let def = program.function("f").unwrap();
        assert_eq!(def.body.len(), 2);
    }
}
