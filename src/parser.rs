use thiserror::Error;

use crate::ast::{BinaryOp, Block, Expr, ExprKind, Pos, Program, Stmt, StmtKind, UnaryOp};
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at {pos}: {message}")]
pub struct ParseError {
    pub message: String,
    pub pos: Pos,
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        if self.hint.is_none() {
            self.hint = Some(hint.into());
        }
        self
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    // Zero outside every block; function definitions are only legal at zero.
    block_depth: usize,
    in_function: bool,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens
            .last()
            .is_some_and(|token| matches!(token.kind, TokenKind::Eof))
        {
            tokens.push(Token::new(TokenKind::Eof, Pos::default()));
        }

        Self {
            tokens,
            cursor: 0,
            block_depth: 0,
            in_function: false,
        }
    }

    pub fn parse_program(mut self) -> Result<Program, Vec<ParseError>> {
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        loop {
            self.skip_newlines();
            if self.at_end() {
                break;
            }

            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    errors.push(err);
                    self.synchronize();
                }
            }
        }

        if errors.is_empty() {
            Ok(Program::new(statements))
        } else {
            Err(errors)
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current().kind {
            TokenKind::Def => self.parse_function_definition(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Indent => Err(ParseError::new("unexpected indent", self.current().pos)),
            _ => self.parse_assignment_or_expression_statement(),
        }
    }

    fn parse_function_definition(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        if self.block_depth > 0 {
            return Err(ParseError::new(
                "function definitions are only allowed at top level",
                keyword.pos,
            ));
        }

        let (name, _) = self.expect_ident("expected function name after 'def'")?;
        self.expect(
            |kind| matches!(kind, TokenKind::LParen),
            "expected '(' after function name",
        )?;

        let mut params = Vec::new();
        if !self.check(|kind| matches!(kind, TokenKind::RParen)) {
            loop {
                let (param, _) = self.expect_ident("expected parameter name")?;
                params.push(param);

                if self.check(|kind| matches!(kind, TokenKind::Comma)) {
                    self.advance();
                    continue;
                }
                break;
            }
        }

        self.expect(
            |kind| matches!(kind, TokenKind::RParen),
            "expected ')' after function parameters",
        )?;

        self.in_function = true;
        let body = self.parse_block("function definition");
        self.in_function = false;

        Ok(Stmt::new(
            StmtKind::FunctionDef {
                name,
                params,
                body: body?,
            },
            keyword.pos,
        ))
    }

    // Handles both `if` and `elif`: an elif chain desugars into nested
    // if-else statements.
    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        let then_branch = self.parse_block("if statement")?;

        let else_branch = if self.check(|kind| matches!(kind, TokenKind::Elif)) {
            Some(vec![self.parse_if_statement()?])
        } else if self.check(|kind| matches!(kind, TokenKind::Else)) {
            self.advance();
            Some(self.parse_block("else clause")?)
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            keyword.pos,
        ))
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        let body = self.parse_block("while statement")?;

        Ok(Stmt::new(StmtKind::While { condition, body }, keyword.pos))
    }

    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        let (name, _) = self.expect_ident("expected loop variable after 'for'")?;
        self.expect(
            |kind| matches!(kind, TokenKind::In),
            "expected 'in' after loop variable",
        )?;
        let iterable = self.parse_expression(Precedence::Lowest)?;
        let body = self.parse_block("for statement")?;

        Ok(Stmt::new(
            StmtKind::For {
                name,
                iterable,
                body,
            },
            keyword.pos,
        ))
    }

    fn parse_return_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        if !self.in_function {
            return Err(ParseError::new("'return' outside function", keyword.pos));
        }

        if self.check(|kind| matches!(kind, TokenKind::Newline)) {
            self.advance();
            return Ok(Stmt::new(StmtKind::Return(None), keyword.pos));
        }

        let value = self.parse_expression(Precedence::Lowest)?;
        self.expect_end_of_line()?;
        Ok(Stmt::new(StmtKind::Return(Some(value)), keyword.pos))
    }

    fn parse_assignment_or_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        let pos = expr.pos;

        if self.check(|kind| matches!(kind, TokenKind::Assign)) {
            if !matches!(expr.kind, ExprKind::Name(_) | ExprKind::Index { .. }) {
                return Err(ParseError::new("invalid assignment target", expr.pos)
                    .with_hint("only names and list elements can be assigned to"));
            }

            self.advance();
            let value = self.parse_expression(Precedence::Lowest)?;
            self.expect_end_of_line()?;
            return Ok(Stmt::new(
                StmtKind::Assign {
                    target: expr,
                    value,
                },
                pos,
            ));
        }

        self.expect_end_of_line()?;
        Ok(Stmt::new(StmtKind::Expr(expr), pos))
    }

    fn parse_block(&mut self, context: &'static str) -> Result<Block, ParseError> {
        self.expect(
            |kind| matches!(kind, TokenKind::Colon),
            "expected ':' to open a block",
        )?;
        self.expect(
            |kind| matches!(kind, TokenKind::Newline),
            "expected a new line after ':'",
        )?;
        let indent = self.expect(
            |kind| matches!(kind, TokenKind::Indent),
            "expected an indented block",
        );
        let indent = match indent {
            Ok(token) => token,
            Err(err) => return Err(err.with_hint(format!("the {context} body must be indented"))),
        };

        self.block_depth += 1;
        let mut statements = Vec::new();
        let result = loop {
            self.skip_newlines();
            if self.check(|kind| matches!(kind, TokenKind::Dedent)) {
                self.advance();
                break Ok(statements);
            }
            if self.at_end() {
                break Err(ParseError::new("unterminated block", indent.pos));
            }

            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => break Err(err),
            }
        };
        self.block_depth -= 1;

        result
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expr, ParseError> {
        let mut left = self.parse_prefix()?;

        while !self.at_end() && precedence < self.current_precedence() {
            let operator = self.advance();
            left = self.parse_infix(left, operator)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) => Ok(Expr::new(ExprKind::Name(name), token.pos)),
            TokenKind::Int(value) => Ok(Expr::new(ExprKind::Int(value), token.pos)),
            TokenKind::Str(value) => Ok(Expr::new(ExprKind::Str(value), token.pos)),
            TokenKind::True => Ok(Expr::new(ExprKind::Bool(true), token.pos)),
            TokenKind::False => Ok(Expr::new(ExprKind::Bool(false), token.pos)),
            TokenKind::NoneKw => Ok(Expr::new(ExprKind::NoneLiteral, token.pos)),
            TokenKind::Not => {
                let operand = self.parse_expression(Precedence::LogicalNot)?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    token.pos,
                ))
            }
            TokenKind::Minus => {
                let operand = self.parse_expression(Precedence::Prefix)?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    token.pos,
                ))
            }
            TokenKind::LParen => {
                let expr = self.parse_expression(Precedence::Lowest)?;
                self.expect(
                    |kind| matches!(kind, TokenKind::RParen),
                    "expected ')' after grouped expression",
                )?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_list_or_comprehension(token.pos),
            _ => Err(ParseError::new(
                format!(
                    "expected expression, found {}",
                    describe_token_kind(&token.kind)
                ),
                token.pos,
            )),
        }
    }

    fn parse_infix(&mut self, lhs: Expr, operator: Token) -> Result<Expr, ParseError> {
        if matches!(operator.kind, TokenKind::LBracket) {
            return self.parse_index_expression(lhs, operator.pos);
        }
        if matches!(operator.kind, TokenKind::LParen) {
            return self.parse_call_expression(lhs);
        }

        let (op, precedence) = match operator.kind {
            TokenKind::Or => (BinaryOp::Or, Precedence::LogicalOr),
            TokenKind::And => (BinaryOp::And, Precedence::LogicalAnd),
            TokenKind::Eq => (BinaryOp::Eq, Precedence::Comparison),
            TokenKind::NotEq => (BinaryOp::NotEq, Precedence::Comparison),
            TokenKind::Lt => (BinaryOp::Lt, Precedence::Comparison),
            TokenKind::LtEq => (BinaryOp::LtEq, Precedence::Comparison),
            TokenKind::Gt => (BinaryOp::Gt, Precedence::Comparison),
            TokenKind::GtEq => (BinaryOp::GtEq, Precedence::Comparison),
            TokenKind::Plus => (BinaryOp::Add, Precedence::Sum),
            TokenKind::Minus => (BinaryOp::Sub, Precedence::Sum),
            TokenKind::Star => (BinaryOp::Mul, Precedence::Product),
            TokenKind::Slash => (BinaryOp::Div, Precedence::Product),
            TokenKind::Percent => (BinaryOp::Mod, Precedence::Product),
            _ => {
                return Err(ParseError::new("expected infix operator", operator.pos));
            }
        };

        let rhs = self.parse_expression(precedence)?;
        Ok(Expr::new(
            ExprKind::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            },
            operator.pos,
        ))
    }

    fn parse_call_expression(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let ExprKind::Name(name) = callee.kind else {
            return Err(ParseError::new(
                "only named functions can be called",
                callee.pos,
            ));
        };

        let mut args = Vec::new();
        if self.check(|kind| matches!(kind, TokenKind::RParen)) {
            self.advance();
            return Ok(Expr::new(ExprKind::Call { name, args }, callee.pos));
        }

        loop {
            args.push(self.parse_expression(Precedence::Lowest)?);

            if self.check(|kind| matches!(kind, TokenKind::Comma)) {
                self.advance();
                continue;
            }

            self.expect(
                |kind| matches!(kind, TokenKind::RParen),
                "expected ')' after call arguments",
            )?;
            break;
        }

        Ok(Expr::new(ExprKind::Call { name, args }, callee.pos))
    }

    fn parse_index_expression(&mut self, base: Expr, pos: Pos) -> Result<Expr, ParseError> {
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect(
            |kind| matches!(kind, TokenKind::RBracket),
            "expected ']' after index expression",
        )?;

        Ok(Expr::new(
            ExprKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
            pos,
        ))
    }

    fn parse_list_or_comprehension(&mut self, pos: Pos) -> Result<Expr, ParseError> {
        if self.check(|kind| matches!(kind, TokenKind::RBracket)) {
            self.advance();
            return Ok(Expr::new(ExprKind::List(Vec::new()), pos));
        }

        let first = self.parse_expression(Precedence::Lowest)?;

        if self.check(|kind| matches!(kind, TokenKind::For)) {
            self.advance();
            let (var, _) = self.expect_ident("expected loop variable after 'for'")?;
            self.expect(
                |kind| matches!(kind, TokenKind::In),
                "expected 'in' after loop variable",
            )?;
            let iterable = self.parse_expression(Precedence::Lowest)?;

            let filter = if self.check(|kind| matches!(kind, TokenKind::If)) {
                self.advance();
                Some(Box::new(self.parse_expression(Precedence::Lowest)?))
            } else {
                None
            };

            self.expect(
                |kind| matches!(kind, TokenKind::RBracket),
                "expected ']' after comprehension",
            )?;

            return Ok(Expr::new(
                ExprKind::ListComp {
                    element: Box::new(first),
                    var,
                    iterable: Box::new(iterable),
                    filter,
                },
                pos,
            ));
        }

        let mut items = vec![first];
        while self.check(|kind| matches!(kind, TokenKind::Comma)) {
            self.advance();
            items.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect(
            |kind| matches!(kind, TokenKind::RBracket),
            "expected ']' after list literal",
        )?;

        Ok(Expr::new(ExprKind::List(items), pos))
    }

    fn expect_ident(&mut self, message: &'static str) -> Result<(String, Pos), ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) => Ok((name, token.pos)),
            _ => Err(ParseError::new(message, token.pos)),
        }
    }

    fn expect(
        &mut self,
        predicate: impl Fn(&TokenKind) -> bool,
        message: &'static str,
    ) -> Result<Token, ParseError> {
        if predicate(&self.current().kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(message, self.current().pos))
        }
    }

    fn expect_end_of_line(&mut self) -> Result<(), ParseError> {
        if self.check(|kind| matches!(kind, TokenKind::Newline)) {
            self.advance();
            return Ok(());
        }
        if self.at_end() {
            return Ok(());
        }
        Err(ParseError::new(
            format!(
                "expected end of line, found {}",
                describe_token_kind(&self.current().kind)
            ),
            self.current().pos,
        ))
    }

    fn skip_newlines(&mut self) {
        while self.check(|kind| matches!(kind, TokenKind::Newline)) {
            self.advance();
        }
    }

    fn synchronize(&mut self) {
        while !self.at_end() {
            if matches!(
                self.current().kind,
                TokenKind::Newline | TokenKind::Dedent
            ) {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    fn check(&self, predicate: impl Fn(&TokenKind) -> bool) -> bool {
        predicate(&self.current().kind)
    }

    fn current_precedence(&self) -> Precedence {
        precedence_of(&self.current().kind)
    }

    fn at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.cursor]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.at_end() {
            self.cursor += 1;
        }
        token
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest = 0,
    LogicalOr = 1,
    LogicalAnd = 2,
    LogicalNot = 3,
    Comparison = 4,
    Sum = 5,
    Product = 6,
    Prefix = 7,
    Postfix = 8,
}

fn precedence_of(kind: &TokenKind) -> Precedence {
    match kind {
        TokenKind::Or => Precedence::LogicalOr,
        TokenKind::And => Precedence::LogicalAnd,
        TokenKind::Eq
        | TokenKind::NotEq
        | TokenKind::Lt
        | TokenKind::Gt
        | TokenKind::LtEq
        | TokenKind::GtEq => Precedence::Comparison,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
        TokenKind::LBracket | TokenKind::LParen => Precedence::Postfix,
        _ => Precedence::Lowest,
    }
}

fn describe_token_kind(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("identifier '{name}'"),
        TokenKind::Int(value) => format!("integer '{value}'"),
        TokenKind::Str(value) => format!("string \"{value}\""),
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Indent => "an indent".to_string(),
        TokenKind::Dedent => "a dedent".to_string(),
        TokenKind::Assign => "'='".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::Eof => "end of file".to_string(),
        other => format!("token {other:?}"),
    }
}
