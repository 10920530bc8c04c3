use std::collections::VecDeque;

use thiserror::Error;

use crate::ast::Pos;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Pos) -> Self {
        Self { kind, pos }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Eof,
    Newline,
    Indent,
    Dedent,
    Ident(String),
    Int(i64),
    Str(String),

    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    And,
    Or,
    Not,
    True,
    False,
    NoneKw,

    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at {pos}: {message}")]
pub struct LexError {
    pub message: String,
    pub pos: Pos,
}

impl LexError {
    pub fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token()?;
        let eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if eof {
            break;
        }
    }

    Ok(tokens)
}

struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: u32,
    column: u32,
    at_line_start: bool,
    indents: Vec<usize>,
    pending: VecDeque<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
            column: 1,
            at_line_start: true,
            indents: vec![0],
            pending: VecDeque::new(),
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        if let Some(token) = self.pending.pop_front() {
            return Ok(token);
        }

        if self.at_line_start {
            self.handle_indentation()?;
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
        }

        self.skip_ignored();

        let pos = self.pos();
        let Some(raw) = self.peek_char() else {
            return Ok(self.finish(pos));
        };

        if raw == '\n' {
            self.bump_char();
            self.at_line_start = true;
            return Ok(Token::new(TokenKind::Newline, pos));
        }

        self.bump_char();

        if raw == '"' || raw == '\'' {
            return self.read_string(raw, pos);
        }

        if is_ident_start(raw) {
            return Ok(self.read_identifier(pos));
        }

        if raw.is_ascii_digit() {
            return self.read_number(pos);
        }

        let token = match raw {
            '=' => {
                if self.peek_char() == Some('=') {
                    self.bump_char();
                    Token::new(TokenKind::Eq, pos)
                } else {
                    Token::new(TokenKind::Assign, pos)
                }
            }
            '!' => {
                if self.peek_char() == Some('=') {
                    self.bump_char();
                    Token::new(TokenKind::NotEq, pos)
                } else {
                    return Err(LexError::new("unexpected character '!'", pos));
                }
            }
            '<' => {
                if self.peek_char() == Some('=') {
                    self.bump_char();
                    Token::new(TokenKind::LtEq, pos)
                } else {
                    Token::new(TokenKind::Lt, pos)
                }
            }
            '>' => {
                if self.peek_char() == Some('=') {
                    self.bump_char();
                    Token::new(TokenKind::GtEq, pos)
                } else {
                    Token::new(TokenKind::Gt, pos)
                }
            }
            '+' => Token::new(TokenKind::Plus, pos),
            '-' => Token::new(TokenKind::Minus, pos),
            '*' => Token::new(TokenKind::Star, pos),
            '/' => Token::new(TokenKind::Slash, pos),
            '%' => Token::new(TokenKind::Percent, pos),
            ',' => Token::new(TokenKind::Comma, pos),
            ':' => Token::new(TokenKind::Colon, pos),
            '(' => Token::new(TokenKind::LParen, pos),
            ')' => Token::new(TokenKind::RParen, pos),
            '[' => Token::new(TokenKind::LBracket, pos),
            ']' => Token::new(TokenKind::RBracket, pos),
            other => {
                return Err(LexError::new(format!("unexpected character '{other}'"), pos));
            }
        };

        Ok(token)
    }

    // Measures the indentation of the next non-blank line and queues
    // Indent/Dedent tokens against the indent stack.
    fn handle_indentation(&mut self) -> Result<(), LexError> {
        loop {
            let mut width = 0usize;
            while let Some(c) = self.peek_char() {
                match c {
                    ' ' => width += 1,
                    '\t' => width += 8 - width % 8,
                    '\r' => {}
                    _ => break,
                }
                self.bump_char();
            }

            match self.peek_char() {
                // Leave at_line_start set so finish() drains the indent stack.
                None => return Ok(()),
                Some('\n') => {
                    self.bump_char();
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                Some(_) => {
                    self.at_line_start = false;
                    let pos = self.pos();
                    let current = self.indents.last().copied().unwrap_or(0);

                    if width > current {
                        self.indents.push(width);
                        self.pending.push_back(Token::new(TokenKind::Indent, pos));
                        return Ok(());
                    }

                    while width < self.indents.last().copied().unwrap_or(0) {
                        self.indents.pop();
                        self.pending.push_back(Token::new(TokenKind::Dedent, pos));
                    }

                    if width != self.indents.last().copied().unwrap_or(0) {
                        return Err(LexError::new(
                            "unindent does not match any outer indentation level",
                            pos,
                        ));
                    }

                    return Ok(());
                }
            }
        }
    }

    // Closes the final logical line and drains the indent stack at end of input.
    fn finish(&mut self, pos: Pos) -> Token {
        if !self.at_line_start {
            self.at_line_start = true;
            return Token::new(TokenKind::Newline, pos);
        }

        while self.indents.last().copied().unwrap_or(0) > 0 {
            self.indents.pop();
            self.pending.push_back(Token::new(TokenKind::Dedent, pos));
        }
        self.pending.push_back(Token::new(TokenKind::Eof, pos));

        // The queue is never empty here: at minimum it holds the Eof.
        self.pending
            .pop_front()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, pos))
    }

    fn read_identifier(&mut self, pos: Pos) -> Token {
        let start = self.position - 1;
        while self.peek_char().is_some_and(is_ident_continue) {
            self.bump_char();
        }

        let ident = &self.input[start..self.position];
        let kind = match ident {
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::NoneKw,
            _ => TokenKind::Ident(ident.to_owned()),
        };

        Token::new(kind, pos)
    }

    fn read_number(&mut self, pos: Pos) -> Result<Token, LexError> {
        let start = self.position - 1;
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump_char();
        }

        let raw = &self.input[start..self.position];
        let number = raw
            .parse::<i64>()
            .map_err(|_| LexError::new(format!("integer literal '{raw}' is too large"), pos))?;

        Ok(Token::new(TokenKind::Int(number), pos))
    }

    fn read_string(&mut self, quote: char, pos: Pos) -> Result<Token, LexError> {
        let mut value = String::new();

        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.bump_char();

            if c == quote {
                return Ok(Token::new(TokenKind::Str(value), pos));
            }

            if c == '\\' {
                let Some(esc) = self.peek_char() else {
                    break;
                };
                self.bump_char();

                let escaped = match esc {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    other => other,
                };
                value.push(escaped);
                continue;
            }

            value.push(c);
        }

        Err(LexError::new("unterminated string literal", pos))
    }

    fn skip_ignored(&mut self) {
        while self
            .peek_char()
            .is_some_and(|c| c == ' ' || c == '\t' || c == '\r')
        {
            self.bump_char();
        }

        if self.peek_char() == Some('#') {
            self.skip_comment();
        }
    }

    // Consumes up to, but not including, the line break.
    fn skip_comment(&mut self) {
        while self.peek_char().is_some_and(|c| c != '\n') {
            self.bump_char();
        }
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.column)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn bump_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}
