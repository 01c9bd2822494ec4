//! Single-pass compiler from source text to a [`Chunk`].
//!
//! Supported language: `var` declarations, `print` and expression statements,
//! global variables with assignment, literals, grouping, unary `-`/`!`,
//! arithmetic, equality and comparison operators.

mod scanner;

use std::fmt;

pub use scanner::{Scanner, Token, TokenKind};

use crate::chunk::{Chunk, OpCode, MAX_CONSTANTS};
use crate::object::Heap;
use crate::value::Value;

/// Deepest expression nesting the recursive-descent parser will follow.
const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    At(String),
    End,
    /// Scanner errors carry no lexeme.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileDiagnostic {
    pub line: u32,
    pub location: ErrorLocation,
    pub message: String,
}

impl fmt::Display for CompileDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.location {
            ErrorLocation::At(lexeme) => write!(f, " at '{}'", lexeme)?,
            ErrorLocation::End => write!(f, " at end")?,
            ErrorLocation::Unknown => {}
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("compilation failed with {} error(s)", .diagnostics.len())]
pub struct CompileFailure {
    pub diagnostics: Vec<CompileDiagnostic>,
}

/// Compile `source` into a fresh chunk. String constants are interned into `heap`.
pub fn compile(source: &str, heap: &mut Heap) -> Result<Chunk, CompileFailure> {
    let mut compiler = Compiler::new(source, heap);
    compiler.advance();
    while !compiler.matches(TokenKind::Eof) {
        compiler.declaration();
    }
    compiler.end()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary | Primary => Primary,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ParseFn {
    Grouping,
    Unary,
    Binary,
    Number,
    String,
    Literal,
    Variable,
}

struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

fn rule(kind: TokenKind) -> ParseRule {
    use TokenKind as T;
    let (prefix, infix, precedence) = match kind {
        T::LeftParen => (Some(ParseFn::Grouping), None, Precedence::None),
        T::Minus => (Some(ParseFn::Unary), Some(ParseFn::Binary), Precedence::Term),
        T::Plus => (None, Some(ParseFn::Binary), Precedence::Term),
        T::Slash | T::Star => (None, Some(ParseFn::Binary), Precedence::Factor),
        T::Bang => (Some(ParseFn::Unary), None, Precedence::None),
        T::BangEqual | T::EqualEqual => (None, Some(ParseFn::Binary), Precedence::Equality),
        T::Greater | T::GreaterEqual | T::Less | T::LessEqual => {
            (None, Some(ParseFn::Binary), Precedence::Comparison)
        }
        T::Identifier => (Some(ParseFn::Variable), None, Precedence::None),
        T::String => (Some(ParseFn::String), None, Precedence::None),
        T::Number => (Some(ParseFn::Number), None, Precedence::None),
        T::False | T::True | T::Nil => (Some(ParseFn::Literal), None, Precedence::None),
        _ => (None, None, Precedence::None),
    };
    ParseRule {
        prefix,
        infix,
        precedence,
    }
}

struct Compiler<'src, 'h> {
    scanner: Scanner<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    panic_mode: bool,
    depth: usize,
    diagnostics: Vec<CompileDiagnostic>,
    chunk: Chunk,
    heap: &'h mut Heap,
}

impl<'src, 'h> Compiler<'src, 'h> {
    fn new(source: &'src str, heap: &'h mut Heap) -> Self {
        Self {
            scanner: Scanner::new(source),
            current: Token::synthetic(),
            previous: Token::synthetic(),
            panic_mode: false,
            depth: 0,
            diagnostics: Vec::new(),
            chunk: Chunk::new(),
            heap,
        }
    }

    fn end(mut self) -> Result<Chunk, CompileFailure> {
        self.emit_op(OpCode::Return);
        if self.diagnostics.is_empty() {
            Ok(self.chunk)
        } else {
            log::debug!("compile failed with {} error(s)", self.diagnostics.len());
            Err(CompileFailure {
                diagnostics: self.diagnostics,
            })
        }
    }

    // -------------------------
    // Token stream
    // -------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme;
            self.error_at_current(message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    // -------------------------
    // Error reporting
    // -------------------------

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => ErrorLocation::End,
            TokenKind::Error => ErrorLocation::Unknown,
            _ => ErrorLocation::At(token.lexeme.to_string()),
        };
        self.diagnostics.push(CompileDiagnostic {
            line: token.line,
            location,
            message: message.to_string(),
        });
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;

        use TokenKind::*;
        while self.current.kind != Eof {
            if self.previous.kind == Semicolon {
                return;
            }
            match self.current.kind {
                Class | Fun | Var | For | If | While | Print | Return => return,
                _ => self.advance(),
            }
        }
    }

    // -------------------------
    // Emission
    // -------------------------

    fn emit_byte(&mut self, byte: u8) {
        self.chunk.write(byte, self.previous.line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op.into());
    }

    fn emit_ops(&mut self, a: OpCode, b: OpCode) {
        self.emit_op(a);
        self.emit_op(b);
    }

    fn emit_with_operand(&mut self, op: OpCode, operand: u8) {
        self.emit_op(op);
        self.emit_byte(operand);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let idx = self.chunk.add_constant(value);
        if idx >= MAX_CONSTANTS {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        idx as u8
    }

    fn emit_constant(&mut self, value: Value) {
        let idx = self.make_constant(value);
        self.emit_with_operand(OpCode::Constant, idx);
    }

    fn identifier_constant(&mut self, name: Token<'src>) -> u8 {
        let r = self.heap.intern(name.lexeme.as_bytes());
        self.make_constant(Value::Obj(r))
    }

    // -------------------------
    // Declarations and statements
    // -------------------------

    fn declaration(&mut self) {
        if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect variable name.");
        let global = self.identifier_constant(self.previous);

        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        );

        self.emit_with_operand(OpCode::DefineGlobal, global);
    }

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after value.");
            self.emit_op(OpCode::Print);
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
            self.emit_op(OpCode::Pop);
        }
    }

    // -------------------------
    // Expressions
    // -------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        if self.depth >= MAX_NESTING {
            self.error_at_current("Expression nesting too deep.");
            return;
        }
        self.depth += 1;
        self.parse_operand(precedence);
        self.depth -= 1;
    }

    fn parse_operand(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };

        let can_assign = precedence <= Precedence::Assignment;
        self.apply(prefix, can_assign);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule(self.previous.kind).infix {
                self.apply(infix, can_assign);
            }
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn apply(&mut self, f: ParseFn, can_assign: bool) {
        match f {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
            ParseFn::String => self.string(),
            ParseFn::Literal => self.literal(),
            ParseFn::Variable => self.variable(can_assign),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self) {
        let op = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match op {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => {}
        }
    }

    fn binary(&mut self) {
        let op = self.previous.kind;
        self.parse_precedence(rule(op).precedence.next());

        use TokenKind as T;
        match op {
            T::Plus => self.emit_op(OpCode::Add),
            T::Minus => self.emit_op(OpCode::Subtract),
            T::Star => self.emit_op(OpCode::Multiply),
            T::Slash => self.emit_op(OpCode::Divide),
            T::EqualEqual => self.emit_op(OpCode::Equal),
            T::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            T::Greater => self.emit_op(OpCode::Greater),
            T::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            T::Less => self.emit_op(OpCode::Less),
            T::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            _ => {}
        }
    }

    fn number(&mut self) {
        let lexeme = self.previous.lexeme;
        let value = if lexeme.contains('.') {
            match lexeme.parse::<f64>() {
                Ok(v) => Value::Double(v),
                Err(_) => {
                    self.error("Invalid number literal.");
                    return;
                }
            }
        } else {
            match lexeme.parse::<i32>() {
                Ok(v) => Value::Int(v),
                Err(_) => {
                    self.error("Integer literal out of range.");
                    return;
                }
            }
        };
        self.emit_constant(value);
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        // strip the quotes
        let body = &lexeme[1..lexeme.len() - 1];
        let r = self.heap.intern(body.as_bytes());
        self.emit_constant(Value::Obj(r));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            _ => {}
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let arg = self.identifier_constant(self.previous);
        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_with_operand(OpCode::SetGlobal, arg);
        } else {
            self.emit_with_operand(OpCode::GetGlobal, arg);
        }
    }
}
