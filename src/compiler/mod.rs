use crate::chunk::*;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::value::Value;

// ── Errors ───────────────────────────────────────────────────────────

/// Where in the token stream an error was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    /// At a concrete token, carrying its lexeme.
    At(String),
    /// At end of input.
    End,
    /// Reported by the lexer; the message already says what went wrong.
    Lexical,
}

impl std::fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorLocation::At(lexeme) => write!(f, " at '{}'", lexeme),
            ErrorLocation::End => write!(f, " at end"),
            ErrorLocation::Lexical => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct CompileError {
    pub line: u32,
    pub location: ErrorLocation,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_lines(.errors))]
pub struct CompileErrors {
    pub errors: Vec<CompileError>,
}

fn join_lines(errors: &[CompileError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

// ── Parse table ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    /// One level tighter; used for the right operand of left-associative
    /// operators.
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseFn {
    Grouping,
    Unary,
    Binary,
    Number,
}

#[derive(Debug, Clone, Copy)]
struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

impl ParseRule {
    const NONE: ParseRule = ParseRule { prefix: None, infix: None, precedence: Precedence::None };

    const fn new(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> Self {
        ParseRule { prefix, infix, precedence }
    }
}

fn rule(kind: TokenKind) -> ParseRule {
    use ParseFn::*;
    use TokenKind as T;
    match kind {
        T::LeftParen => ParseRule::new(Some(Grouping), None, Precedence::None),
        T::Minus => ParseRule::new(Some(Unary), Some(Binary), Precedence::Term),
        T::Plus => ParseRule::new(None, Some(Binary), Precedence::Term),
        T::Slash | T::Star => ParseRule::new(None, Some(Binary), Precedence::Factor),
        T::Number => ParseRule::new(Some(Number), None, Precedence::None),
        T::RightParen
        | T::LeftBrace
        | T::RightBrace
        | T::Comma
        | T::Dot
        | T::Semicolon
        | T::Bang
        | T::BangEqual
        | T::Equal
        | T::EqualEqual
        | T::Greater
        | T::GreaterEqual
        | T::Less
        | T::LessEqual
        | T::Identifier
        | T::String
        | T::And
        | T::Class
        | T::Else
        | T::False
        | T::For
        | T::Fun
        | T::If
        | T::Nil
        | T::Or
        | T::Print
        | T::Return
        | T::Super
        | T::This
        | T::True
        | T::Var
        | T::While
        | T::Error
        | T::Eof => ParseRule::NONE,
    }
}

// ── Compiler ─────────────────────────────────────────────────────────

/// Single-pass compiler: pulls tokens from the lexer and writes bytecode
/// straight into the chunk it owns.
pub struct Compiler<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    chunk: Chunk,
    errors: Vec<CompileError>,
}

impl<'src> Compiler<'src> {
    pub fn new(source: &'src str) -> Self {
        Compiler {
            lexer: Lexer::new(source),
            current: Token::start(),
            previous: Token::start(),
            had_error: false,
            panic_mode: false,
            chunk: Chunk::new(),
            errors: Vec::new(),
        }
    }

    pub fn compile(mut self) -> Result<Chunk, CompileErrors> {
        tracing::debug!("compiling");
        self.advance();
        self.expression();
        self.consume(TokenKind::Eof, "Expect end of expression.");
        self.emit_byte(OP_RETURN);

        if self.had_error {
            tracing::debug!(errors = self.errors.len(), "compile failed");
            return Err(CompileErrors { errors: self.errors });
        }
        tracing::debug!(
            code = self.chunk.len(),
            constants = self.chunk.constants().len(),
            lines = self.chunk.lines().len(),
            "compiled chunk"
        );
        Ok(self.chunk)
    }

    // ---- Token cursor ----

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.lexer.next_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            self.error_at_current(self.current.lexeme);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    // ---- Error reporting ----

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        self.had_error = true;
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => ErrorLocation::End,
            TokenKind::Error => ErrorLocation::Lexical,
            _ => ErrorLocation::At(token.lexeme.to_string()),
        };
        self.errors.push(CompileError { line: token.line, location, message: message.to_string() });
    }

    // ---- Emission ----

    fn emit_byte(&mut self, byte: u8) {
        self.chunk.write(byte, self.previous.line);
    }

    fn emit_constant(&mut self, value: Value) {
        if let Err(e) = self.chunk.write_constant(value, self.previous.line) {
            self.error(&e.to_string());
        }
    }

    // ---- Expressions ----

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, min: Precedence) {
        self.advance();
        let Some(prefix) = rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        self.apply(prefix);

        while min <= rule(self.current.kind).precedence {
            self.advance();
            match rule(self.previous.kind).infix {
                Some(infix) => self.apply(infix),
                None => break,
            }
        }
    }

    fn apply(&mut self, action: ParseFn) {
        match action {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn number(&mut self) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn unary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);

        if operator == TokenKind::Minus {
            self.emit_byte(OP_NEGATE);
        }
    }

    fn binary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(rule(operator).precedence.next());

        let op = match operator {
            TokenKind::Plus => OP_ADD,
            TokenKind::Minus => OP_SUBTRACT,
            TokenKind::Star => OP_MULTIPLY,
            TokenKind::Slash => OP_DIVIDE,
            _ => return,
        };
        self.emit_byte(op);
    }
}

/// Compile `source` into a chunk. On failure the partial chunk is dropped
/// and every reported diagnostic is returned.
pub fn compile(source: &str) -> Result<Chunk, CompileErrors> {
    Compiler::new(source).compile()
}
