use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
pub enum TokenKind {
    // Punctuation
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token(";")]
    Semicolon,
    #[token("/")]
    Slash,
    #[token("*")]
    Star,

    // One or two character operators
    #[token("!")]
    Bang,
    #[token("!=")]
    BangEqual,
    #[token("=")]
    Equal,
    #[token("==")]
    EqualEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,

    // Literals
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,
    // An unterminated string runs to end of input and is rejected here.
    #[regex(r#""[^"]*"?"#, |lex| lex.slice().len() > 1 && lex.slice().ends_with('"'))]
    String,
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    // Keywords
    #[token("and")]
    And,
    #[token("class")]
    Class,
    #[token("else")]
    Else,
    #[token("false")]
    False,
    #[token("for")]
    For,
    #[token("fun")]
    Fun,
    #[token("if")]
    If,
    #[token("nil")]
    Nil,
    #[token("or")]
    Or,
    #[token("print")]
    Print,
    #[token("return")]
    Return,
    #[token("super")]
    Super,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("var")]
    Var,
    #[token("while")]
    While,

    // Produced by `Lexer`, never matched by logos
    Error,
    Eof,
}

/// A borrowed slice of the source. Error tokens carry their message in
/// `lexeme` instead of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    pub line: u32,
}

impl<'src> Token<'src> {
    /// Placeholder used before the first `next_token` call.
    pub fn start() -> Self {
        Token { kind: TokenKind::Eof, lexeme: "", line: 1 }
    }
}

/// On-demand tokenizer. Tracks a 1-based line counter across skipped
/// whitespace, comments and multi-line strings.
pub struct Lexer<'src> {
    source: &'src str,
    inner: logos::Lexer<'src, TokenKind>,
    line: u32,
    consumed: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer { source, inner: TokenKind::lexer(source), line: 1, consumed: 0 }
    }

    /// Next token; `Eof` forever once input is exhausted.
    pub fn next_token(&mut self) -> Token<'src> {
        let Some(result) = self.inner.next() else {
            self.skip_to(self.source.len());
            return Token { kind: TokenKind::Eof, lexeme: "", line: self.line };
        };

        let span = self.inner.span();
        self.skip_to(span.start);
        let slice = self.inner.slice();
        self.line += count_newlines(slice);
        self.consumed = span.end;

        match result {
            Ok(kind) => Token { kind, lexeme: slice, line: self.line },
            Err(()) => Token { kind: TokenKind::Error, lexeme: error_message(slice), line: self.line },
        }
    }

    fn skip_to(&mut self, offset: usize) {
        if offset > self.consumed {
            self.line += count_newlines(&self.source[self.consumed..offset]);
            self.consumed = offset;
        }
    }
}

fn count_newlines(s: &str) -> u32 {
    s.bytes().filter(|b| *b == b'\n').count() as u32
}

fn error_message(slice: &str) -> &'static str {
    if slice.starts_with('"') {
        "Unterminated string."
    } else {
        "Unexpected character."
    }
}

/// Lex the whole source, ending with the `Eof` token.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        tokens.push(token);
        if token.kind == TokenKind::Eof {
            return tokens;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_arithmetic() {
        use TokenKind::*;
        assert_eq!(
            kinds("(1 + 2) * 3 - -4 / 5"),
            vec![LeftParen, Number, Plus, Number, RightParen, Star, Number, Minus, Minus, Number, Slash, Number, Eof]
        );
    }

    #[test]
    fn lex_number_lexemes() {
        let tokens = tokenize("12 3.25 007");
        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme).collect();
        assert_eq!(lexemes, vec!["12", "3.25", "007", ""]);
    }

    #[test]
    fn lex_two_char_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("! != = == < <= > >="),
            vec![Bang, BangEqual, Equal, EqualEqual, Less, LessEqual, Greater, GreaterEqual, Eof]
        );
        assert_eq!(kinds("!="), vec![BangEqual, Eof]);
        assert_eq!(kinds("!!"), vec![Bang, Bang, Eof]);
    }

    #[test]
    fn lex_keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("and class else false for fun if nil or print return super this true var while"),
            vec![And, Class, Else, False, For, Fun, If, Nil, Or, Print, Return, Super, This, True, Var, While, Eof]
        );
        // prefixes and extensions of keywords stay identifiers
        assert_eq!(kinds("an andy classes fu _var true1"), vec![Identifier; 6].into_iter().chain([Eof]).collect::<Vec<_>>());
    }

    #[test]
    fn lex_string_literal() {
        let tokens = tokenize(r#""hello world""#);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, r#""hello world""#);
    }

    #[test]
    fn lex_unterminated_string() {
        let tokens = tokenize("\"abc");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].lexeme, "Unterminated string.");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn lex_unexpected_character() {
        let tokens = tokenize("1 @ 2");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].lexeme, "Unexpected character.");
        assert_eq!(tokens[2].kind, TokenKind::Number);
    }

    #[test]
    fn lex_comment_ignored() {
        assert_eq!(kinds("1 // the rest + 2\n+ 3"), vec![TokenKind::Number, TokenKind::Plus, TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn line_counter_tracks_newlines() {
        let tokens = tokenize("1\n+\n\n2 // note\n");
        let lines: Vec<u32> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 4, 5]);
    }

    #[test]
    fn newlines_inside_strings_count() {
        let tokens = tokenize("\"a\nb\" 1");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn eof_repeats() {
        let mut lexer = Lexer::new("1");
        assert_eq!(lexer.next_token().kind, TokenKind::Number);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}
