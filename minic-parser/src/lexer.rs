use logos::Logos;
use minic_source::Position;
use std::fmt;

#[derive(Debug, Logos, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // literals
    #[regex(r"[0-9]+")]
    IntLit,
    #[regex(r"[0-9]+\.[0-9]*|\.[0-9]*")]
    FloatLit,
    #[token("true")]
    #[token("false")]
    BoolLit,

    // identifiers
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,

    // keywords
    #[token("int")]
    Int,
    #[token("bool")]
    Bool,
    #[token("float")]
    Float,
    #[token("void")]
    Void,
    #[token("extern")]
    Extern,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("return")]
    Return,

    // unary operators
    #[token("!")]
    Not,

    // binary operators
    // - arithmetics
    #[token("+")]
    Plus,
    #[token("-")]
    Minus, // NOTE: can also be unary
    #[token("*")]
    Asterisk,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    // - assignment
    #[token("=")]
    Assign,
    // - logical
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    // - equality
    #[token("==")]
    EqualsEquals,
    #[token("!=")]
    NotEquals,
    // - ordering
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterThanEquals,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessThanEquals,

    // punctuation
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    // misc
    #[regex(r"[ \t\n\r\f]+", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)] // single line comments
    #[error]
    Error,

    /// A character no rule matches. Produced by [`Lexer`] in place of [`TokenKind::Error`] so the
    /// parser can show the character in its diagnostics.
    Unknown(char),
    /// Only generated by [`Lexer`] once the underlying lexer is exhausted.
    Eof,
}

impl TokenKind {
    /// `int`, `bool` or `float`: the types a variable or parameter can have.
    pub fn is_var_type(&self) -> bool {
        matches!(self, TokenKind::Int | TokenKind::Bool | TokenKind::Float)
    }

    /// Any type keyword, `void` included.
    pub fn is_type(&self) -> bool {
        self.is_var_type() || *self == TokenKind::Void
    }
}

/// A lexed token. Tokens are plain values: AST nodes copy what they need out of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// 1-based.
    pub line: u32,
    /// 1-based.
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line: position.line,
            column: position.column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of file"),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}

/// Turns source text into [`Token`]s one at a time, tracking line and column numbers.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    source: &'a str,
    /// Byte offset up to which `line` and `column` are up to date.
    counted: usize,
    line: u32,
    column: u32,
    /// Set once the input is exhausted. Returned for every later call.
    eof: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            counted: 0,
            line: 1,
            column: 1,
            eof: None,
        }
    }

    /// Returns the next token. Never fails: characters that do not start a token come back as
    /// [`TokenKind::Unknown`] and the end of input as [`TokenKind::Eof`], as many times as asked.
    pub fn next_token(&mut self) -> Token {
        if let Some(eof) = &self.eof {
            return eof.clone();
        }

        match self.inner.next() {
            Some(kind) => {
                let span = self.inner.span();
                let position = self.advance_to(span.start);
                let lexeme = String::from_utf8_lossy(&self.source.as_bytes()[span.clone()]).into_owned();
                let kind = match kind {
                    TokenKind::Error => TokenKind::Unknown(lexeme.chars().next().unwrap_or('\u{fffd}')),
                    kind => kind,
                };
                self.advance_to(span.end);
                Token::new(kind, lexeme, position)
            }
            None => {
                let position = self.advance_to(self.source.len());
                let eof = Token::new(TokenKind::Eof, "", position);
                self.eof = Some(eof.clone());
                eof
            }
        }
    }

    /// Lexes the whole input. The last token is always [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break tokens;
            }
        }
    }

    /// Moves the line/column counters forward to byte `offset` and returns the position there.
    fn advance_to(&mut self, offset: usize) -> Position {
        for &byte in &self.source.as_bytes()[self.counted..offset] {
            if byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else if byte & 0xC0 != 0x80 {
                // count characters, not UTF-8 continuation bytes
                self.column += 1;
            }
        }
        self.counted = offset;
        Position::new(self.line, self.column)
    }
}
