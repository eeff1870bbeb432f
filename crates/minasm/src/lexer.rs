//! Lexer for minasm assembly source.
//!
//! Every source line is scanned on its own with the leading whitespace
//! trimmed; token columns are shifted back by the trimmed width so that they
//! always refer to the original line. A synthetic [`TokenKind::Newline`]
//! terminates each line.
use logos::Logos;
use tracing::trace;

use crate::error::{AssemblerError, SourceLocation, err_lex};

/// The kinds of tokens produced by [`tokenize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `.`, the directive-start delimiter.
    Dot,
    Comma,
    Colon,
    LBracket,
    RBracket,
    Plus,
    Minus,
    /// `0x`-prefixed hex or plain decimal digits.
    Number,
    /// A double-quoted string; the lexeme keeps the quotes and escapes.
    String,
    /// `r0`-`r7`.
    Register,
    Identifier,
    /// `;` up to the end of the line.
    Comment,
    Newline,
}

/// A token with its lexeme and position in the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub loc: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            loc: SourceLocation { line, col },
        }
    }

    /// Length of the lexeme in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Column one past the last character of the lexeme.
    pub fn end_col(&self) -> usize {
        self.loc.col + self.len()
    }

    pub fn line(&self) -> usize {
        self.loc.line
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
enum Lexeme {
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[regex(r"0[xX][0-9A-Za-z_]*|[0-9]+")]
    Number,
    #[regex(r#""([^"\\]|\\.)*""#)]
    String,
    #[regex(r"[rR][0-7]", priority = 10)]
    Register,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    #[regex(r";.*")]
    Comment,
}

impl From<Lexeme> for TokenKind {
    fn from(lexeme: Lexeme) -> Self {
        match lexeme {
            Lexeme::Dot => TokenKind::Dot,
            Lexeme::Comma => TokenKind::Comma,
            Lexeme::Colon => TokenKind::Colon,
            Lexeme::LBracket => TokenKind::LBracket,
            Lexeme::RBracket => TokenKind::RBracket,
            Lexeme::Plus => TokenKind::Plus,
            Lexeme::Minus => TokenKind::Minus,
            Lexeme::Number => TokenKind::Number,
            Lexeme::String => TokenKind::String,
            Lexeme::Register => TokenKind::Register,
            Lexeme::Identifier => TokenKind::Identifier,
            Lexeme::Comment => TokenKind::Comment,
        }
    }
}

/// Converts source text into the full token sequence.
///
/// Stops at the first unrecognised character sequence; the whole document
/// then fails with that single error and no tokens are returned.
pub fn tokenize(source: &str) -> Result<Vec<Token>, AssemblerError> {
    let mut tokens = Vec::new();

    for (line_no, raw_line) in source.lines().enumerate() {
        let line = raw_line.trim_start();
        let indent = raw_line.len() - line.len();

        let mut lexer = Lexeme::lexer(line);
        while let Some(result) = lexer.next() {
            let col = indent + lexer.span().start;
            match result {
                Ok(lexeme) => tokens.push(Token::new(lexeme.into(), lexer.slice(), line_no, col)),
                Err(()) => {
                    return Err(err_lex(describe_unrecognized(lexer.slice()), line_no, col));
                }
            }
        }

        tokens.push(Token::new(
            TokenKind::Newline,
            "\n",
            line_no,
            raw_line.trim_end_matches('\r').len(),
        ));
    }

    trace!(tokens = tokens.len(), "lexed");
    Ok(tokens)
}

fn describe_unrecognized(slice: &str) -> String {
    if slice.starts_with('"') {
        "Unterminated string literal".to_string()
    } else {
        format!("Unrecognized character sequence '{}'", slice)
    }
}
