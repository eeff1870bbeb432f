//! Position queries over a token stream, for hover and completion.
//!
//! All positions are 0-based. Indices refer to the slice passed in.
use crate::ast::Section;
use crate::lexer::{Token, TokenKind};

/// Token covering `(line, column)`, with its index.
///
/// A token covers `[col, col + len)`. Whitespace between tokens and the
/// synthetic end-of-line tokens never match.
pub fn token_at(tokens: &[Token], line: usize, column: usize) -> Option<(usize, &Token)> {
    tokens.iter().enumerate().find(|(_, token)| {
        !token.is(TokenKind::Newline)
            && token.loc.line == line
            && token.loc.col <= column
            && column < token.end_col()
    })
}

/// The token at `index` follows a `.`, so it names a directive or section.
pub fn is_directive_context(tokens: &[Token], index: usize) -> bool {
    index > 0
        && tokens
            .get(index - 1)
            .is_some_and(|prev| prev.is(TokenKind::Dot))
}

/// The token at `index` is where a mnemonic would go: first on its line, or
/// right after a label definition's colon or a section header.
pub fn is_mnemonic_position(tokens: &[Token], index: usize) -> bool {
    let Some(token) = tokens.get(index) else {
        return false;
    };
    if index == 0 {
        return true;
    }

    let prev = &tokens[index - 1];
    if prev.is(TokenKind::Newline) || prev.loc.line != token.loc.line {
        return true;
    }
    if prev.is(TokenKind::Colon) {
        return index >= 2 && is_label_definition(tokens, index - 2);
    }
    is_section_header(tokens, index - 1)
}

/// The token at `index` names a section in a `.text`/`.data` header.
pub fn is_section_header(tokens: &[Token], index: usize) -> bool {
    tokens.get(index).is_some_and(|token| {
        token.is(TokenKind::Identifier) && Section::from_name(&token.text).is_some()
    }) && is_directive_context(tokens, index)
}

/// The token at `index` is the name of a label definition (`name:`).
pub fn is_label_definition(tokens: &[Token], index: usize) -> bool {
    tokens
        .get(index)
        .is_some_and(|token| token.is(TokenKind::Identifier))
        && tokens
            .get(index + 1)
            .is_some_and(|next| next.is(TokenKind::Colon))
}

/// Tokens of one source line, end-of-line token excluded.
pub fn tokens_on_line(tokens: &[Token], line: usize) -> Vec<&Token> {
    tokens
        .iter()
        .filter(|token| token.loc.line == line && !token.is(TokenKind::Newline))
        .collect()
}

/// Mnemonic of `line` if the line holds an instruction.
pub fn mnemonic_for_line(tokens: &[Token], line: usize) -> Option<&str> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| token.loc.line == line)
        .find(|(index, token)| {
            token.is(TokenKind::Identifier)
                && !is_label_definition(tokens, *index)
                && !is_directive_context(tokens, *index)
                && is_mnemonic_position(tokens, *index)
        })
        .map(|(_, token)| token.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    const SOURCE: &str = "start: ldi r0, 0x01\n  .byte 0x02\n.text main: jmp [start]\n";

    #[test]
    fn test_token_at() {
        let tokens = tokenize(SOURCE).unwrap();

        let (_, token) = token_at(&tokens, 0, 8).unwrap();
        assert_eq!(token.text, "ldi");

        let (index, token) = token_at(&tokens, 0, 7).unwrap();
        assert_eq!(token.text, "ldi");
        assert!(is_mnemonic_position(&tokens, index));

        // Between "ldi" and "r0"
        assert!(token_at(&tokens, 0, 10).is_none());
        // Past the end of the line, where only the end-of-line token sits
        assert!(token_at(&tokens, 0, 19).is_none());
        assert!(token_at(&tokens, 9, 0).is_none());
    }

    #[test]
    fn test_directive_context() {
        let tokens = tokenize(SOURCE).unwrap();
        let (index, token) = token_at(&tokens, 1, 4).unwrap();
        assert_eq!(token.text, "byte");
        assert!(is_directive_context(&tokens, index));
        assert!(!is_mnemonic_position(&tokens, index));
        assert!(!is_directive_context(&tokens, 0));
    }

    #[test]
    fn test_label_definition() {
        let tokens = tokenize(SOURCE).unwrap();
        assert!(is_label_definition(&tokens, 0));

        let (index, token) = token_at(&tokens, 2, 20).unwrap();
        assert_eq!(token.text, "start");
        assert!(!is_label_definition(&tokens, index));
    }

    #[test]
    fn test_mnemonic_for_line() {
        let tokens = tokenize(SOURCE).unwrap();
        assert_eq!(mnemonic_for_line(&tokens, 0), Some("ldi"));
        assert_eq!(mnemonic_for_line(&tokens, 1), None);
        assert_eq!(mnemonic_for_line(&tokens, 2), Some("jmp"));
        assert_eq!(mnemonic_for_line(&tokens, 7), None);
    }

    #[test]
    fn test_mnemonic_after_section_header() {
        let tokens = tokenize(".text nop\nstart: .text jmp [start]\n.DATA main: hlt\n").unwrap();
        assert_eq!(mnemonic_for_line(&tokens, 0), Some("nop"));
        assert_eq!(mnemonic_for_line(&tokens, 1), Some("jmp"));
        assert_eq!(mnemonic_for_line(&tokens, 2), Some("hlt"));

        let (index, token) = token_at(&tokens, 0, 6).unwrap();
        assert_eq!(token.text, "nop");
        assert!(is_mnemonic_position(&tokens, index));
        assert!(is_section_header(&tokens, 1));
        assert!(!is_section_header(&tokens, index));

        // A payload directive is not a header
        let tokens = tokenize(".byte nop").unwrap();
        assert!(!is_mnemonic_position(&tokens, 2));
    }

    #[test]
    fn test_tokens_on_line() {
        let tokens = tokenize(SOURCE).unwrap();
        let texts: Vec<&str> = tokens_on_line(&tokens, 1)
            .into_iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, vec![".", "byte", "0x02"]);
    }
}
