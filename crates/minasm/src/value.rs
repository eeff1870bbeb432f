//! Operand value processors.
//!
//! Pure functions shared by the parser's consumers: number literals, string
//! literals and immediately-known addresses. Errors point at the token that
//! carried the bad value.
use std::num::IntErrorKind;

use crate::error::{AssemblerError, err_semantic, err_symbol};
use crate::lexer::{Token, TokenKind};
use crate::symbol::SymbolTable;

/// Parses `0x`-prefixed hex text. `None` if the prefix is missing.
fn hex_digits(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}

fn parse_hex_limited(token: &Token, max: u64, what: &str) -> Result<u64, AssemblerError> {
    let digits = hex_digits(&token.text).ok_or_else(|| {
        err_semantic(
            format!("Expected a 0x-prefixed hex value, found '{}'", token.text),
            token.loc.line,
            token.loc.col,
        )
    })?;

    let too_large = || {
        err_semantic(
            format!(
                "Value '{}' does not fit in a {} (0x0-0x{:X})",
                token.text, what, max
            ),
            token.loc.line,
            token.loc.col,
        )
    };

    match u64::from_str_radix(digits, 16) {
        Ok(value) if value <= max => Ok(value),
        Ok(_) => Err(too_large()),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Err(too_large()),
        Err(_) => Err(err_semantic(
            format!("Malformed hex value '{}'", token.text),
            token.loc.line,
            token.loc.col,
        )),
    }
}

/// Parses a `0x`-prefixed hex value in `0x00..=0xFF`.
pub fn parse_hex_byte(token: &Token) -> Result<u8, AssemblerError> {
    parse_hex_limited(token, u8::MAX as u64, "byte").map(|v| v as u8)
}

/// Parses a `0x`-prefixed hex value in `0x0000..=0xFFFF`.
pub fn parse_hex_short(token: &Token) -> Result<u16, AssemblerError> {
    parse_hex_limited(token, u16::MAX as u64, "short").map(|v| v as u16)
}

/// Parses a hex or decimal number. Only bounded by `u32`; callers apply
/// their own range checks.
pub fn parse_number(token: &Token) -> Result<u32, AssemblerError> {
    let parsed = match hex_digits(&token.text) {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => token.text.parse::<u32>(),
    };

    parsed.map_err(|e| {
        err_semantic(
            format!("Invalid number '{}': {}", token.text, e),
            token.loc.line,
            token.loc.col,
        )
    })
}

/// Signed offset of a memory operand, `+`/`-` followed by a number.
pub fn parse_offset(negative: bool, magnitude: &Token) -> Result<i64, AssemblerError> {
    let value = parse_number(magnitude)? as i64;
    Ok(if negative { -value } else { value })
}

/// Strips the quotes off a string literal and undoes `\"` and `\\`.
///
/// The result is one byte per character, so only ASCII text is accepted.
pub fn unescape_string(token: &Token) -> Result<Vec<u8>, AssemblerError> {
    let err = |message: String| err_semantic(message, token.loc.line, token.loc.col);

    let inner = token
        .text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| err(format!("Expected string literal, found '{}'", token.text)))?;

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        let c = if c == '\\' {
            match chars.next() {
                Some(escaped @ ('"' | '\\')) => escaped,
                Some(other) => return Err(err(format!("Unsupported escape sequence '\\{}'", other))),
                None => return Err(err("Dangling '\\' in string literal".to_string())),
            }
        } else {
            c
        };

        if !c.is_ascii() {
            return Err(err(format!("Non-ASCII character '{}' in string literal", c)));
        }
        bytes.push(c as u8);
    }

    Ok(bytes)
}

/// Converts an address operand into a concrete integer right now: either a
/// number literal or a label that is already in `symbols`.
///
/// Labels defined further down the source are not visible here.
pub fn resolve_address(token: &Token, symbols: &SymbolTable) -> Result<u32, AssemblerError> {
    match token.kind {
        TokenKind::Number => parse_number(token),
        TokenKind::Identifier => symbols.address_of(&token.text).ok_or_else(|| {
            err_symbol(
                format!(
                    "Undefined label '{}' (only labels defined earlier can be used as an address here)",
                    token.text
                ),
                token.loc.line,
                token.loc.col,
            )
        }),
        _ => Err(err_semantic(
            format!("Expected an address, found '{}'", token.text),
            token.loc.line,
            token.loc.col,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceLocation;

    fn number(text: &str) -> Token {
        Token::new(TokenKind::Number, text, 2, 7)
    }

    fn string(text: &str) -> Token {
        Token::new(TokenKind::String, text, 0, 0)
    }

    #[test]
    fn test_parse_hex_byte() {
        assert_eq!(parse_hex_byte(&number("0x00")).unwrap(), 0);
        assert_eq!(parse_hex_byte(&number("0xff")).unwrap(), 255);
        assert_eq!(parse_hex_byte(&number("0X7F")).unwrap(), 127);

        let err = parse_hex_byte(&number("0x100")).unwrap_err();
        assert_eq!(err.location(), Some(SourceLocation::new(2, 7)));
        assert!(parse_hex_byte(&number("12")).is_err());
        assert!(parse_hex_byte(&number("0xFFFFFFFFFFFFFFFFFF")).is_err());

        let err = parse_hex_byte(&number("0xZZ")).unwrap_err();
        assert_eq!(err.to_string(), "Malformed hex value '0xZZ'");
        assert_eq!(parse_hex_byte(&number("0x")).unwrap_err().to_string(), "Malformed hex value '0x'");
    }

    #[test]
    fn test_parse_hex_short() {
        assert_eq!(parse_hex_short(&number("0x1234")).unwrap(), 0x1234);
        assert_eq!(parse_hex_short(&number("0xFFFF")).unwrap(), 0xFFFF);
        assert!(parse_hex_short(&number("0x10000")).is_err());
        assert!(parse_hex_short(&number("4660")).is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(&number("10")).unwrap(), 10);
        assert_eq!(parse_number(&number("0x10")).unwrap(), 16);
        assert_eq!(parse_number(&number("0x12345")).unwrap(), 0x12345);
        assert!(parse_number(&number("99999999999")).is_err());
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset(false, &number("0x02")).unwrap(), 2);
        assert_eq!(parse_offset(true, &number("3")).unwrap(), -3);
    }

    #[test]
    fn test_unescape_string() {
        assert_eq!(unescape_string(&string("\"ab\"")).unwrap(), b"ab".to_vec());
        assert_eq!(unescape_string(&string("\"\"")).unwrap(), Vec::<u8>::new());
        assert_eq!(
            unescape_string(&string(r#""say \"hi\"""#)).unwrap(),
            b"say \"hi\"".to_vec()
        );
        assert_eq!(unescape_string(&string(r#""a\\b""#)).unwrap(), b"a\\b".to_vec());

        assert!(unescape_string(&string(r#""\n""#)).is_err());
        assert!(unescape_string(&string("\"caf\u{e9}\"")).is_err());
        assert!(unescape_string(&string("\"")).is_err());
    }

    #[test]
    fn test_resolve_address() {
        let mut symbols = SymbolTable::new();
        symbols.define("start".to_string(), 0x40, SourceLocation::default()).unwrap();

        assert_eq!(resolve_address(&number("0x10"), &symbols).unwrap(), 0x10);

        let label = Token::new(TokenKind::Identifier, "start", 3, 5);
        assert_eq!(resolve_address(&label, &symbols).unwrap(), 0x40);

        let missing = Token::new(TokenKind::Identifier, "later", 3, 5);
        let err = resolve_address(&missing, &symbols).unwrap_err();
        assert!(matches!(err, AssemblerError::SymbolError { .. }));
    }
}
