//! Defines the error and diagnostic types used throughout the assembler.
use std::fmt;

use thiserror::Error;

/// Represents the location (line and column) of an error in the source code.
///
/// Both fields are 0-based; `col` is the byte offset in the original,
/// untrimmed source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct SourceLocation {
    pub line: usize,
    pub col: usize,
}

impl SourceLocation {
    pub fn new(line: usize, col: usize) -> Self {
        SourceLocation { line, col }
    }
}

impl fmt::Display for SourceLocation {
    /// Renders the location 1-based, the way humans and editors count.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

/// The main error type for the assembler.
///
/// The rendered message never contains the location; callers that want to
/// show it read [`AssemblerError::location`] and format it themselves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    /// Error during the lexing (tokenization) phase.
    #[error("{message}")]
    LexerError {
        message: String,
        loc: SourceLocation,
    },
    /// Error during the parsing phase.
    #[error("{message}")]
    ParserError {
        message: String,
        loc: SourceLocation,
    },
    /// Error related to symbols (labels): redefinition, undefined references,
    /// resolved values outside the address space.
    #[error("{message}")]
    SymbolError {
        message: String,
        loc: SourceLocation,
    },
    /// Malformed directive or instruction operands.
    #[error("{message}")]
    SemanticError {
        message: String,
        loc: SourceLocation,
    },
    /// Broken internal contract (e.g. emitting an unresolved label reference).
    /// Reaching a user with one of these is a bug in the assembler.
    #[error("internal error: {0}")]
    ContractViolation(String),
    /// General I/O error (e.g., reading source file).
    #[error("I/O error: {0}")]
    IoError(String),
    /// Represents multiple errors found during assembly.
    #[error("{}", render_multiple(.0))]
    MultipleErrors(Vec<AssemblerError>),
}

fn render_multiple(errors: &[AssemblerError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl AssemblerError {
    /// Where in the source this error points, if anywhere.
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            AssemblerError::LexerError { loc, .. }
            | AssemblerError::ParserError { loc, .. }
            | AssemblerError::SymbolError { loc, .. }
            | AssemblerError::SemanticError { loc, .. } => Some(*loc),
            _ => None,
        }
    }

    /// Flattens nested `MultipleErrors` into a list of single errors.
    pub fn flatten(self) -> Vec<AssemblerError> {
        match self {
            AssemblerError::MultipleErrors(errors) => {
                errors.into_iter().flat_map(AssemblerError::flatten).collect()
            }
            other => vec![other],
        }
    }
}

impl From<std::io::Error> for AssemblerError {
    fn from(e: std::io::Error) -> Self {
        AssemblerError::IoError(e.to_string())
    }
}

// Helper to create errors with location
pub fn err_lex(message: impl Into<String>, line: usize, col: usize) -> AssemblerError {
    AssemblerError::LexerError {
        message: message.into(),
        loc: SourceLocation { line, col },
    }
}

pub fn err_parse(message: impl Into<String>, line: usize, col: usize) -> AssemblerError {
    AssemblerError::ParserError {
        message: message.into(),
        loc: SourceLocation { line, col },
    }
}

pub fn err_symbol(message: impl Into<String>, line: usize, col: usize) -> AssemblerError {
    AssemblerError::SymbolError {
        message: message.into(),
        loc: SourceLocation { line, col },
    }
}

pub fn err_semantic(message: impl Into<String>, line: usize, col: usize) -> AssemblerError {
    AssemblerError::SemanticError {
        message: message.into(),
        loc: SourceLocation { line, col },
    }
}

pub fn err_contract(message: impl Into<String>) -> AssemblerError {
    AssemblerError::ContractViolation(message.into())
}

pub fn err_multiple(errors: Vec<AssemblerError>) -> AssemblerError {
    if errors.len() == 1 {
        // A single error doesn't need the wrapper.
        let mut errors = errors;
        return errors.remove(0);
    }
    AssemblerError::MultipleErrors(errors)
}

/// The pipeline stage a diagnostic originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Lexer,
    Parser,
    Analyzer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lexer => "lexer",
            Stage::Parser => "parser",
            Stage::Analyzer => "analyzer",
        };
        f.write_str(name)
    }
}

/// A user-facing problem report. Message and location are kept apart so that
/// tooling can render them independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub stage: Stage,
}

impl Diagnostic {
    /// Converts an error (possibly `MultipleErrors`) into diagnostics for `stage`.
    /// Errors without a location are pinned to the start of the document.
    pub fn from_error(error: AssemblerError, stage: Stage) -> Vec<Diagnostic> {
        error
            .flatten()
            .into_iter()
            .map(|e| {
                let loc = e.location().unwrap_or_default();
                let message = match &e {
                    AssemblerError::LexerError { message, .. }
                    | AssemblerError::ParserError { message, .. }
                    | AssemblerError::SymbolError { message, .. }
                    | AssemblerError::SemanticError { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                Diagnostic {
                    message,
                    line: loc.line,
                    column: loc.col,
                    stage,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_has_no_location() {
        let err = err_parse("Expected operand, found ','", 4, 9);
        let rendered = err.to_string();
        assert_eq!(rendered, "Expected operand, found ','");
        assert_eq!(err.location(), Some(SourceLocation::new(4, 9)));
    }

    #[test]
    fn test_flatten_multiple() {
        let nested = AssemblerError::MultipleErrors(vec![
            err_symbol("a", 0, 0),
            AssemblerError::MultipleErrors(vec![err_symbol("b", 1, 0), err_symbol("c", 2, 0)]),
        ]);
        let flat = nested.flatten();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[2], err_symbol("c", 2, 0));
    }

    #[test]
    fn test_err_multiple_unwraps_single() {
        let err = err_multiple(vec![err_semantic("x", 1, 2)]);
        assert_eq!(err, err_semantic("x", 1, 2));
    }

    #[test]
    fn test_diagnostics_from_error() {
        let err = err_multiple(vec![err_symbol("undefined label 'a'", 3, 4), err_symbol("b", 5, 6)]);
        let diags = Diagnostic::from_error(err, Stage::Analyzer);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "undefined label 'a'");
        assert_eq!((diags[0].line, diags[0].column), (3, 4));
        assert_eq!(diags[1].stage, Stage::Analyzer);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.asm");
        let err = AssemblerError::from(io);
        assert_eq!(err, AssemblerError::IoError("missing.asm".to_string()));
        assert_eq!(err.location(), None);
    }

    #[test]
    fn test_location_display_is_one_based() {
        assert_eq!(SourceLocation::new(0, 3).to_string(), "1:4");
    }
}
