//! Document analyser for editor tooling.
//!
//! Runs the pipeline stage by stage and keeps whatever the stages before the
//! first failure produced, so a half-broken document still yields tokens (and
//! possibly a syntax tree) for position queries.
use tracing::debug;

use crate::assembler::Assembler;
use crate::ast::Program;
use crate::config::AssemblerConfig;
use crate::error::{Diagnostic, Stage};
use crate::lexer::{Token, tokenize};
use crate::parser::parse;
use crate::symbol::SymbolTable;

/// Outcome of analysing one document.
///
/// Exactly one of four shapes: all present with no diagnostics, or
/// diagnostics plus the products of the stages that succeeded.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub diagnostics: Vec<Diagnostic>,
    pub tokens: Option<Vec<Token>>,
    pub program: Option<Program>,
    pub symbols: Option<SymbolTable>,
}

impl AnalysisResult {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Stage that produced the diagnostics, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.diagnostics.first().map(|d| d.stage)
    }
}

/// Analyses `source`, stopping at the first stage that fails.
pub fn analyse(source: &str, config: &AssemblerConfig) -> AnalysisResult {
    let tokens = match tokenize(source) {
        Ok(tokens) => tokens,
        Err(e) => {
            return AnalysisResult {
                diagnostics: Diagnostic::from_error(e, Stage::Lexer),
                ..Default::default()
            };
        }
    };

    let program = match parse(&tokens) {
        Ok(program) => program,
        Err(e) => {
            return AnalysisResult {
                diagnostics: Diagnostic::from_error(e, Stage::Parser),
                tokens: Some(tokens),
                ..Default::default()
            };
        }
    };

    let assembler = Assembler::new(*config);
    let analysed = assembler
        .layout(&program)
        .and_then(|mut layout| assembler.resolve(&mut layout).map(|()| layout));

    match analysed {
        Ok(layout) => {
            debug!(tokens = tokens.len(), statements = program.len(), "document is valid");
            AnalysisResult {
                diagnostics: Vec::new(),
                tokens: Some(tokens),
                program: Some(program),
                symbols: Some(layout.symbols),
            }
        }
        Err(e) => AnalysisResult {
            diagnostics: Diagnostic::from_error(e, Stage::Analyzer),
            tokens: Some(tokens),
            program: Some(program),
            symbols: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> AnalysisResult {
        analyse(source, &AssemblerConfig::default())
    }

    #[test]
    fn test_valid_document() {
        let result = run("start: ldi r0, 0x01\njmp [start]\n");
        assert!(result.is_ok());
        assert!(result.tokens.is_some());
        assert_eq!(result.program.unwrap().len(), 2);
        assert_eq!(result.symbols.unwrap().address_of("start"), Some(0));
    }

    #[test]
    fn test_lexer_failure_shape() {
        let result = run("nop\n$$$invalid\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.failed_stage(), Some(Stage::Lexer));
        assert_eq!(result.diagnostics[0].line, 1);
        assert!(result.tokens.is_none());
        assert!(result.program.is_none());
        assert!(result.symbols.is_none());
    }

    #[test]
    fn test_parser_failure_shape() {
        let result = run("ldi r0, ,\n.byte ,\n");
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.failed_stage(), Some(Stage::Parser));
        assert!(result.tokens.is_some());
        assert!(result.program.is_none());
        assert!(result.symbols.is_none());
    }

    #[test]
    fn test_analyzer_failure_shape() {
        let result = run("jmp [nonexistent]\n.byte 0x1FF\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.failed_stage(), Some(Stage::Analyzer));
        assert!(result.tokens.is_some());
        assert!(result.program.is_some());
        assert!(result.symbols.is_none());

        let result = run("jmp [nonexistent]\n");
        assert_eq!(result.diagnostics[0].message, "Undefined label 'nonexistent'");
        assert_eq!(
            (result.diagnostics[0].line, result.diagnostics[0].column),
            (0, 4)
        );
    }
}
