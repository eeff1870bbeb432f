//! Parser for minasm assembly language.
//!
//! This module turns the token sequence produced by the lexer into a
//! [`Program`]. Grammar errors are collected line by line: after an error the
//! rest of the offending line is skipped and parsing resumes on the next one,
//! so independent mistakes are all reported. No program is returned once any
//! error occurred.

use crate::ast::{
    Comment, DirectiveNode, DirectiveOperandSet, HeaderDirective, InstructionNode,
    LabelDefinition, MemoryOperand, MemoryTarget, NodeSpan, Operand, Payload, Program, Section,
    Statement,
};
use crate::error::{AssemblerError, err_parse};
use crate::lexer::{Token, TokenKind};
use std::iter::Peekable;
use std::slice::Iter;
use tracing::debug;

/// Parses a complete token sequence into a program.
pub fn parse(tokens: &[Token]) -> Result<Program, AssemblerError> {
    Parser::new(tokens).parse_program()
}

/// Parser for minasm assembly language.
pub struct Parser<'a> {
    tokens: Peekable<Iter<'a, Token>>,
    /// Line of the last consumed token
    line: usize,
    /// Column just past the last consumed token
    column: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser from a series of tokens.
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens: tokens.iter().peekable(),
            line: 0,
            column: 0,
        }
    }

    /// Parses the entire token stream into a [`Program`].
    pub fn parse_program(&mut self) -> Result<Program, AssemblerError> {
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        while self.peek_token().is_some() {
            match self.parse_line() {
                Ok(Some(statement)) => statements.push(statement),
                Ok(None) => {}
                Err(e) => {
                    errors.push(e);
                    self.consume_to_end_of_line();
                }
            }
        }

        if !errors.is_empty() {
            debug!(errors = errors.len(), "parse failed");
            return Err(AssemblerError::MultipleErrors(errors));
        }

        debug!(statements = statements.len(), "parse complete");
        Ok(Program::new(statements))
    }

    /// Parses a single line of assembly, including its terminating newline.
    ///
    /// Returns `Ok(None)` for blank lines.
    pub fn parse_line(&mut self) -> Result<Option<Statement>, AssemblerError> {
        let first = match self.peek_token() {
            Some(token) => token.clone(),
            None => return Ok(None),
        };

        if first.is(TokenKind::Newline) {
            self.consume_token();
            return Ok(None);
        }

        let mut header = None;
        let mut label = None;

        // Header and label may appear in either order, once each.
        loop {
            if self.at_header() {
                if header.is_some() {
                    let token = self.peek_token().unwrap();
                    return Err(err_parse(
                        "Only one section header is allowed per statement",
                        token.loc.line,
                        token.loc.col,
                    ));
                }
                header = Some(self.parse_header());
            } else if self.peek_token_is(TokenKind::Identifier)
                && self.peek_second_token_is(TokenKind::Colon)
            {
                if label.is_some() {
                    let token = self.peek_token().unwrap();
                    return Err(err_parse(
                        "Only one label definition is allowed per statement",
                        token.loc.line,
                        token.loc.col,
                    ));
                }
                label = Some(self.parse_label());
            } else {
                break;
            }
        }

        let payload = if self.peek_token_is(TokenKind::Dot) {
            Some(Payload::Directive(self.parse_directive()?))
        } else if self.peek_token_is(TokenKind::Identifier) {
            Some(Payload::Instruction(self.parse_instruction()?))
        } else if self.at_line_end() {
            None
        } else {
            let token = self.peek_token().unwrap();
            return Err(err_parse(
                format!(
                    "Unexpected token {}, expected instruction or directive",
                    describe(token)
                ),
                token.loc.line,
                token.loc.col,
            ));
        };

        let comment = if self.peek_token_is(TokenKind::Comment) {
            let token = self.consume_token().unwrap();
            Some(Comment {
                text: token.text.clone(),
                span: NodeSpan::of_token(token),
            })
        } else {
            None
        };

        let span = NodeSpan::new(first.loc.line, first.loc.col, Some(self.column));
        self.expect_end_of_line()?;

        Ok(Some(Statement {
            span,
            header,
            label,
            payload,
            comment,
        }))
    }

    /// Parses `.text` / `.data`. Callers check [`Parser::at_header`] first.
    fn parse_header(&mut self) -> HeaderDirective {
        let dot = self.consume_token().unwrap().clone();
        let name = self.consume_token().unwrap().clone();
        HeaderDirective {
            // at_header guarantees the name is a known section
            section: Section::from_name(&name.text).unwrap_or(Section::Text),
            span: NodeSpan::between(&dot, &name),
        }
    }

    /// Parses `name:`. Callers check the identifier/colon pair first.
    fn parse_label(&mut self) -> LabelDefinition {
        let name = self.consume_token().unwrap().clone();
        self.consume_token(); // Consume the colon
        LabelDefinition {
            span: NodeSpan::of_token(&name),
            name: name.text,
        }
    }

    /// Parses a payload directive (like `.byte 0x01`).
    fn parse_directive(&mut self) -> Result<DirectiveNode, AssemblerError> {
        let dot = self.consume_token().unwrap().clone();

        let name = match self.peek_token() {
            Some(token) if token.is(TokenKind::Identifier) => token.clone(),
            Some(token) => {
                return Err(err_parse(
                    format!("Expected directive name after '.', found {}", describe(token)),
                    token.loc.line,
                    token.loc.col,
                ));
            }
            None => {
                return Err(err_parse(
                    "Unexpected end of input, expected directive name",
                    self.line,
                    self.column,
                ));
            }
        };
        self.consume_token();

        let mut operands = Vec::new();
        if !self.at_line_end() {
            operands.push(self.parse_directive_operand()?);
            while self.peek_token_is(TokenKind::Comma) {
                self.consume_token(); // Consume the comma
                operands.push(self.parse_directive_operand()?);
            }
            self.expect_operand_list_end()?;
        }

        let span = NodeSpan::new(dot.loc.line, dot.loc.col, Some(self.column));
        Ok(DirectiveNode {
            name: name.text,
            operands: DirectiveOperandSet::classify(operands),
            span,
        })
    }

    fn parse_directive_operand(&mut self) -> Result<Token, AssemblerError> {
        if self.peek_token_is(TokenKind::Number)
            || self.peek_token_is(TokenKind::String)
            || self.peek_token_is(TokenKind::Identifier)
        {
            return Ok(self.consume_token().unwrap().clone());
        }

        match self.peek_token() {
            Some(token) => Err(err_parse(
                format!("Expected directive operand, found {}", describe(token)),
                token.loc.line,
                token.loc.col,
            )),
            None => Err(err_parse(
                "Unexpected end of input, expected directive operand",
                self.line,
                self.column,
            )),
        }
    }

    /// Parses an instruction (mnemonic + operands)
    fn parse_instruction(&mut self) -> Result<InstructionNode, AssemblerError> {
        let mnemonic = self.consume_token().unwrap().clone();

        let mut operands = Vec::new();
        if !self.at_line_end() {
            // Parse the first operand
            operands.push(self.parse_operand()?);

            // Parse any additional operands separated by commas
            while self.peek_token_is(TokenKind::Comma) {
                self.consume_token(); // Consume the comma
                operands.push(self.parse_operand()?);
            }
            self.expect_operand_list_end()?;
        }

        let span = NodeSpan::new(mnemonic.loc.line, mnemonic.loc.col, Some(self.column));
        Ok(InstructionNode {
            mnemonic: mnemonic.text,
            operands,
            span,
        })
    }

    /// Parses an operand (register, immediate or memory reference)
    fn parse_operand(&mut self) -> Result<Operand, AssemblerError> {
        if self.peek_token_is(TokenKind::Register) {
            Ok(Operand::Register(self.consume_token().unwrap().clone()))
        } else if self.peek_token_is(TokenKind::Number) {
            Ok(Operand::Immediate(self.consume_token().unwrap().clone()))
        } else if self.peek_token_is(TokenKind::LBracket) {
            self.parse_memory_operand().map(Operand::Memory)
        } else {
            match self.peek_token() {
                Some(token) => Err(err_parse(
                    format!("Expected operand, found {}", describe(token)),
                    token.loc.line,
                    token.loc.col,
                )),
                None => Err(err_parse(
                    "Unexpected end of input, expected operand",
                    self.line,
                    self.column,
                )),
            }
        }
    }

    /// Parses `[0x1234]`, `[label]` or `[label+0x02]`.
    fn parse_memory_operand(&mut self) -> Result<MemoryOperand, AssemblerError> {
        let open = self.consume_token().unwrap().clone();

        let target = if self.peek_token_is(TokenKind::Number) {
            MemoryTarget::Absolute(self.consume_token().unwrap().clone())
        } else if self.peek_token_is(TokenKind::Identifier) {
            let name = self.consume_token().unwrap().clone();
            let offset = if self.peek_token_is(TokenKind::Plus) || self.peek_token_is(TokenKind::Minus)
            {
                let negative = self.consume_token().unwrap().is(TokenKind::Minus);
                let magnitude = self.expect_token(TokenKind::Number)?.clone();
                Some((negative, magnitude))
            } else {
                None
            };
            MemoryTarget::Label { name, offset }
        } else {
            return match self.peek_token() {
                Some(token) => Err(err_parse(
                    format!("Expected address or label, found {}", describe(token)),
                    token.loc.line,
                    token.loc.col,
                )),
                None => Err(err_parse(
                    "Unexpected end of input, expected address or label",
                    self.line,
                    self.column,
                )),
            };
        };

        let close = self.expect_token(TokenKind::RBracket)?.clone();

        Ok(MemoryOperand {
            target,
            span: NodeSpan::between(&open, &close),
        })
    }

    // Helper methods for token handling

    fn peek_token(&mut self) -> Option<&'a Token> {
        self.tokens.peek().copied()
    }

    fn peek_token_is(&mut self, kind: TokenKind) -> bool {
        self.peek_token().is_some_and(|t| t.kind == kind)
    }

    fn peek_second_token(&self) -> Option<&'a Token> {
        let mut iter = self.tokens.clone();
        iter.next(); // Skip first token
        iter.next()
    }

    fn peek_second_token_is(&self, kind: TokenKind) -> bool {
        self.peek_second_token().is_some_and(|t| t.kind == kind)
    }

    fn consume_token(&mut self) -> Option<&'a Token> {
        let token = self.tokens.next();
        if let Some(t) = token {
            self.line = t.loc.line;
            if t.kind != TokenKind::Newline {
                self.column = t.end_col();
            }
        }
        token
    }

    /// True at a `.text`/`.data` section header.
    fn at_header(&mut self) -> bool {
        self.peek_token_is(TokenKind::Dot)
            && self.peek_second_token().is_some_and(|t| {
                t.kind == TokenKind::Identifier && Section::from_name(&t.text).is_some()
            })
    }

    /// True when only an optional comment and the newline remain.
    fn at_line_end(&mut self) -> bool {
        match self.peek_token() {
            None => true,
            Some(t) => t.kind == TokenKind::Newline || t.kind == TokenKind::Comment,
        }
    }

    /// Expect a token of a specific kind, returning an error if it's not found.
    fn expect_token(&mut self, expected_kind: TokenKind) -> Result<&'a Token, AssemblerError> {
        if let Some(token) = self.peek_token() {
            if token.kind == expected_kind {
                Ok(self.consume_token().unwrap())
            } else {
                Err(err_parse(
                    format!("Expected {}, found {}", kind_name(expected_kind), describe(token)),
                    token.loc.line,
                    token.loc.col,
                ))
            }
        } else {
            Err(err_parse(
                format!("Unexpected end of input, expected {}", kind_name(expected_kind)),
                self.line,
                self.column,
            ))
        }
    }

    /// After an operand list only a comment or the newline may follow.
    fn expect_operand_list_end(&mut self) -> Result<(), AssemblerError> {
        if self.at_line_end() {
            return Ok(());
        }
        let token = self.peek_token().unwrap();
        Err(err_parse(
            format!("Expected ',' between operands, found {}", describe(token)),
            token.loc.line,
            token.loc.col,
        ))
    }

    fn expect_end_of_line(&mut self) -> Result<(), AssemblerError> {
        if self.peek_token_is(TokenKind::Newline) {
            self.consume_token();
            return Ok(());
        }

        match self.peek_token() {
            None => Ok(()),
            Some(token) => Err(err_parse(
                format!("Unexpected token {} at end of statement", describe(token)),
                token.loc.line,
                token.loc.col,
            )),
        }
    }

    /// Consumes tokens until the end of the current line is reached.
    fn consume_to_end_of_line(&mut self) {
        while let Some(token) = self.peek_token() {
            if token.kind == TokenKind::Newline {
                self.consume_token();
                break;
            }
            self.consume_token();
        }
    }
}

/// Quoted lexeme, or a word for the synthetic newline.
fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Newline => "end of statement".to_string(),
        _ => format!("'{}'", token.text),
    }
}

fn kind_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Dot => "'.'",
        TokenKind::Comma => "','",
        TokenKind::Colon => "':'",
        TokenKind::LBracket => "'['",
        TokenKind::RBracket => "']'",
        TokenKind::Plus => "'+'",
        TokenKind::Minus => "'-'",
        TokenKind::Number => "number",
        TokenKind::String => "string",
        TokenKind::Register => "register",
        TokenKind::Identifier => "identifier",
        TokenKind::Comment => "comment",
        TokenKind::Newline => "end of statement",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SourceLocation, lexer::tokenize};

    fn create_token(kind: TokenKind, text: &str, line: usize, col: usize) -> Token {
        Token {
            kind,
            text: text.to_string(),
            loc: SourceLocation { line, col },
        }
    }

    fn parse_source(source: &str) -> Result<Program, AssemblerError> {
        parse(&tokenize(source).unwrap())
    }

    fn parse_errors(source: &str) -> Vec<AssemblerError> {
        parse_source(source).unwrap_err().flatten()
    }

    #[test]
    fn test_consume_to_end_of_line() {
        let tokens = vec![
            create_token(TokenKind::Identifier, "label", 0, 0),
            create_token(TokenKind::Colon, ":", 0, 5),
            create_token(TokenKind::Newline, "\n", 0, 6),
            create_token(TokenKind::Identifier, "nop", 1, 0),
        ];

        let mut parser = Parser::new(&tokens);
        parser.consume_to_end_of_line();
        assert_eq!(parser.tokens.len(), 1);

        let tokens = vec![
            create_token(TokenKind::Identifier, "label", 0, 0),
            create_token(TokenKind::Colon, ":", 0, 5),
        ];
        let mut parser = Parser::new(&tokens);
        parser.consume_to_end_of_line();
        assert_eq!(parser.tokens.len(), 0);
    }

    #[test]
    fn test_expect_token() {
        let tokens = vec![
            create_token(TokenKind::Identifier, "label", 0, 0),
            create_token(TokenKind::Colon, ":", 0, 5),
            create_token(TokenKind::Newline, "\n", 0, 6),
        ];

        let mut parser = Parser::new(&tokens);

        parser.expect_token(TokenKind::Identifier).unwrap();
        parser.expect_token(TokenKind::Colon).unwrap();
        assert!(parser.expect_token(TokenKind::Number).is_err());
        parser.expect_token(TokenKind::Newline).unwrap();

        assert!(parser.expect_token(TokenKind::Newline).is_err());
    }

    #[test]
    fn test_peek_helpers() {
        let tokens = vec![
            create_token(TokenKind::Identifier, "label", 0, 0),
            create_token(TokenKind::Colon, ":", 0, 5),
            create_token(TokenKind::Newline, "\n", 0, 6),
        ];

        let mut parser = Parser::new(&tokens);

        assert!(parser.peek_token_is(TokenKind::Identifier));
        assert!(parser.peek_second_token_is(TokenKind::Colon));
        assert_eq!(
            parser.peek_token(),
            Some(&create_token(TokenKind::Identifier, "label", 0, 0))
        );
    }

    #[test]
    fn test_parse_simple_instruction() {
        let program = parse_source("ldi r0, 0x05").unwrap();
        assert_eq!(program.len(), 1);

        match &program.statements[0].payload {
            Some(Payload::Instruction(instr)) => {
                assert_eq!(instr.mnemonic, "ldi");
                assert_eq!(instr.operands.len(), 2);
                assert!(matches!(&instr.operands[0], Operand::Register(t) if t.text == "r0"));
                assert!(matches!(&instr.operands[1], Operand::Immediate(t) if t.text == "0x05"));
                assert_eq!(instr.span, NodeSpan::new(0, 0, Some(12)));
            }
            other => panic!("Expected Instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_label_and_instruction() {
        let program = parse_source("loop: jmp [loop]").unwrap();
        let statement = &program.statements[0];

        let label = statement.label.as_ref().unwrap();
        assert_eq!(label.name, "loop");
        assert_eq!(label.span, NodeSpan::new(0, 0, Some(4)));

        match &statement.payload {
            Some(Payload::Instruction(instr)) => match &instr.operands[0] {
                Operand::Memory(MemoryOperand {
                    target: MemoryTarget::Label { name, offset: None },
                    span,
                }) => {
                    assert_eq!(name.text, "loop");
                    assert_eq!(*span, NodeSpan::new(0, 10, Some(16)));
                }
                other => panic!("Expected label memory operand, got {:?}", other),
            },
            other => panic!("Expected Instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_memory_operand_forms() {
        let program = parse_source("ld r1, [table-0x02]\nst [0x8000], r2\ncall [func+3]").unwrap();
        let operands: Vec<&Operand> = program
            .statements
            .iter()
            .filter_map(|s| match &s.payload {
                Some(Payload::Instruction(i)) => i.operands.iter().find(|o| matches!(o, Operand::Memory(_))),
                _ => None,
            })
            .collect();

        assert_eq!(operands.len(), 3);
        assert!(matches!(
            operands[0],
            Operand::Memory(MemoryOperand { target: MemoryTarget::Label { offset: Some((true, t)), .. }, .. }) if t.text == "0x02"
        ));
        assert!(matches!(
            operands[1],
            Operand::Memory(MemoryOperand { target: MemoryTarget::Absolute(t), .. }) if t.text == "0x8000"
        ));
        assert!(matches!(
            operands[2],
            Operand::Memory(MemoryOperand { target: MemoryTarget::Label { offset: Some((false, t)), .. }, .. }) if t.text == "3"
        ));
    }

    #[test]
    fn test_parse_header_label_directive_comment() {
        let program = parse_source(".data msg: .string \"hi\" ; greeting").unwrap();
        let statement = &program.statements[0];

        assert_eq!(statement.header.unwrap().section, Section::Data);
        assert_eq!(statement.label.as_ref().unwrap().name, "msg");
        match &statement.payload {
            Some(Payload::Directive(dir)) => {
                assert_eq!(dir.name, "string");
                assert!(matches!(&dir.operands, DirectiveOperandSet::SingleString(t) if t.text == "\"hi\""));
            }
            other => panic!("Expected Directive, got {:?}", other),
        }
        assert_eq!(statement.comment.as_ref().unwrap().text, "; greeting");
    }

    #[test]
    fn test_label_before_header() {
        let program = parse_source("start: .text nop").unwrap();
        let statement = &program.statements[0];
        assert_eq!(statement.header.unwrap().section, Section::Text);
        assert_eq!(statement.label.as_ref().unwrap().name, "start");
        assert!(matches!(statement.payload, Some(Payload::Instruction(_))));
    }

    #[test]
    fn test_parse_directive_operand_pair() {
        let program = parse_source("  .org 0x10, 0xFF").unwrap();
        match &program.statements[0].payload {
            Some(Payload::Directive(dir)) => {
                assert_eq!(dir.name, "org");
                assert_eq!(dir.span.start, 2);
                match &dir.operands {
                    DirectiveOperandSet::ImmediatePair { address, fill } => {
                        assert_eq!(address.text, "0x10");
                        assert_eq!(fill.text, "0xFF");
                    }
                    other => panic!("Expected ImmediatePair, got {:?}", other),
                }
            }
            other => panic!("Expected Directive, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let program = parse_source("\n   \n; just a comment\nnop\n").unwrap();
        assert_eq!(program.len(), 2);
        assert!(program.statements[0].comment.is_some());
        assert!(program.statements[0].payload.is_none());
        assert!(program.statements[1].payload.is_some());
    }

    #[test]
    fn test_doubled_separator() {
        let errors = parse_errors("ldi r0, ,");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location(), Some(SourceLocation::new(0, 8)));
        assert!(matches!(errors[0], AssemblerError::ParserError { .. }));
    }

    #[test]
    fn test_missing_operand() {
        let errors = parse_errors("add r1,\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "Expected operand, found end of statement");
    }

    #[test]
    fn test_multiple_errors_are_collected() {
        let source = "ldi r0, ,\nnop\n.byte ,\nld r1, [0x10\nmov r1 r2\n";
        let errors = parse_errors(source);
        let lines: Vec<usize> = errors.iter().map(|e| e.location().unwrap().line).collect();
        assert_eq!(lines, vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_parse_errors() {
        // Stray token where a statement should start
        assert!(parse_source(", nop").is_err());
        // Directive without a name
        assert!(parse_source(". 0x01").is_err());
        // Offset without a number
        assert!(parse_source("jmp [main+]").is_err());
        // Two labels
        assert!(parse_source("a: b: nop").is_err());
        // Two headers
        assert!(parse_source(".text .data").is_err());
    }

    #[test]
    fn test_parse_multiple_lines() {
        let source = r#"
            .text
            main:
                ldi r0, 0x01
                call [function]
                hlt

            function:           ; subroutine
                inc r0
                ret
            .data
            value: .short 0x1234
        "#;

        let program = parse_source(source).unwrap();

        // 2 headers, 2 labels on their own, 5 instructions, 1 labelled directive
        assert_eq!(program.len(), 10);
        let labels: Vec<&str> = program.labels().map(|l| l.name.as_str()).collect();
        assert_eq!(labels, vec!["main", "function", "value"]);
    }
}
