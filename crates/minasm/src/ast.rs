//! Syntax tree produced by the parser.
use crate::error::SourceLocation;
use crate::lexer::Token;

/// Source range of a node: one line, a start column and an optional end
/// column (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeSpan {
    pub line: usize,
    pub start: usize,
    pub end: Option<usize>,
}

impl NodeSpan {
    pub fn new(line: usize, start: usize, end: Option<usize>) -> Self {
        NodeSpan { line, start, end }
    }

    /// Span covering a single token.
    pub fn of_token(token: &Token) -> Self {
        NodeSpan::new(token.loc.line, token.loc.col, Some(token.end_col()))
    }

    /// Span from the start of `first` to the end of `last` (same line).
    pub fn between(first: &Token, last: &Token) -> Self {
        NodeSpan::new(first.loc.line, first.loc.col, Some(last.end_col()))
    }

    pub fn loc(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.start)
    }
}

/// A whole assembly unit, statements in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Program { statements }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// All label definitions in source order.
    pub fn labels(&self) -> impl Iterator<Item = &LabelDefinition> {
        self.statements.iter().filter_map(|s| s.label.as_ref())
    }
}

/// One logical source line. At most one of each part may be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub span: NodeSpan,
    pub header: Option<HeaderDirective>,
    pub label: Option<LabelDefinition>,
    pub payload: Option<Payload>,
    pub comment: Option<Comment>,
}

/// Section marker, `.text` or `.data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Text,
    Data,
}

impl Section {
    pub fn from_name(name: &str) -> Option<Section> {
        [Section::Text, Section::Data]
            .into_iter()
            .find(|section| section.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            Section::Text => "text",
            Section::Data => "data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderDirective {
    pub section: Section,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDefinition {
    pub name: String,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub span: NodeSpan,
}

/// What a statement contributes to the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Directive(DirectiveNode),
    Instruction(InstructionNode),
}

impl Payload {
    pub fn span(&self) -> NodeSpan {
        match self {
            Payload::Directive(d) => d.span,
            Payload::Instruction(i) => i.span,
        }
    }
}

/// A payload directive such as `.byte 0x01`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveNode {
    /// Name without the leading dot, as written.
    pub name: String,
    pub operands: DirectiveOperandSet,
    pub span: NodeSpan,
}

/// Operand shapes a directive can carry. The parser only classifies the
/// tokens; whether the shape suits the directive is decided by analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveOperandSet {
    NoOperand,
    SingleHexNumber(Token),
    SingleString(Token),
    SingleLabel(Token),
    /// `address, fill`; the address may be a number or a label.
    ImmediatePair { address: Token, fill: Token },
    Unrecognized(Vec<Token>),
}

impl DirectiveOperandSet {
    /// Classifies a directive's operand tokens.
    pub fn classify(mut tokens: Vec<Token>) -> Self {
        use crate::lexer::TokenKind;

        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        match kinds.as_slice() {
            [] => DirectiveOperandSet::NoOperand,
            [TokenKind::Number] => DirectiveOperandSet::SingleHexNumber(tokens.remove(0)),
            [TokenKind::String] => DirectiveOperandSet::SingleString(tokens.remove(0)),
            [TokenKind::Identifier] => DirectiveOperandSet::SingleLabel(tokens.remove(0)),
            [TokenKind::Number | TokenKind::Identifier, TokenKind::Number] => {
                let fill = tokens.remove(1);
                let address = tokens.remove(0);
                DirectiveOperandSet::ImmediatePair { address, fill }
            }
            _ => DirectiveOperandSet::Unrecognized(tokens),
        }
    }

    /// Short human description of the shape, used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            DirectiveOperandSet::NoOperand => "no operand",
            DirectiveOperandSet::SingleHexNumber(_) => "a single number",
            DirectiveOperandSet::SingleString(_) => "a single string",
            DirectiveOperandSet::SingleLabel(_) => "a single label",
            DirectiveOperandSet::ImmediatePair { .. } => "an address and a fill value",
            DirectiveOperandSet::Unrecognized(_) => "an unsupported operand list",
        }
    }
}

/// A machine instruction such as `ldi r0, 0x05`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionNode {
    /// Mnemonic as written.
    pub mnemonic: String,
    pub operands: Vec<Operand>,
    pub span: NodeSpan,
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(Token),
    Immediate(Token),
    Memory(MemoryOperand),
}

impl Operand {
    pub fn span(&self) -> NodeSpan {
        match self {
            Operand::Register(t) | Operand::Immediate(t) => NodeSpan::of_token(t),
            Operand::Memory(m) => m.span,
        }
    }
}

/// Bracketed memory operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOperand {
    pub target: MemoryTarget,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryTarget {
    /// `[0x1234]`
    Absolute(Token),
    /// `[label]`, `[label+0x02]`, `[label-0x01]`
    Label {
        name: Token,
        /// Sign and magnitude of the offset, if written.
        offset: Option<(bool, Token)>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn token(kind: TokenKind, text: &str, col: usize) -> Token {
        Token::new(kind, text, 0, col)
    }

    #[test]
    fn test_classify_operand_sets() {
        assert_eq!(DirectiveOperandSet::classify(vec![]), DirectiveOperandSet::NoOperand);

        let n = token(TokenKind::Number, "0x10", 5);
        assert_eq!(
            DirectiveOperandSet::classify(vec![n.clone()]),
            DirectiveOperandSet::SingleHexNumber(n.clone())
        );

        let s = token(TokenKind::String, "\"ab\"", 8);
        assert_eq!(
            DirectiveOperandSet::classify(vec![s.clone()]),
            DirectiveOperandSet::SingleString(s.clone())
        );

        let fill = token(TokenKind::Number, "0xFF", 11);
        assert_eq!(
            DirectiveOperandSet::classify(vec![n.clone(), fill.clone()]),
            DirectiveOperandSet::ImmediatePair {
                address: n.clone(),
                fill: fill.clone()
            }
        );

        let set = DirectiveOperandSet::classify(vec![s.clone(), n.clone()]);
        assert!(matches!(set, DirectiveOperandSet::Unrecognized(ref t) if t.len() == 2));
    }

    #[test]
    fn test_section_names_ignore_case() {
        assert_eq!(Section::from_name("text"), Some(Section::Text));
        assert_eq!(Section::from_name("DATA"), Some(Section::Data));
        assert_eq!(Section::from_name("byte"), None);
    }

    #[test]
    fn test_span_between_tokens() {
        let first = token(TokenKind::Identifier, "ldi", 2);
        let last = token(TokenKind::Number, "0x05", 10);
        let span = NodeSpan::between(&first, &last);
        assert_eq!(span, NodeSpan::new(0, 2, Some(14)));
        assert_eq!(span.loc(), SourceLocation::new(0, 2));
    }
}
