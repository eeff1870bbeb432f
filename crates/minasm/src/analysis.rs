//! Analysis nodes: semantic validation of directives and instructions.
//!
//! Each node is built from its AST node plus the current [`LayoutContext`],
//! checks the operand shape and produces emit nodes whose sizes are known
//! immediately. Label references inside memory operands stay unresolved
//! until the assembler's resolution pass.
use std::fmt;

use crate::ast::{
    DirectiveNode, DirectiveOperandSet, InstructionNode, MemoryTarget, NodeSpan, Operand, Payload,
};
use crate::config::AddressWidth;
use crate::emit::{DataNode, EmitNode, FillNode, LabelReference};
use crate::error::{AssemblerError, err_semantic};
use crate::isa::{self, InstructionSpec, OperandKind};
use crate::symbol::SymbolTable;
use crate::value::{
    parse_hex_byte, parse_hex_short, parse_number, parse_offset, resolve_address, unescape_string,
};

/// What analysis may know about the program so far.
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext<'a> {
    /// Current location counter.
    pub location: u32,
    /// Labels defined so far.
    pub symbols: &'a SymbolTable,
    pub width: AddressWidth,
}

/// Common contract of all analysis nodes.
pub trait AnalysisNode: fmt::Debug {
    fn span(&self) -> NodeSpan;

    fn emit_nodes(&self) -> &[EmitNode];

    fn into_emit_nodes(self: Box<Self>) -> Vec<EmitNode>;

    /// Total bytes this node contributes.
    fn count(&self) -> usize {
        self.emit_nodes().iter().map(EmitNode::count).sum()
    }

    /// Final bytes. Fails while label references are unresolved.
    fn emit_bytes(&self) -> Result<Vec<u8>, AssemblerError> {
        let mut bytes = Vec::with_capacity(self.count());
        for node in self.emit_nodes() {
            bytes.extend(node.emit()?);
        }
        Ok(bytes)
    }
}

macro_rules! impl_analysis_node {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl AnalysisNode for $ty {
                fn span(&self) -> NodeSpan {
                    self.span
                }

                fn emit_nodes(&self) -> &[EmitNode] {
                    &self.nodes
                }

                fn into_emit_nodes(self: Box<Self>) -> Vec<EmitNode> {
                    self.nodes
                }
            }
        )+
    };
}

impl_analysis_node!(
    ByteDirective,
    ShortDirective,
    StringDirective,
    ZeroDirective,
    OrgDirective,
    InstructionAnalysis,
);

fn shape_error(node: &DirectiveNode, expected: &str) -> AssemblerError {
    err_semantic(
        format!(
            "Directive '.{}' expects {}, found {}",
            node.name,
            expected,
            node.operands.describe()
        ),
        node.span.line,
        node.span.start,
    )
}

/// `.byte 0x12`
#[derive(Debug)]
pub struct ByteDirective {
    pub span: NodeSpan,
    pub value: u8,
    nodes: Vec<EmitNode>,
}

impl ByteDirective {
    pub fn new(node: &DirectiveNode) -> Result<Self, AssemblerError> {
        let value = match &node.operands {
            DirectiveOperandSet::SingleHexNumber(token) => parse_hex_byte(token)?,
            _ => return Err(shape_error(node, "a single hex byte")),
        };
        Ok(ByteDirective {
            span: node.span,
            value,
            nodes: vec![DataNode::new(node.span, vec![value]).into()],
        })
    }
}

/// `.short 0x1234`, stored little-endian.
#[derive(Debug)]
pub struct ShortDirective {
    pub span: NodeSpan,
    pub value: u16,
    nodes: Vec<EmitNode>,
}

impl ShortDirective {
    pub fn new(node: &DirectiveNode) -> Result<Self, AssemblerError> {
        let value = match &node.operands {
            DirectiveOperandSet::SingleHexNumber(token) => parse_hex_short(token)?,
            _ => return Err(shape_error(node, "a single hex short")),
        };
        Ok(ShortDirective {
            span: node.span,
            value,
            nodes: vec![DataNode::new(node.span, value.to_le_bytes().to_vec()).into()],
        })
    }
}

/// `.string "text"`, NUL-terminated.
#[derive(Debug)]
pub struct StringDirective {
    pub span: NodeSpan,
    nodes: Vec<EmitNode>,
}

impl StringDirective {
    pub fn new(node: &DirectiveNode) -> Result<Self, AssemblerError> {
        let mut bytes = match &node.operands {
            DirectiveOperandSet::SingleString(token) => unescape_string(token)?,
            _ => return Err(shape_error(node, "a single string literal")),
        };
        bytes.push(0);
        Ok(StringDirective {
            span: node.span,
            nodes: vec![DataNode::new(node.span, bytes).into()],
        })
    }
}

/// `.zero 0x03`: that many zero bytes.
#[derive(Debug)]
pub struct ZeroDirective {
    pub span: NodeSpan,
    pub count: u32,
    nodes: Vec<EmitNode>,
}

impl ZeroDirective {
    pub fn new(node: &DirectiveNode) -> Result<Self, AssemblerError> {
        let count = match &node.operands {
            DirectiveOperandSet::SingleHexNumber(token) => parse_number(token)?,
            _ => return Err(shape_error(node, "a single count")),
        };
        Ok(ZeroDirective {
            span: node.span,
            count,
            nodes: vec![FillNode::new(node.span, 0, count as usize).into()],
        })
    }
}

/// `.org address[, fill]`: pads up to `address` with `fill` (default 0x00).
#[derive(Debug)]
pub struct OrgDirective {
    pub span: NodeSpan,
    pub target: u32,
    pub fill: u8,
    nodes: Vec<EmitNode>,
}

impl OrgDirective {
    pub fn new(node: &DirectiveNode, ctx: &LayoutContext<'_>) -> Result<Self, AssemblerError> {
        let (address, fill) = match &node.operands {
            DirectiveOperandSet::SingleHexNumber(address)
            | DirectiveOperandSet::SingleLabel(address) => (address, None),
            DirectiveOperandSet::ImmediatePair { address, fill } => (address, Some(fill)),
            _ => return Err(shape_error(node, "an address and an optional fill byte")),
        };

        let target = resolve_address(address, ctx.symbols)?;
        if target > ctx.width.max_address() {
            return Err(err_semantic(
                format!(
                    "Address 0x{:X} is outside the {}-bit address space",
                    target,
                    ctx.width.bits()
                ),
                address.loc.line,
                address.loc.col,
            ));
        }
        let fill = match fill {
            Some(token) => parse_hex_byte(token)?,
            None => 0,
        };

        let padding = FillNode::padding(node.span, fill, ctx.location, target)?;
        Ok(OrgDirective {
            span: node.span,
            target,
            fill,
            nodes: vec![padding.into()],
        })
    }
}

/// A machine instruction: opcode byte followed by its encoded operands.
#[derive(Debug)]
pub struct InstructionAnalysis {
    pub span: NodeSpan,
    pub spec: &'static InstructionSpec,
    nodes: Vec<EmitNode>,
}

impl InstructionAnalysis {
    pub fn new(node: &InstructionNode, ctx: &LayoutContext<'_>) -> Result<Self, AssemblerError> {
        let spec = isa::lookup(&node.mnemonic).ok_or_else(|| {
            err_semantic(
                format!("Unknown instruction '{}'", node.mnemonic),
                node.span.line,
                node.span.start,
            )
        })?;

        if node.operands.len() != spec.operands.len() {
            return Err(err_semantic(
                format!(
                    "Instruction '{}' expects {} operand(s) ({}), found {}",
                    spec.mnemonic,
                    spec.operands.len(),
                    spec.signature(),
                    node.operands.len()
                ),
                node.span.line,
                node.span.start,
            ));
        }

        let mut nodes = Vec::new();
        let mut pending = vec![spec.opcode];

        for (index, (operand, kind)) in node.operands.iter().zip(spec.operands).enumerate() {
            match (operand, kind) {
                (Operand::Register(token), OperandKind::Register) => {
                    let number = isa::register_number(&token.text).ok_or_else(|| {
                        err_semantic(
                            format!("Invalid register '{}'", token.text),
                            token.loc.line,
                            token.loc.col,
                        )
                    })?;
                    pending.push(number);
                }
                (Operand::Immediate(token), OperandKind::Immediate) => {
                    pending.push(parse_hex_byte(token)?);
                }
                (Operand::Memory(memory), OperandKind::Memory) => match &memory.target {
                    MemoryTarget::Absolute(token) => {
                        let address = parse_number(token)?;
                        let address = ctx.width.check(address as i64).ok_or_else(|| {
                            err_semantic(
                                format!(
                                    "Address '{}' is outside the {}-bit address space",
                                    token.text,
                                    ctx.width.bits()
                                ),
                                token.loc.line,
                                token.loc.col,
                            )
                        })?;
                        pending.extend(ctx.width.encode(address));
                    }
                    MemoryTarget::Label { name, offset } => {
                        let offset = match offset {
                            Some((negative, magnitude)) => parse_offset(*negative, magnitude)?,
                            None => 0,
                        };
                        if !pending.is_empty() {
                            nodes.push(DataNode::new(node.span, std::mem::take(&mut pending)).into());
                        }
                        nodes.push(LabelReference::new(memory.span, &name.text, offset, ctx.width).into());
                    }
                },
                (other, expected) => {
                    let span = other.span();
                    return Err(err_semantic(
                        format!(
                            "Operand {} of '{}' must be {}, found {} ({})",
                            index + 1,
                            spec.mnemonic,
                            describe_kind(*expected),
                            describe_operand(other),
                            spec.signature()
                        ),
                        span.line,
                        span.start,
                    ));
                }
            }
        }

        if !pending.is_empty() {
            nodes.push(DataNode::new(node.span, pending).into());
        }

        Ok(InstructionAnalysis {
            span: node.span,
            spec,
            nodes,
        })
    }
}

fn describe_kind(kind: OperandKind) -> &'static str {
    match kind {
        OperandKind::Register => "a register",
        OperandKind::Immediate => "an immediate value",
        OperandKind::Memory => "a memory operand",
    }
}

fn describe_operand(operand: &Operand) -> &'static str {
    match operand {
        Operand::Register(_) => "a register",
        Operand::Immediate(_) => "an immediate value",
        Operand::Memory(_) => "a memory operand",
    }
}

/// Builds the analysis node for a directive by name.
pub fn analyse_directive(
    node: &DirectiveNode,
    ctx: &LayoutContext<'_>,
) -> Result<Box<dyn AnalysisNode>, AssemblerError> {
    let analysed: Box<dyn AnalysisNode> = match node.name.to_ascii_lowercase().as_str() {
        "byte" => Box::new(ByteDirective::new(node)?),
        "short" => Box::new(ShortDirective::new(node)?),
        "string" => Box::new(StringDirective::new(node)?),
        "zero" => Box::new(ZeroDirective::new(node)?),
        "org" => Box::new(OrgDirective::new(node, ctx)?),
        _ => {
            return Err(err_semantic(
                format!("Unknown directive '.{}'", node.name),
                node.span.line,
                node.span.start,
            ));
        }
    };
    Ok(analysed)
}

/// Builds the analysis node for a statement payload.
pub fn analyse_payload(
    payload: &Payload,
    ctx: &LayoutContext<'_>,
) -> Result<Box<dyn AnalysisNode>, AssemblerError> {
    match payload {
        Payload::Directive(node) => analyse_directive(node, ctx),
        Payload::Instruction(node) => Ok(Box::new(InstructionAnalysis::new(node, ctx)?)),
    }
}
