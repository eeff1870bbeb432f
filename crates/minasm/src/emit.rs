//! Emit nodes: the byte-producing units the assembler lays out.
//!
//! Every node knows its size as soon as it is built. Only label references
//! need a second step (`resolve`) before they can produce bytes.
use crate::ast::NodeSpan;
use crate::config::AddressWidth;
use crate::error::{AssemblerError, err_contract, err_semantic, err_symbol};

/// Fixed bytes known at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataNode {
    pub span: NodeSpan,
    pub bytes: Vec<u8>,
}

impl DataNode {
    pub fn new(span: NodeSpan, bytes: Vec<u8>) -> Self {
        DataNode { span, bytes }
    }
}

/// One byte value repeated `count` times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillNode {
    pub span: NodeSpan,
    pub value: u8,
    pub count: usize,
}

impl FillNode {
    pub fn new(span: NodeSpan, value: u8, count: usize) -> Self {
        FillNode { span, value, count }
    }

    /// Fill that pads from `from` up to `to`. Rejects `to < from` instead of
    /// producing a negative length.
    pub fn padding(span: NodeSpan, value: u8, from: u32, to: u32) -> Result<Self, AssemblerError> {
        if to < from {
            return Err(err_semantic(
                format!(
                    "Cannot move the location counter backwards from 0x{:04X} to 0x{:04X}",
                    from, to
                ),
                span.line,
                span.start,
            ));
        }
        Ok(FillNode::new(span, value, (to - from) as usize))
    }
}

/// Resolution state of a label reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelState {
    Unresolved,
    Resolved(u32),
}

/// A reference to a label whose address is only known after layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelReference {
    pub span: NodeSpan,
    label: String,
    offset: i64,
    width: AddressWidth,
    state: LabelState,
}

impl LabelReference {
    pub fn new(span: NodeSpan, label: impl Into<String>, offset: i64, width: AddressWidth) -> Self {
        LabelReference {
            span,
            label: label.into(),
            offset,
            width,
            state: LabelState::Unresolved,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn state(&self) -> LabelState {
        self.state
    }

    /// Size in the image, fixed by the addressing width.
    pub fn count(&self) -> usize {
        self.width.byte_len()
    }

    /// Binds the label's address. May be called once.
    pub fn resolve(&mut self, address: u32) -> Result<(), AssemblerError> {
        if let LabelState::Resolved(_) = self.state {
            return Err(err_contract(format!(
                "label reference '{}' resolved twice",
                self.label
            )));
        }

        let value = address as i64 + self.offset;
        match self.width.check(value) {
            Some(resolved) => {
                self.state = LabelState::Resolved(resolved);
                Ok(())
            }
            None => Err(err_symbol(
                format!(
                    "Label '{}' with offset {} resolves to {}, outside the {}-bit address range (0x0-0x{:X})",
                    self.label,
                    self.offset,
                    value,
                    self.width.bits(),
                    self.width.max_address()
                ),
                self.span.line,
                self.span.start,
            )),
        }
    }

    /// Encoded address. Fails if `resolve` has not been called.
    pub fn emit(&self) -> Result<Vec<u8>, AssemblerError> {
        match self.state {
            LabelState::Resolved(value) => Ok(self.width.encode(value)),
            LabelState::Unresolved => Err(err_contract(format!(
                "label reference '{}' emitted before it was resolved",
                self.label
            ))),
        }
    }
}

/// The uniform byte-producing unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitNode {
    Data(DataNode),
    Fill(FillNode),
    LabelRef(LabelReference),
}

impl EmitNode {
    pub fn span(&self) -> NodeSpan {
        match self {
            EmitNode::Data(n) => n.span,
            EmitNode::Fill(n) => n.span,
            EmitNode::LabelRef(n) => n.span,
        }
    }

    /// Number of bytes this node contributes; known at construction.
    pub fn count(&self) -> usize {
        match self {
            EmitNode::Data(n) => n.bytes.len(),
            EmitNode::Fill(n) => n.count,
            EmitNode::LabelRef(n) => n.count(),
        }
    }

    pub fn emit(&self) -> Result<Vec<u8>, AssemblerError> {
        match self {
            EmitNode::Data(n) => Ok(n.bytes.clone()),
            EmitNode::Fill(n) => Ok(vec![n.value; n.count]),
            EmitNode::LabelRef(n) => n.emit(),
        }
    }

    pub fn as_label_ref_mut(&mut self) -> Option<&mut LabelReference> {
        match self {
            EmitNode::LabelRef(n) => Some(n),
            _ => None,
        }
    }
}

impl From<DataNode> for EmitNode {
    fn from(node: DataNode) -> Self {
        EmitNode::Data(node)
    }
}

impl From<FillNode> for EmitNode {
    fn from(node: FillNode) -> Self {
        EmitNode::Fill(node)
    }
}

impl From<LabelReference> for EmitNode {
    fn from(node: LabelReference) -> Self {
        EmitNode::LabelRef(node)
    }
}
