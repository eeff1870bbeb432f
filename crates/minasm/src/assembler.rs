//! Two-pass assembler driver.
//!
//! 1. Layout: size every statement, record labels at the location counter.
//! 2. Resolution: bind label references against the finished symbol table.
//! 3. Emission: concatenate the bytes of every emit node.
use tracing::{debug, trace};

use crate::analysis::{LayoutContext, analyse_payload};
use crate::ast::Program;
use crate::config::{AddressWidth, AssemblerConfig};
use crate::emit::EmitNode;
use crate::error::{AssemblerError, err_contract, err_multiple, err_semantic, err_symbol};
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::symbol::SymbolTable;

/// The finished image plus what a loader or listing needs to place it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutput {
    pub image: Vec<u8>,
    pub symbols: SymbolTable,
    /// Address of `image[0]`.
    pub base_address: u32,
    pub width: AddressWidth,
}

impl AssemblyOutput {
    /// Address one past the last emitted byte.
    pub fn end_address(&self) -> u32 {
        self.base_address + self.image.len() as u32
    }
}

/// Result of the layout pass.
#[derive(Debug, Clone)]
pub struct Layout {
    pub nodes: Vec<EmitNode>,
    pub symbols: SymbolTable,
    /// Sum of node counts, fixed at layout time.
    pub size: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Assembler {
    config: AssemblerConfig,
}

impl Assembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Assembler { config }
    }

    pub fn config(&self) -> AssemblerConfig {
        self.config
    }

    /// First pass. Errors are collected per statement; the pass keeps going
    /// so independent problems are all reported.
    pub fn layout(&self, program: &Program) -> Result<Layout, AssemblerError> {
        let width = self.config.width;
        let base = self.config.base_address;
        if width.check(base as i64).is_none() {
            return Err(err_semantic(
                format!(
                    "Base address 0x{:X} is outside the {}-bit address space",
                    base,
                    width.bits()
                ),
                0,
                0,
            ));
        }

        let mut symbols = SymbolTable::new();
        let mut nodes = Vec::new();
        let mut errors = Vec::new();
        let mut location = base;

        for statement in &program.statements {
            if let Some(label) = &statement.label {
                trace!(label = %label.name, address = location, "define label");
                if let Err(e) = symbols.define(label.name.clone(), location, label.span.loc()) {
                    errors.push(e);
                }
            }

            let Some(payload) = &statement.payload else {
                continue;
            };

            let ctx = LayoutContext {
                location,
                symbols: &symbols,
                width,
            };
            let analysed = match analyse_payload(payload, &ctx) {
                Ok(analysed) => analysed,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };

            let count = analysed.count();
            let end = location as u64 + count as u64;
            if end > width.address_space() as u64 {
                let span = analysed.span();
                errors.push(err_semantic(
                    format!(
                        "Program does not fit the {}-bit address space (ends at 0x{:X}, limit 0x{:X})",
                        width.bits(),
                        end,
                        width.address_space()
                    ),
                    span.line,
                    span.start,
                ));
                // Everything after this point would be out of range too.
                break;
            }

            trace!(address = location, count, "layout statement");
            location = end as u32;
            nodes.extend(analysed.into_emit_nodes());
        }

        if !errors.is_empty() {
            debug!(errors = errors.len(), "layout failed");
            return Err(err_multiple(errors));
        }

        let size = (location - base) as usize;
        debug!(
            nodes = nodes.len(),
            symbols = symbols.len(),
            size,
            "layout complete"
        );
        Ok(Layout {
            nodes,
            symbols,
            size,
        })
    }

    /// Second pass. Every undefined or out-of-range reference is reported.
    pub fn resolve(&self, layout: &mut Layout) -> Result<(), AssemblerError> {
        let mut errors = Vec::new();
        let mut resolved = 0usize;

        for reference in layout.nodes.iter_mut().filter_map(EmitNode::as_label_ref_mut) {
            match layout.symbols.address_of(reference.label()) {
                Some(address) => {
                    trace!(label = reference.label(), address, "resolve reference");
                    match reference.resolve(address) {
                        Ok(()) => resolved += 1,
                        Err(e) => errors.push(e),
                    }
                }
                None => errors.push(err_symbol(
                    format!("Undefined label '{}'", reference.label()),
                    reference.span.line,
                    reference.span.start,
                )),
            }
        }

        if !errors.is_empty() {
            debug!(errors = errors.len(), "resolution failed");
            return Err(err_multiple(errors));
        }
        debug!(resolved, "resolution complete");
        Ok(())
    }

    /// Final pass. Needs a resolved layout.
    pub fn emit(&self, layout: &Layout) -> Result<Vec<u8>, AssemblerError> {
        let mut image = Vec::with_capacity(layout.size);
        for node in &layout.nodes {
            image.extend(node.emit()?);
        }

        if image.len() != layout.size {
            return Err(err_contract(format!(
                "emitted {} bytes but layout computed {}",
                image.len(),
                layout.size
            )));
        }
        Ok(image)
    }

    pub fn assemble_program(&self, program: &Program) -> Result<AssemblyOutput, AssemblerError> {
        let mut layout = self.layout(program)?;
        self.resolve(&mut layout)?;
        let image = self.emit(&layout)?;

        debug!(bytes = image.len(), "assembly complete");
        Ok(AssemblyOutput {
            image,
            symbols: layout.symbols,
            base_address: self.config.base_address,
            width: self.config.width,
        })
    }
}

/// Assembles source text into a binary image.
pub fn assemble(source: &str, config: &AssemblerConfig) -> Result<AssemblyOutput, AssemblerError> {
    let tokens = tokenize(source)?;
    let program = parse(&tokens)?;
    Assembler::new(*config).assemble_program(&program)
}
