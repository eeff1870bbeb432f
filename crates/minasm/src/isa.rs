//! Instruction set of the target CPU: registers, mnemonics and operand shapes.
//!
//! Every instruction encodes as its opcode byte followed by the operands in
//! source order. Registers and immediates take one byte each, memory operands
//! take one address (width set by the assembler configuration).

/// Number of general-purpose registers (`r0`-`r7`).
pub const REGISTER_COUNT: u8 = 8;

/// Operand shapes an instruction slot can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Register,
    Immediate,
    Memory,
}

impl OperandKind {
    pub fn name(self) -> &'static str {
        match self {
            OperandKind::Register => "reg",
            OperandKind::Immediate => "imm",
            OperandKind::Memory => "[mem]",
        }
    }
}

/// One row of the instruction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionSpec {
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub operands: &'static [OperandKind],
}

impl InstructionSpec {
    /// Usage line such as `ldi reg, imm`.
    pub fn signature(&self) -> String {
        let operands: Vec<&str> = self.operands.iter().map(|k| k.name()).collect();
        if operands.is_empty() {
            self.mnemonic.to_string()
        } else {
            format!("{} {}", self.mnemonic, operands.join(", "))
        }
    }
}

use OperandKind::{Immediate as Imm, Memory as Mem, Register as Reg};

const fn spec(mnemonic: &'static str, opcode: u8, operands: &'static [OperandKind]) -> InstructionSpec {
    InstructionSpec {
        mnemonic,
        opcode,
        operands,
    }
}

pub const INSTRUCTIONS: &[InstructionSpec] = &[
    spec("nop", 0x00, &[]),
    spec("hlt", 0x01, &[]),
    // Data movement
    spec("ldi", 0x10, &[Reg, Imm]),
    spec("ld", 0x11, &[Reg, Mem]),
    spec("st", 0x12, &[Mem, Reg]),
    spec("mov", 0x13, &[Reg, Reg]),
    // ALU
    spec("add", 0x20, &[Reg, Reg]),
    spec("sub", 0x21, &[Reg, Reg]),
    spec("and", 0x22, &[Reg, Reg]),
    spec("or", 0x23, &[Reg, Reg]),
    spec("xor", 0x24, &[Reg, Reg]),
    spec("cmp", 0x25, &[Reg, Reg]),
    spec("inc", 0x26, &[Reg]),
    spec("dec", 0x27, &[Reg]),
    // Control flow
    spec("jmp", 0x30, &[Mem]),
    spec("jz", 0x31, &[Mem]),
    spec("jnz", 0x32, &[Mem]),
    spec("call", 0x33, &[Mem]),
    spec("ret", 0x34, &[]),
    // Stack
    spec("push", 0x40, &[Reg]),
    spec("pop", 0x41, &[Reg]),
];

/// Finds an instruction by mnemonic, ignoring case.
pub fn lookup(mnemonic: &str) -> Option<&'static InstructionSpec> {
    INSTRUCTIONS
        .iter()
        .find(|spec| spec.mnemonic.eq_ignore_ascii_case(mnemonic))
}

/// Register index for names like `r3` / `R3`.
pub fn register_number(name: &str) -> Option<u8> {
    let digits = name.strip_prefix('r').or_else(|| name.strip_prefix('R'))?;
    digits
        .parse::<u8>()
        .ok()
        .filter(|n| *n < REGISTER_COUNT && digits.len() == 1)
}
