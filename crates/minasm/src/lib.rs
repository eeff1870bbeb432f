//! minasm: two-pass assembler for a small 8-register CPU
pub mod analyser;
pub mod analysis;
pub mod assembler;
pub mod ast;
pub mod config;
pub mod emit;
pub mod error;
pub mod isa;
pub mod lexer;
pub mod locator;
pub mod parser;
pub mod symbol;
pub mod value;

pub use analyser::{AnalysisResult, analyse};
pub use assembler::{Assembler, AssemblyOutput, assemble};
pub use config::{AddressWidth, AssemblerConfig};
pub use error::{AssemblerError, Diagnostic, Stage};
