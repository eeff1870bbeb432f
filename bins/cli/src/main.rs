//! minasm assembler CLI
//!
//! Assembles a source file into a raw binary, Intel HEX or a text listing,
//! or checks it and prints diagnostics in `path:line:col` form.
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use minasm::{AddressWidth, AssemblerConfig, analyse, assemble};
use tracing::{Level, debug};

mod file_utils;

use file_utils::{read_file, write_output};

/// Output format for the assembled image
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Raw binary format (just the bytes)
    Binary,
    /// Intel HEX format
    Hex,
    /// Text listing, 16 bytes per row
    Text,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Binary => "bin",
            OutputFormat::Hex => "hex",
            OutputFormat::Text => "txt",
        }
    }
}

/// minasm assembler
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Input assembly file path
    #[clap(index = 1)]
    input: PathBuf,

    /// Output file path (defaults to the input name with the format's extension)
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[clap(short, long, value_enum, default_value = "binary")]
    format: OutputFormat,

    /// Address width in bits (8 or 16)
    #[clap(long, value_parser = parse_width, default_value = "16")]
    width: AddressWidth,

    /// Load address of the first byte
    #[clap(long, value_parser = parse_address, default_value = "0x0000")]
    base: u32,

    /// Only report diagnostics, do not write output
    #[clap(long)]
    check: bool,

    /// Verbose output (symbol table and image size)
    #[clap(short, long)]
    verbose: bool,

    /// Log level
    #[clap(short, long, default_value_t = Level::WARN)]
    log_level: Level,
}

fn parse_width(value: &str) -> Result<AddressWidth, String> {
    match value {
        "8" => Ok(AddressWidth::Bits8),
        "16" => Ok(AddressWidth::Bits16),
        other => Err(format!("unsupported width '{}', expected 8 or 16", other)),
    }
}

fn parse_address(value: &str) -> Result<u32, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => value.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", value, e))
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when `--check` found problems.
fn run() -> Result<bool> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    let input_path = &args.input;
    let source = read_file(input_path)
        .with_context(|| format!("Failed to read input file: {}", input_path.display()))?;
    let config = AssemblerConfig::new(args.width, args.base);
    debug!(?config, path = %input_path.display(), "assembling");

    if args.check {
        return Ok(check(input_path, &source, &config));
    }

    let assembled = assemble(&source, &config)
        .with_context(|| format!("Assembly of {} failed", input_path.display()))?;

    if args.verbose {
        for symbol in assembled.symbols.sorted() {
            println!("{:04X}  {}", symbol.address(), symbol.name());
        }
        println!(
            "Assembly successful. {} bytes, 0x{:04X}-0x{:04X}.",
            assembled.image.len(),
            assembled.base_address,
            assembled.end_address()
        );
    }

    let output_path = args.output.clone().unwrap_or_else(|| {
        let mut output = input_path.clone();
        output.set_extension(args.format.extension());
        output
    });

    write_output(&assembled, &output_path, args.format)
        .with_context(|| format!("Failed to write output to: {}", output_path.display()))?;

    if args.verbose {
        println!("Output written to: {}", output_path.display());
    }

    Ok(true)
}

/// Prints every diagnostic of the document; `true` if there were none.
fn check(path: &Path, source: &str, config: &AssemblerConfig) -> bool {
    let result = analyse(source, config);
    for diagnostic in &result.diagnostics {
        eprintln!(
            "{}:{}:{}: {} error: {}",
            path.display(),
            diagnostic.line + 1,
            diagnostic.column + 1,
            diagnostic.stage,
            diagnostic.message
        );
    }
    result.is_ok()
}
