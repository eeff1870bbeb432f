use crate::OutputFormat;
use minasm::{AssemblerError, AssemblyOutput};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

/// Bytes per Intel HEX record and per listing row.
const ROW_LEN: usize = 16;

/// Read a file into a string
pub(crate) fn read_file(path: &Path) -> Result<String, AssemblerError> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Write the assembled output to a file in the specified format
pub(crate) fn write_output(
    assembled: &AssemblyOutput,
    path: &Path,
    format: OutputFormat,
) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    match format {
        OutputFormat::Binary => write_binary_output(assembled, &mut file)?,
        OutputFormat::Hex => write_hex_output(assembled, &mut file)?,
        OutputFormat::Text => write_text_output(assembled, &mut file)?,
    }
    file.flush()
}

/// Write the raw image
pub(crate) fn write_binary_output(assembled: &AssemblyOutput, out: &mut impl Write) -> io::Result<()> {
    out.write_all(&assembled.image)
}

/// Write output in Intel HEX format, one data record per 16 bytes
pub(crate) fn write_hex_output(assembled: &AssemblyOutput, out: &mut impl Write) -> io::Result<()> {
    let mut address = assembled.base_address;

    for chunk in assembled.image.chunks(ROW_LEN) {
        let mut checksum = chunk.len() as u8;
        checksum = checksum.wrapping_add((address >> 8) as u8);
        checksum = checksum.wrapping_add(address as u8);

        write!(out, ":{:02X}{:04X}00", chunk.len(), address & 0xFFFF)?;
        for byte in chunk {
            write!(out, "{:02X}", byte)?;
            checksum = checksum.wrapping_add(*byte);
        }
        writeln!(out, "{:02X}", 0u8.wrapping_sub(checksum))?;

        address += chunk.len() as u32;
    }

    writeln!(out, ":00000001FF")
}

/// Write a listing: `AAAA: BB BB ..`, 16 bytes per row
pub(crate) fn write_text_output(assembled: &AssemblyOutput, out: &mut impl Write) -> io::Result<()> {
    let mut address = assembled.base_address;

    for chunk in assembled.image.chunks(ROW_LEN) {
        let bytes: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        writeln!(out, "{:04X}: {}", address, bytes.join(" "))?;
        address += chunk.len() as u32;
    }

    Ok(())
}
