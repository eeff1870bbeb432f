//! Assembler configuration: target addressing width and load base.

/// Bit width of resolvable addresses and of encoded label references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressWidth {
    /// Addresses 0x00-0xFF, references encode as one byte.
    Bits8,
    /// Addresses 0x0000-0xFFFF, references encode as two bytes, little-endian.
    #[default]
    Bits16,
}

impl AddressWidth {
    /// Largest address representable at this width.
    pub fn max_address(self) -> u32 {
        match self {
            AddressWidth::Bits8 => 0xFF,
            AddressWidth::Bits16 => 0xFFFF,
        }
    }

    /// Number of bytes an address occupies in the image.
    pub fn byte_len(self) -> usize {
        match self {
            AddressWidth::Bits8 => 1,
            AddressWidth::Bits16 => 2,
        }
    }

    /// Size of the whole address space in bytes.
    pub fn address_space(self) -> u32 {
        self.max_address() + 1
    }

    pub fn bits(self) -> u32 {
        match self {
            AddressWidth::Bits8 => 8,
            AddressWidth::Bits16 => 16,
        }
    }

    /// Returns `Some(value)` when `value` fits this width.
    pub fn check(self, value: i64) -> Option<u32> {
        if (0..=self.max_address() as i64).contains(&value) {
            Some(value as u32)
        } else {
            None
        }
    }

    /// Encodes an address that already passed [`AddressWidth::check`].
    pub fn encode(self, address: u32) -> Vec<u8> {
        match self {
            AddressWidth::Bits8 => vec![address as u8],
            AddressWidth::Bits16 => (address as u16).to_le_bytes().to_vec(),
        }
    }
}

/// Per-invocation assembler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblerConfig {
    pub width: AddressWidth,
    /// Initial value of the location counter.
    pub base_address: u32,
}

impl AssemblerConfig {
    pub fn new(width: AddressWidth, base_address: u32) -> Self {
        AssemblerConfig {
            width,
            base_address,
        }
    }
}
