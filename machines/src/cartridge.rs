//! Cartridge and boot-ROM image loading and validation.
//!
//! Images can come from disk or from programmatic byte buffers (for
//! testing). The cartridge is validated at construction: the Sega mapper
//! deals in 16 KiB banks, so anything that is not a positive multiple of
//! 16 KiB is rejected before a machine is built.

use std::path::Path;

/// One ROM bank as seen by the Sega mapper.
pub const BANK_SIZE: usize = 0x4000;

/// Largest boot ROM the slot-0 overlay accepts.
pub const MAX_BIOS_SIZE: usize = 0x4000;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a cartridge or boot ROM.
#[derive(Debug)]
pub enum CartridgeError {
    /// Underlying I/O error (file not found, permission denied, etc.)
    Io(std::io::Error),

    /// Cartridge image length is not a positive multiple of 16 KiB.
    InvalidSize { actual: usize },

    /// Boot ROM image is larger than the 16 KiB slot-0 overlay.
    BiosTooLarge { actual: usize },
}

impl std::fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidSize { actual } => write!(
                f,
                "cartridge size {actual} is not a positive multiple of 16384"
            ),
            Self::BiosTooLarge { actual } => {
                write!(f, "boot ROM is {actual} bytes; the overlay holds at most 16384")
            }
        }
    }
}

impl std::error::Error for CartridgeError {}

impl From<std::io::Error> for CartridgeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Cartridge
// ---------------------------------------------------------------------------

/// An immutable cartridge image, the source of the mapper's ROM banks.
///
/// No header is required; the region/checksum footer at 0x7FF0 is not
/// interpreted here.
#[derive(Debug)]
pub struct Cartridge {
    data: Vec<u8>,
}

impl Cartridge {
    pub fn new(data: Vec<u8>) -> Result<Self, CartridgeError> {
        if data.is_empty() || data.len() % BANK_SIZE != 0 {
            return Err(CartridgeError::InvalidSize { actual: data.len() });
        }
        Ok(Self { data })
    }

    pub fn from_file(path: &Path) -> Result<Self, CartridgeError> {
        Self::new(std::fs::read(path)?)
    }

    pub fn bank_count(&self) -> usize {
        self.data.len() / BANK_SIZE
    }

    /// Read through a bank number (wrapped to the bank count) and an offset
    /// within the bank.
    pub fn read(&self, bank: u8, offset: u16) -> u8 {
        let bank = bank as usize % self.bank_count();
        self.data[bank * BANK_SIZE + (offset as usize & (BANK_SIZE - 1))]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

// ---------------------------------------------------------------------------
// Bios
// ---------------------------------------------------------------------------

/// An optional boot ROM, overlaid on slot 0 until the game (or the escape
/// hatch) disables it through the memory-control port.
#[derive(Debug)]
pub struct Bios {
    data: Vec<u8>,
}

impl Bios {
    pub fn new(data: Vec<u8>) -> Result<Self, CartridgeError> {
        if data.is_empty() || data.len() > MAX_BIOS_SIZE {
            return Err(CartridgeError::BiosTooLarge { actual: data.len() });
        }
        Ok(Self { data })
    }

    pub fn from_file(path: &Path) -> Result<Self, CartridgeError> {
        Self::new(std::fs::read(path)?)
    }

    /// Read within the overlay window; short images mirror.
    pub fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize % self.data.len()]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
