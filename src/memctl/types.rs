use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::memctl::error::ValidationError;

/// One of the two on-chip memory technologies behind the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    /// Block RAM: 256-word blocks, 1-byte addresses.
    Bram,
    /// Single-port RAM: 16384-word blocks, 2-byte addresses.
    Spram,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Bram, Region::Spram];

    /// Number of 16-bit words in one block of this region.
    #[inline]
    pub const fn words_per_block(self) -> usize {
        match self {
            Region::Bram => 256,
            Region::Spram => 16384,
        }
    }

    /// Width of the address field on the wire, in bytes.
    #[inline]
    pub const fn address_width(self) -> usize {
        match self {
            Region::Bram => 1,
            Region::Spram => 2,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Bram => f.write_str("BRAM"),
            Region::Spram => f.write_str("SPRAM"),
        }
    }
}

/// Direction of a memory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Read,
    Write,
}

/// Supported FPGA parts.
///
/// The part fixes how many BRAM blocks the controller exposes and whether
/// SPRAM exists at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// iCE40 HX1K: 16 BRAM blocks, no SPRAM.
    Hx1k,
    /// iCE40 UP5K: 30 BRAM blocks, 4 SPRAM blocks.
    Up5k,
}

impl Device {
    /// Number of blocks the device exposes in `region` (zero if absent).
    #[inline]
    pub const fn block_count(self, region: Region) -> u8 {
        match (self, region) {
            (Device::Hx1k, Region::Bram) => 16,
            (Device::Hx1k, Region::Spram) => 0,
            (Device::Up5k, Region::Bram) => 30,
            (Device::Up5k, Region::Spram) => 4,
        }
    }

    #[inline]
    pub const fn has_region(self, region: Region) -> bool {
        self.block_count(region) > 0
    }

    /// Total words held by `region` on this device.
    #[inline]
    pub const fn region_words(self, region: Region) -> usize {
        self.block_count(region) as usize * region.words_per_block()
    }
}

// A BRAM read header for block 32..=35 is the same byte as a warm-boot
// trigger. Every supported part must stay below that range.
const _: () = assert!(Device::Hx1k.block_count(Region::Bram) < 32);
const _: () = assert!(Device::Up5k.block_count(Region::Bram) < 32);

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Hx1k => f.write_str("hx1k"),
            Device::Up5k => f.write_str("up5k"),
        }
    }
}

/// A 16-bit memory word.
///
/// Canonical text form is exactly four lowercase hex digits, zero-padded.
/// Parsing accepts either case but nothing else.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Word(u16);

impl Word {
    pub const ZERO: Word = Word(0);

    #[inline]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Wire order: high byte first.
    #[inline]
    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    #[inline]
    pub const fn from_be_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// Parses a payload of concatenated words, e.g. `"aaaabbbb"` or `"aaaa bbbb"`.
    ///
    /// Whitespace is ignored. The remaining text must be a whole number of
    /// 4-digit words.
    ///
    /// # Example
    /// ```
    /// use ice_memctl::memctl::Word;
    ///
    /// let words = Word::parse_payload("aaaa BBBB").unwrap();
    /// assert_eq!(words, [Word::new(0xaaaa), Word::new(0xbbbb)]);
    /// assert!(Word::parse_payload("abc").is_err());
    /// ```
    pub fn parse_payload(text: &str) -> Result<Vec<Word>, ValidationError> {
        let digits: String = text.split_whitespace().collect();
        if digits.len() % 4 != 0 {
            return Err(ValidationError::PayloadLength(digits.len()));
        }

        let bytes =
            hex::decode(&digits).map_err(|_| ValidationError::InvalidWord(text.trim().into()))?;

        Ok(bytes
            .chunks_exact(2)
            .map(|pair| Word::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }
}

impl From<u16> for Word {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<Word> for u16 {
    fn from(word: Word) -> Self {
        word.0
    }
}

impl FromStr for Word {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidWord(s.into()));
        }
        u16::from_str_radix(s, 16)
            .map(Word)
            .map_err(|_| ValidationError::InvalidWord(s.into()))
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({:04x})", self.0)
    }
}
