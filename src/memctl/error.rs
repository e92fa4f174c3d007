use std::path::PathBuf;

use thiserror::Error;

use crate::memctl::types::Region;

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, MemctlError>;

/// A request was rejected before any byte reached the transport.
///
/// Always recoverable: the caller supplies corrected input and retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Block index is not below the region's block count.
    #[error("block {block} out of range for {region} ({count} blocks)")]
    BlockOutOfRange { region: Region, block: u8, count: u8 },
    /// `address + size` runs past the end of the block.
    #[error("{size} word(s) at address {address} exceed {region} block of {words_per_block} words")]
    SpanOutOfRange {
        region: Region,
        address: u16,
        size: usize,
        words_per_block: usize,
    },
    /// A request for zero words.
    #[error("request size must be at least 1 word")]
    ZeroSize,
    /// A request for more words than one size byte can carry.
    #[error("request size {0} exceeds the 256-word frame limit")]
    SizeTooLarge(usize),
    /// Text that is not exactly four hex digits.
    #[error("invalid word {0:?}: expected 4 hex digits")]
    InvalidWord(String),
    /// Payload text whose length is not a multiple of four hex digits.
    #[error("payload of {0} hex digit(s) is not a whole number of words")]
    PayloadLength(usize),
    /// Warm-boot image outside `0..=3`.
    #[error("warm-boot image {0} out of range (0..=3)")]
    ImageOutOfRange(u8),
    /// The selected device has no such region.
    #[error("{0} is not available on this device")]
    RegionUnavailable(Region),
    /// Bulk initialisation is only defined for SPRAM.
    #[error("{0} cannot be bulk-initialised")]
    NotInitialisable(Region),
    /// Frame would not fit the fixed-capacity frame buffer.
    #[error("frame exceeds {0} bytes")]
    FrameOverflow(usize),
}

/// Client and device disagree about frame boundaries.
///
/// Recoverable only through [`reset`](crate::memctl::MemoryClient::reset)
/// followed by [`sync_device`](crate::memctl::MemoryClient::sync_device).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// The read timed out before the whole response arrived.
    #[error("short read: expected {expected} byte(s), received {received}")]
    ShortRead { expected: usize, received: usize },
    /// More response bytes than requested.
    #[error("response length mismatch: expected {expected} byte(s), received {received}")]
    LengthMismatch { expected: usize, received: usize },
    /// A response that cannot be split into whole words.
    #[error("odd response length {0}")]
    OddLength(usize),
    /// Bytes left on the link after a complete response.
    #[error("{0} surplus byte(s) after response")]
    SurplusBytes(usize),
}

/// Errors produced by the memory controller client.
#[derive(Debug, Error)]
pub enum MemctlError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("framing lost: {0}")]
    Framing(#[from] FramingError),

    /// The link itself failed. Fatal to the client instance.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// A persisted word list contains a line that is not a word.
    #[error("{}:{line}: {reason}", .path.display())]
    Shadow {
        path: PathBuf,
        line: usize,
        reason: ValidationError,
    },

    /// Reading or writing a persisted word list failed.
    #[error("shadow file {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("device did not resynchronise after {attempts} probe(s)")]
    SyncExhausted { attempts: usize },

    /// A chunk written during bulk initialisation failed verification.
    /// Earlier chunks have already reached the device.
    #[error("{region} initialisation aborted at block {block}, address {address}")]
    InitAborted {
        region: Region,
        block: u8,
        address: u16,
    },
}

impl MemctlError {
    /// Returns true if the error means the link lost frame alignment.
    pub fn is_framing(&self) -> bool {
        matches!(self, MemctlError::Framing(_))
    }

    /// Returns true if the input was rejected before any I/O.
    pub fn is_validation(&self) -> bool {
        matches!(self, MemctlError::Validation(_))
    }
}
