//! Pure encode/decode functions for the controller's serial framing.
//!
//! ```text
//! read request   header(1) addr(1|2) size-1(1)
//! write request  header(1) addr(1|2) size-1(1) payload(2 x size)
//! read response  payload(2 x size)
//! warm-boot      32 + image(1)              (no response)
//!
//! header         bit 7 region (0 BRAM, 1 SPRAM)
//!                bit 6 op     (0 read, 1 write)
//!                bits 5..0 block index
//! ```
//!
//! Nothing in here performs I/O or holds state. Request frames are built into
//! a fixed-capacity [`Frame`] so encoding never allocates.

use crate::memctl::{
    error::{FramingError, ValidationError},
    helpers::{MAX_REQUEST_WORDS, check_size},
    types::{Op, Region, Word},
};

const REGION_BIT: u8 = 0b1000_0000;
const WRITE_BIT: u8 = 0b0100_0000;
const BLOCK_MASK: u8 = 0b0011_1111;

/// Highest block index the 6-bit header field can carry.
pub const MAX_HEADER_BLOCK: u8 = BLOCK_MASK;

/// Warm-boot trigger for image 0. Images 0..=3 map to bytes 32..=35.
pub const WARMBOOT_BASE: u8 = 32;

/// Number of stored configuration images a warm-boot can select.
pub const WARMBOOT_IMAGES: u8 = 4;

/// Longest request on the wire: SPRAM write of 256 words.
pub const MAX_FRAME_LEN: usize = 1 + 2 + 1 + 2 * MAX_REQUEST_WORDS;

/// A request frame ready to be sent.
pub type Frame = heapless::Vec<u8, MAX_FRAME_LEN>;

/// First byte of a memory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub region: Region,
    pub op: Op,
    pub block: u8,
}

impl Header {
    pub const fn new(region: Region, op: Op, block: u8) -> Self {
        Self { region, op, block }
    }

    /// Packs the header into its wire byte.
    ///
    /// # Errors
    /// [`ValidationError::BlockOutOfRange`] if `block` does not fit 6 bits.
    pub fn encode(self) -> Result<u8, ValidationError> {
        if self.block > MAX_HEADER_BLOCK {
            return Err(ValidationError::BlockOutOfRange {
                region: self.region,
                block: self.block,
                count: MAX_HEADER_BLOCK + 1,
            });
        }

        let mut byte = self.block;
        if self.region == Region::Spram {
            byte |= REGION_BIT;
        }
        if self.op == Op::Write {
            byte |= WRITE_BIT;
        }
        Ok(byte)
    }

    /// Unpacks a wire byte. Every byte decodes to some header; whether a
    /// byte in the warm-boot range means a read of block 32..=35 or a
    /// warm-boot is up to the device (see [`decode_warmboot`]).
    pub const fn decode(byte: u8) -> Self {
        let region = if byte & REGION_BIT != 0 {
            Region::Spram
        } else {
            Region::Bram
        };
        let op = if byte & WRITE_BIT != 0 {
            Op::Write
        } else {
            Op::Read
        };
        Self {
            region,
            op,
            block: byte & BLOCK_MASK,
        }
    }
}

/// Encodes a request size as `size - 1`, so one byte covers 1..=256.
pub fn encode_size(size: usize) -> Result<u8, ValidationError> {
    check_size(size)?;
    Ok((size - 1) as u8)
}

/// Inverse of [`encode_size`].
#[inline]
pub const fn decode_size(byte: u8) -> usize {
    byte as usize + 1
}

/// Number of response bytes a read of `size` words produces.
#[inline]
pub const fn response_len(size: usize) -> usize {
    2 * size
}

/// Length of a request frame's fixed part (header, address, size).
#[inline]
pub const fn request_prefix_len(region: Region) -> usize {
    1 + region.address_width() + 1
}

/// Decodes an address field of `region.address_width()` bytes.
///
/// # Panics
/// Panics if `bytes` is shorter than the region's address width.
pub fn decode_address(region: Region, bytes: &[u8]) -> u16 {
    match region {
        Region::Bram => bytes[0] as u16,
        Region::Spram => u16::from_be_bytes([bytes[0], bytes[1]]),
    }
}

fn put(frame: &mut Frame, bytes: &[u8]) -> Result<(), ValidationError> {
    frame
        .extend_from_slice(bytes)
        .map_err(|_| ValidationError::FrameOverflow(MAX_FRAME_LEN))
}

fn encode_prefix(
    header: Header,
    address: u16,
    size: usize,
) -> Result<Frame, ValidationError> {
    let region = header.region;
    let mut frame = Frame::new();
    put(&mut frame, &[header.encode()?])?;

    match region {
        Region::Bram => {
            let byte = u8::try_from(address).map_err(|_| ValidationError::SpanOutOfRange {
                region,
                address,
                size,
                words_per_block: region.words_per_block(),
            })?;
            put(&mut frame, &[byte])?;
        }
        Region::Spram => put(&mut frame, &address.to_be_bytes())?,
    }

    put(&mut frame, &[encode_size(size)?])?;
    Ok(frame)
}

/// Builds a read request frame.
///
/// # Example
/// ```
/// use ice_memctl::memctl::{Region, codec::encode_read_request};
///
/// let frame = encode_read_request(Region::Spram, 2, 0x1234, 3).unwrap();
/// assert_eq!(frame.as_slice(), &[0x82, 0x12, 0x34, 0x02]);
/// ```
pub fn encode_read_request(
    region: Region,
    block: u8,
    address: u16,
    size: usize,
) -> Result<Frame, ValidationError> {
    encode_prefix(Header::new(region, Op::Read, block), address, size)
}

/// Builds a write request frame carrying `words` in order, high byte first.
pub fn encode_write_request(
    region: Region,
    block: u8,
    address: u16,
    words: &[Word],
) -> Result<Frame, ValidationError> {
    let mut frame = encode_prefix(Header::new(region, Op::Write, block), address, words.len())?;
    for word in words {
        put(&mut frame, &word.to_be_bytes())?;
    }
    Ok(frame)
}

/// Builds the single-byte warm-boot trigger for `image`.
pub fn encode_warmboot(image: u8) -> Result<u8, ValidationError> {
    if image >= WARMBOOT_IMAGES {
        return Err(ValidationError::ImageOutOfRange(image));
    }
    Ok(WARMBOOT_BASE + image)
}

/// Returns the image index if `byte` is a warm-boot trigger.
pub const fn decode_warmboot(byte: u8) -> Option<u8> {
    if byte >= WARMBOOT_BASE && byte < WARMBOOT_BASE + WARMBOOT_IMAGES {
        Some(byte - WARMBOOT_BASE)
    } else {
        None
    }
}

/// Groups raw bytes into words, preserving order.
///
/// # Errors
/// [`FramingError::OddLength`] if the bytes do not split into whole words.
pub fn decode_words(bytes: &[u8]) -> Result<Vec<Word>, FramingError> {
    if bytes.len() % 2 != 0 {
        return Err(FramingError::OddLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| Word::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// Decodes the response to a read of `size` words.
///
/// Anything other than exactly `2 * size` bytes is a framing error: fewer
/// means the read timed out, more means the frames slipped.
pub fn decode_response(bytes: &[u8], size: usize) -> Result<Vec<Word>, FramingError> {
    let expected = response_len(size);
    let received = bytes.len();
    if received < expected {
        return Err(FramingError::ShortRead { expected, received });
    }
    if received > expected {
        return Err(FramingError::LengthMismatch { expected, received });
    }
    decode_words(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_byte_round_trip() {
        for size in 1..=256 {
            let byte = encode_size(size).unwrap();
            assert_eq!(decode_size(byte), size);
        }
        assert_eq!(encode_size(1), Ok(0x00));
        assert_eq!(encode_size(256), Ok(0xff));
    }

    #[test]
    fn size_out_of_range_is_rejected_not_wrapped() {
        assert_eq!(encode_size(0), Err(ValidationError::ZeroSize));
        assert_eq!(encode_size(257), Err(ValidationError::SizeTooLarge(257)));
    }

    #[test]
    fn header_round_trip() {
        for region in Region::ALL {
            for op in [Op::Read, Op::Write] {
                for block in 0..=MAX_HEADER_BLOCK {
                    let header = Header::new(region, op, block);
                    let byte = header.encode().unwrap();
                    assert_eq!(Header::decode(byte), header);
                }
            }
        }
    }

    #[test]
    fn header_bit_layout() {
        assert_eq!(Header::new(Region::Bram, Op::Read, 5).encode(), Ok(0x05));
        assert_eq!(Header::new(Region::Bram, Op::Write, 1).encode(), Ok(0x41));
        assert_eq!(Header::new(Region::Spram, Op::Read, 3).encode(), Ok(0x83));
        assert_eq!(Header::new(Region::Spram, Op::Write, 63).encode(), Ok(0xff));
        assert!(Header::new(Region::Bram, Op::Read, 64).encode().is_err());
    }

    #[test]
    fn warmboot_bytes_do_not_collide_with_low_block_reads() {
        for image in 0..WARMBOOT_IMAGES {
            let byte = encode_warmboot(image).unwrap();
            assert_eq!(byte, 32 + image);
            assert_eq!(decode_warmboot(byte), Some(image));

            for region in Region::ALL {
                for op in [Op::Read, Op::Write] {
                    for block in 0..32 {
                        let header = Header::new(region, op, block).encode().unwrap();
                        assert_ne!(header, byte);
                    }
                }
            }
        }
        assert_eq!(encode_warmboot(4), Err(ValidationError::ImageOutOfRange(4)));
        assert_eq!(decode_warmboot(31), None);
        assert_eq!(decode_warmboot(36), None);
    }

    #[test]
    fn read_request_layout() {
        let frame = encode_read_request(Region::Bram, 0, 10, 3).unwrap();
        assert_eq!(frame.as_slice(), &[0x00, 10, 2]);
        assert_eq!(frame.len(), request_prefix_len(Region::Bram));

        let frame = encode_read_request(Region::Spram, 1, 0x3fff, 256).unwrap();
        assert_eq!(frame.as_slice(), &[0x81, 0x3f, 0xff, 0xff]);
        assert_eq!(decode_address(Region::Spram, &frame[1..3]), 0x3fff);
    }

    #[test]
    fn bram_address_must_fit_one_byte() {
        assert!(matches!(
            encode_read_request(Region::Bram, 0, 256, 1),
            Err(ValidationError::SpanOutOfRange { .. })
        ));
    }

    #[test]
    fn write_request_layout() {
        let words = [Word::new(0xaaaa), Word::new(0x1234)];
        let frame = encode_write_request(Region::Bram, 1, 0, &words).unwrap();
        assert_eq!(frame.as_slice(), &[0x41, 0x00, 0x01, 0xaa, 0xaa, 0x12, 0x34]);

        let words = [Word::new(0xbeef)];
        let frame = encode_write_request(Region::Spram, 2, 0x0102, &words).unwrap();
        assert_eq!(frame.as_slice(), &[0xc2, 0x01, 0x02, 0x00, 0xbe, 0xef]);
    }

    #[test]
    fn largest_write_fits_frame() {
        let words = [Word::new(0xffff); 256];
        let frame = encode_write_request(Region::Spram, 3, 0, &words).unwrap();
        assert_eq!(frame.len(), MAX_FRAME_LEN);
        assert!(encode_write_request(Region::Spram, 3, 0, &[]).is_err());
    }

    #[test]
    fn response_decoding() {
        let words = decode_response(&[0x00, 0x01, 0xab, 0xcd], 2).unwrap();
        assert_eq!(words, [Word::new(0x0001), Word::new(0xabcd)]);

        assert_eq!(
            decode_response(&[0x00, 0x01, 0xab], 2),
            Err(FramingError::ShortRead {
                expected: 4,
                received: 3
            })
        );
        assert_eq!(
            decode_response(&[0; 6], 2),
            Err(FramingError::LengthMismatch {
                expected: 4,
                received: 6
            })
        );
        assert_eq!(decode_words(&[1, 2, 3]), Err(FramingError::OddLength(3)));
    }
}
