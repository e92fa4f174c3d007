//! Bounds checks shared by the codec, the shadow and the client.
//!
//! Every request is checked here before any byte is framed, so a rejected
//! request never touches the transport.

use crate::memctl::{
    error::ValidationError,
    types::{Device, Region},
};

/// Largest number of words one request frame can carry.
pub const MAX_REQUEST_WORDS: usize = 256;

/// Checks that `size` fits the single size byte of a frame.
///
/// # Errors
/// * [`ValidationError::ZeroSize`] - if `size` is 0
/// * [`ValidationError::SizeTooLarge`] - if `size` is above 256
pub fn check_size(size: usize) -> Result<(), ValidationError> {
    match size {
        0 => Err(ValidationError::ZeroSize),
        1..=MAX_REQUEST_WORDS => Ok(()),
        _ => Err(ValidationError::SizeTooLarge(size)),
    }
}

/// Checks that `device` has `region` and that `block` is one of its blocks.
pub fn check_block(device: Device, region: Region, block: u8) -> Result<(), ValidationError> {
    let count = device.block_count(region);
    if count == 0 {
        return Err(ValidationError::RegionUnavailable(region));
    }
    if block >= count {
        return Err(ValidationError::BlockOutOfRange {
            region,
            block,
            count,
        });
    }
    Ok(())
}

/// Calculates the flat word range a request covers inside its region.
///
/// Returns `(start, end)` where end is exclusive and both are indices into
/// the region's block-major word table.
///
/// # Errors
/// Any of the [`check_block`] and [`check_size`] errors, or
/// [`ValidationError::SpanOutOfRange`] if the request runs past the end of
/// the block.
///
/// # Example
/// ```
/// use ice_memctl::memctl::{Device, Region, helpers::word_span};
///
/// // Block 1 of BRAM starts at word 256
/// assert_eq!(word_span(Device::Hx1k, Region::Bram, 1, 10, 3), Ok((266, 269)));
/// assert!(word_span(Device::Hx1k, Region::Bram, 0, 255, 2).is_err());
/// ```
pub fn word_span(
    device: Device,
    region: Region,
    block: u8,
    address: u16,
    size: usize,
) -> Result<(usize, usize), ValidationError> {
    check_block(device, region, block)?;
    check_size(size)?;

    let words_per_block = region.words_per_block();
    let offset = address as usize;
    if offset + size > words_per_block {
        return Err(ValidationError::SpanOutOfRange {
            region,
            address,
            size,
            words_per_block,
        });
    }

    let start = block as usize * words_per_block + offset;
    Ok((start, start + size))
}

#[test]
fn word_span_edge_cases() {
    // Zero and oversize requests
    assert_eq!(
        word_span(Device::Up5k, Region::Bram, 0, 0, 0),
        Err(ValidationError::ZeroSize)
    );
    assert_eq!(
        word_span(Device::Up5k, Region::Spram, 0, 0, 257),
        Err(ValidationError::SizeTooLarge(257))
    );

    // Whole BRAM block
    assert_eq!(word_span(Device::Up5k, Region::Bram, 2, 0, 256), Ok((512, 768)));

    // Last word of a block
    assert_eq!(word_span(Device::Hx1k, Region::Bram, 0, 255, 1), Ok((255, 256)));

    // Crossing into the next block is not allowed
    assert!(matches!(
        word_span(Device::Hx1k, Region::Bram, 0, 200, 57),
        Err(ValidationError::SpanOutOfRange { .. })
    ));

    // SPRAM addresses use the full 14-bit range
    assert_eq!(
        word_span(Device::Up5k, Region::Spram, 3, 16383, 1),
        Ok((3 * 16384 + 16383, 4 * 16384))
    );

    // Blocks past the device's count
    assert_eq!(
        word_span(Device::Hx1k, Region::Bram, 16, 0, 1),
        Err(ValidationError::BlockOutOfRange {
            region: Region::Bram,
            block: 16,
            count: 16
        })
    );

    // No SPRAM on the HX1K
    assert_eq!(
        word_span(Device::Hx1k, Region::Spram, 0, 0, 1),
        Err(ValidationError::RegionUnavailable(Region::Spram))
    );
}
