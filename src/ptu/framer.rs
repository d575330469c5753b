// Frame boundary detection for the OE10 byte stream
//
// The transport hands over whatever bytes have arrived. extract_packet looks
// at the start of that buffer and decides whether it holds a complete valid
// frame, needs more bytes, or starts with garbage that must be skipped.

use tracing::debug;

use super::error::FramingError;
use super::packet::{
    self, BRACKET_CLOSE, BRACKET_OPEN, COLON, COMMAND_OFFSET, FRAME_OVERHEAD, MAX_LENGTH,
    MIN_PACKET_SIZE,
};

/// Outcome of scanning the head of a receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Not enough bytes yet to decide
    Incomplete,
    /// The leading bytes cannot start a frame; drop at least one and retry
    Invalid,
    /// A valid frame of this many bytes starts at offset 0
    Complete(usize),
}

/// Find the frame at the start of `buffer`
///
/// The only error is a length byte of 99 or more: the protocol does not say
/// how such frames are delimited, so there is no safe way to resynchronise.
pub fn extract_packet(buffer: &[u8]) -> Result<Extraction, FramingError> {
    if buffer.len() < MIN_PACKET_SIZE {
        return Ok(Extraction::Incomplete);
    }
    if buffer[0] != BRACKET_OPEN
        || buffer[1] == 0
        || buffer[2] != COLON
        || buffer[3] == 0
        || buffer[4] != COLON
        || buffer[6] != COLON
    {
        return Ok(Extraction::Invalid);
    }

    let length = buffer[5];
    if length as usize > MAX_LENGTH {
        return Err(FramingError::LengthOutOfRange(length));
    }
    let length = length as usize;
    // Room for at least a one-byte command and its separator
    if length < 2 {
        return Ok(Extraction::Invalid);
    }

    let size = FRAME_OVERHEAD + length;
    if buffer.len() < size {
        return Ok(Extraction::Incomplete);
    }

    let end = COMMAND_OFFSET + length;
    if buffer[end] != COLON || buffer[end + 2] != COLON || buffer[end + 4] != BRACKET_CLOSE {
        return Ok(Extraction::Invalid);
    }

    let checksum = packet::compute_checksum(&buffer[1..end]);
    if !packet::compare_checksum(checksum, &buffer[end + 1..end + 4]) {
        debug!("packet failed checksum test");
        return Ok(Extraction::Invalid);
    }

    Ok(Extraction::Complete(size))
}
