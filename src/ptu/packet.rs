// OE10 packet codec
//
// Frame format:
//   '<' TO ':' FROM ':' LEN ':' CMD[1-2] ':' DATA[..] ':' CHK ':' IND '>'
//
// LEN counts the command, the separator after it and the data. CHK is the
// XOR of every byte from TO to the end of DATA. When CHK collides with one
// of the frame brackets it is replaced by 0xFF and IND tells which one it
// was, otherwise IND is 'G'.

use std::fmt::Write as _;

use super::error::{InputError, ProtocolError, Result};
use super::framer::{Extraction, extract_packet};

/// Default controller address
pub const CONTROLLER: u8 = 0x01;
/// Broadcast destination address
pub const BROADCAST: u8 = 0xFF;

/// Command byte of a positive acknowledgement
pub const ACK: u8 = 0x06;
/// Command byte of a negative acknowledgement
pub const NAK: u8 = 0x15;

pub const BRACKET_OPEN: u8 = b'<';
pub const BRACKET_CLOSE: u8 = b'>';
pub const COLON: u8 = b':';

/// Stands in for a checksum that equals one of the brackets
pub const CHECKSUM_SENTINEL: u8 = 0xFF;
const CHECKSUM_GIVEN: u8 = b'G';
const CHECKSUM_WAS_OPEN: u8 = b'0';
const CHECKSUM_WAS_CLOSE: u8 = b'1';

pub const MAX_COMMAND_SIZE: usize = 2;
pub const MAX_DATA_SIZE: usize = 253;
/// Largest length byte the framer accepts
pub const MAX_LENGTH: usize = 98;

/// Bytes of a frame that are not counted by the length byte
pub const FRAME_OVERHEAD: usize = 12;
/// Smallest possible frame: one-byte command, no data
pub const MIN_PACKET_SIZE: usize = FRAME_OVERHEAD + 2;
pub const MAX_PACKET_SIZE: usize = FRAME_OVERHEAD + MAX_LENGTH;

/// Offset of the first command byte in a frame
pub(crate) const COMMAND_OFFSET: usize = 7;

/// A single protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub to: u8,
    pub from: u8,
    command: heapless::Vec<u8, MAX_COMMAND_SIZE>,
    data: heapless::Vec<u8, MAX_DATA_SIZE>,
}

impl Default for Packet {
    fn default() -> Self {
        Self::new(BROADCAST, CONTROLLER)
    }
}

impl Packet {
    /// Create an empty packet addressed to `to`, sent from `from`
    pub fn new(to: u8, from: u8) -> Self {
        Self {
            to,
            from,
            command: heapless::Vec::new(),
            data: heapless::Vec::new(),
        }
    }

    /// Create a packet carrying the given command and no data
    pub fn with_command(
        to: u8,
        from: u8,
        command: &[u8],
    ) -> std::result::Result<Self, InputError> {
        let mut packet = Self::new(to, from);
        packet.set_command(command)?;
        Ok(packet)
    }

    /// Set the 1 or 2 byte command
    pub fn set_command(&mut self, command: &[u8]) -> std::result::Result<(), InputError> {
        if command.is_empty() {
            return Err(InputError::CommandSize(0));
        }
        self.command = heapless::Vec::from_slice(command)
            .map_err(|_| InputError::CommandSize(command.len()))?;
        Ok(())
    }

    /// Replace the data payload
    pub fn set_data(&mut self, data: &[u8]) -> std::result::Result<(), InputError> {
        self.data = heapless::Vec::from_slice(data)
            .map_err(|_| InputError::DataTooLarge(data.len()))?;
        Ok(())
    }

    pub fn command(&self) -> &[u8] {
        &self.command
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn command_size(&self) -> usize {
        self.command.len()
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Value of the length byte: command + separator + data
    pub fn length(&self) -> usize {
        self.command.len() + self.data.len() + 1
    }

    pub fn is_ack(&self) -> bool {
        self.command.as_slice() == [ACK]
    }

    pub fn is_nak(&self) -> bool {
        self.command.as_slice() == [NAK]
    }

    /// Drop the first `count` data bytes
    pub(crate) fn strip_data_prefix(&mut self, count: usize) {
        let count = count.min(self.data.len());
        let rest: heapless::Vec<u8, MAX_DATA_SIZE> = self.data[count..].iter().copied().collect();
        self.data = rest;
    }

    /// Human readable command, "ACK"/"NAK" for the acknowledgement markers
    pub fn command_as_string(&self) -> String {
        match self.command.as_slice() {
            [ACK] => "ACK".to_string(),
            [NAK] => "NAK".to_string(),
            bytes => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Append the wire representation of this packet to `buffer`
    pub fn marshal(&self, buffer: &mut Vec<u8>) -> std::result::Result<(), InputError> {
        if self.command.is_empty() {
            return Err(InputError::CommandSize(0));
        }
        let length = self.length();
        if length > MAX_LENGTH {
            return Err(InputError::PacketTooLong(length));
        }

        let start = buffer.len();
        buffer.reserve(FRAME_OVERHEAD + length);
        buffer.extend_from_slice(&[
            BRACKET_OPEN,
            self.to,
            COLON,
            self.from,
            COLON,
            length as u8,
            COLON,
        ]);
        buffer.extend_from_slice(&self.command);
        buffer.push(COLON);
        buffer.extend_from_slice(&self.data);

        // Checksum over TO through the end of DATA (skip the opening bracket)
        let checksum = compute_checksum(&buffer[start + 1..]);
        buffer.push(COLON);
        buffer.extend_from_slice(&marshal_checksum(checksum));
        buffer.push(BRACKET_CLOSE);
        Ok(())
    }

    /// Build a packet from a buffer that starts with a complete frame
    ///
    /// With `validate` set, the buffer is first run through the framer and
    /// anything that is not a complete valid frame is rejected. Without it
    /// only the bounds needed to slice the fields are checked.
    pub fn parse(buffer: &[u8], validate: bool) -> Result<Self> {
        if validate {
            match extract_packet(buffer)? {
                Extraction::Complete(_) => {}
                Extraction::Incomplete | Extraction::Invalid => {
                    return Err(ProtocolError::NotAPacket.into());
                }
            }
        } else if buffer.len() < MIN_PACKET_SIZE {
            return Err(ProtocolError::NotAPacket.into());
        }

        let length = buffer[5] as usize;
        let command_size = if buffer[COMMAND_OFFSET + 1] == COLON {
            1
        } else {
            2
        };
        if length < command_size + 1 || buffer.len() < FRAME_OVERHEAD + length {
            return Err(ProtocolError::NotAPacket.into());
        }

        let data_start = COMMAND_OFFSET + command_size + 1;
        let data_size = length - command_size - 1;

        let mut packet = Packet::new(buffer[1], buffer[3]);
        packet.set_command(&buffer[COMMAND_OFFSET..COMMAND_OFFSET + command_size])?;
        packet.set_data(&buffer[data_start..data_start + data_size])?;
        Ok(packet)
    }
}

/// XOR of all bytes
pub fn compute_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}

/// Encode a checksum as the 3-byte field written between the last two colons
pub fn marshal_checksum(checksum: u8) -> [u8; 3] {
    match checksum {
        BRACKET_OPEN => [CHECKSUM_SENTINEL, COLON, CHECKSUM_WAS_OPEN],
        BRACKET_CLOSE => [CHECKSUM_SENTINEL, COLON, CHECKSUM_WAS_CLOSE],
        raw => [raw, COLON, CHECKSUM_GIVEN],
    }
}

/// Check a 3-byte checksum field against the expected checksum
pub fn compare_checksum(expected: u8, field: &[u8]) -> bool {
    let [value, separator, indicator] = match field {
        [a, b, c] => [*a, *b, *c],
        _ => return false,
    };
    if separator != COLON {
        return false;
    }
    match (value, indicator) {
        (raw, CHECKSUM_GIVEN) => raw == expected,
        (CHECKSUM_SENTINEL, CHECKSUM_WAS_OPEN) => expected == BRACKET_OPEN,
        (CHECKSUM_SENTINEL, CHECKSUM_WAS_CLOSE) => expected == BRACKET_CLOSE,
        _ => false,
    }
}

/// Printable dump of raw frame bytes, for logs
pub fn format_frame(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        if b.is_ascii_graphic() || b == b' ' {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\x{:02X}", b);
        }
    }
    out
}
