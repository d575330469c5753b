// Error types for OE10 communication
//
// Each failure category has its own enum so callers can tell transport
// trouble from malformed frames, protocol violations, device NAKs and bad
// arguments. PtuError wraps them all.

use std::fmt;
use std::time::Duration;

use super::packet::{MAX_COMMAND_SIZE, MAX_DATA_SIZE, MAX_LENGTH};

/// Failures of the underlying byte stream
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout after {0:?} waiting for the device")]
    Timeout(Duration),

    #[error("Connection closed by the device")]
    Closed,

    #[error("Invalid device URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
}

/// Unrecoverable framing conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    #[error("cannot frame a packet with length byte {0}, lengths of 99 or more are undefined")]
    LengthOutOfRange(u8),
}

/// Responses that do not answer the command that was sent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("buffer does not start with a complete packet")]
    NotAPacket,

    #[error("expected an ACK/NAK packet but got {command}")]
    NotAckNak { command: String },

    #[error("expected a response from device ID {expected} but got one from {actual}")]
    WrongSource { expected: u8, actual: u8 },

    #[error("ACK/NAK for {command} has {actual} data bytes, too few to hold the echoed command")]
    ShortEcho { command: String, actual: usize },

    #[error("expected an ACK/NAK for command {expected} but got it for {actual}")]
    EchoMismatch { expected: String, actual: String },

    #[error("expected response to {command} with {expected} bytes of data, but got {actual}")]
    UnexpectedDataSize {
        command: String,
        expected: usize,
        actual: usize,
    },

    #[error("angle field must be 3 bytes, got {0}")]
    AngleFieldSize(usize),

    #[error("ASCII angle representation has non-digit byte 0x{byte:02X} at position {position}")]
    InvalidAngle { byte: u8, position: usize },

    #[error("end stop flag in the reply (0x{received:02X}) does not match the sent value {sent}")]
    EndStopFlagMismatch { sent: bool, received: u8 },
}

/// Caller-supplied values rejected before any I/O
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("invalid range for speed, should be in [0,1] and got {0}")]
    SpeedOutOfRange(f32),

    #[error("angle of {degrees} degrees is outside [0, {max_deg}]")]
    AngleOutOfRange { degrees: f64, max_deg: u16 },

    #[error("command must be 1 to {max} bytes, got {0}", max = MAX_COMMAND_SIZE)]
    CommandSize(usize),

    #[error("data payload of {0} bytes exceeds the {max} byte limit", max = MAX_DATA_SIZE)]
    DataTooLarge(usize),

    #[error("packet length {0} does not fit the frame, the maximum is {max}", max = MAX_LENGTH)]
    PacketTooLong(usize),
}

/// Error bits carried by a NAK response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NakErrors(pub u8);

impl NakErrors {
    /// Meaning of each bit, bit 0 first
    pub const DESCRIPTIONS: [&'static str; 8] = [
        "device under control of another controller",
        "at focus end stop",
        "at zoom end stop",
        "command not available for this device",
        "command not recognized",
        "device timed out",
        "undefined",
        "undefined",
    ];

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, bit: u8) -> bool {
        bit < 8 && self.0 & (1 << bit) != 0
    }

    /// Descriptions of the set bits, in bit order
    pub fn descriptions(self) -> impl Iterator<Item = &'static str> {
        (0..8u8)
            .filter(move |&bit| self.contains(bit))
            .map(|bit| Self::DESCRIPTIONS[bit as usize])
    }
}

impl fmt::Display for NakErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("no error bits set");
        }
        let joined: Vec<&str> = self.descriptions().collect();
        f.write_str(&joined.join(", "))
    }
}

/// Any failure of a driver operation
#[derive(Debug, thiserror::Error)]
pub enum PtuError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{command} rejected, received NAK with the following error bits set: {errors}")]
    Rejected { command: String, errors: NakErrors },

    #[error("Invalid input: {0}")]
    Input(#[from] InputError),
}

impl PtuError {
    /// True for errors after which the connection should not be reused
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PtuError::Framing(_) | PtuError::Transport(TransportError::Closed)
        )
    }
}

pub type Result<T> = std::result::Result<T, PtuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nak_descriptions_in_bit_order() {
        let errors = NakErrors(0x05);
        assert_eq!(
            errors.to_string(),
            "device under control of another controller, at zoom end stop"
        );
    }

    #[test]
    fn test_nak_all_bits() {
        let errors = NakErrors(0xFF);
        assert_eq!(errors.descriptions().count(), 8);
        let text = errors.to_string();
        assert!(text.ends_with("device timed out, undefined, undefined"));
    }

    #[test]
    fn test_nak_single_high_bit() {
        // No leading separator when bit 0 is clear
        assert_eq!(NakErrors(0x10).to_string(), "command not recognized");
    }

    #[test]
    fn test_rejected_display() {
        let err = PtuError::Rejected {
            command: "ST".to_string(),
            errors: NakErrors(0x08),
        };
        let msg = err.to_string();
        assert!(msg.contains("ST rejected"), "{msg}");
        assert!(msg.contains("not available for this device"), "{msg}");
    }

    #[test]
    fn test_fatal_classification() {
        let framing = PtuError::from(FramingError::LengthOutOfRange(99));
        assert!(framing.is_fatal());
        assert!(PtuError::from(TransportError::Closed).is_fatal());
        assert!(!PtuError::Protocol(ProtocolError::NotAPacket).is_fatal());
        let timeout = TransportError::Timeout(Duration::from_secs(2));
        assert!(!PtuError::Transport(timeout).is_fatal());
    }
}
