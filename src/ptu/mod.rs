// OE10 pan-tilt unit protocol driver
//
// Provides:
// - Packet codec (framing, XOR checksum, ASCII angles)
// - Stream framer that finds frame boundaries in received bytes
// - Request/response transactions over a pluggable transport
// - The OE10 command set (status, positions, speeds, end stops)

pub mod angle;
mod commands;
pub mod error;
pub mod framer;
pub mod observer;
pub mod packet;
mod protocol;
pub mod transport;

pub use commands::{
    Axis, PAN_TILT_STATUS_SIZE, STATUS_SIZE, decode_pan_tilt_status, decode_status, encode_speed,
    mnemonic,
};
pub use error::{
    FramingError, InputError, NakErrors, ProtocolError, PtuError, Result, TransportError,
};
pub use framer::{Extraction, extract_packet};
pub use observer::{FrameObserver, Traffic, TrafficRecorder};
pub use packet::{ACK, BROADCAST, CONTROLLER, NAK, Packet};
pub use protocol::{Driver, check_response};
pub use transport::{DeviceUri, SerialTransport, TcpTransport, Transport, open_uri};
