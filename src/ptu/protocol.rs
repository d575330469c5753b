// Request/response transactions with an OE10 unit
//
// Every command is answered by an ACK or NAK packet whose data starts with
// the command it answers. The driver writes one command, waits for the
// framed reply and checks it against the command before handing the rest
// of the payload to the caller. Only one transaction can be in flight on a
// connection since replies carry no other correlation.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::error::{NakErrors, ProtocolError, PtuError, Result, TransportError};
use super::framer::{Extraction, extract_packet};
use super::observer::FrameObserver;
use super::packet::{BRACKET_OPEN, BROADCAST, MAX_PACKET_SIZE, Packet, format_frame};
use super::transport::{Transport, open_uri};
use crate::config::DriverConfig;

/// Driver for one OE10 connection
pub struct Driver {
    transport: Box<dyn Transport>,
    config: DriverConfig,
    // Bytes received but not yet framed
    read_buffer: Vec<u8>,
    // Scratch space for marshalling outgoing packets
    write_buffer: Vec<u8>,
    observers: Vec<Box<dyn FrameObserver>>,
}

impl Driver {
    /// Create a driver on an already open transport, with default settings
    pub fn new(transport: Box<dyn Transport>) -> Result<Self> {
        Self::with_config(transport, DriverConfig::default())
    }

    /// Create a driver on an already open transport
    pub fn with_config(mut transport: Box<dyn Transport>, config: DriverConfig) -> Result<Self> {
        transport.set_read_timeout(config.read_timeout)?;
        transport.set_write_timeout(config.write_timeout)?;
        Ok(Self {
            transport,
            config,
            read_buffer: Vec::with_capacity(2 * MAX_PACKET_SIZE),
            write_buffer: Vec::with_capacity(MAX_PACKET_SIZE),
            observers: Vec::new(),
        })
    }

    /// Open the device at `uri` (`serial:///dev/ttyUSB0:9600`, `tcp://host:port`)
    pub fn open(uri: &str) -> Result<Self> {
        Self::open_with_config(uri, DriverConfig::default())
    }

    pub fn open_with_config(uri: &str, config: DriverConfig) -> Result<Self> {
        info!("Opening OE10 device at {}", uri);
        let transport = open_uri(uri)?;
        Self::with_config(transport, config)
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.transport.set_read_timeout(timeout)?;
        self.config.read_timeout = timeout;
        Ok(())
    }

    pub fn set_write_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.transport.set_write_timeout(timeout)?;
        self.config.write_timeout = timeout;
        Ok(())
    }

    /// Register an observer for raw traffic
    pub fn add_observer(&mut self, observer: Box<dyn FrameObserver>) {
        self.observers.push(observer);
    }

    /// Give back the transport, dropping any unread bytes
    pub fn into_transport(self) -> Box<dyn Transport> {
        self.transport
    }

    /// Build a command packet from this controller to `device_id`
    pub fn command_packet(&self, device_id: u8, command: &[u8]) -> Result<Packet> {
        Ok(Packet::with_command(device_id, self.config.controller_id, command)?)
    }

    /// Marshal `packet` and write it to the device
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.write_buffer.clear();
        packet.marshal(&mut self.write_buffer)?;
        debug!(
            "writing {} bytes: {}",
            self.write_buffer.len(),
            format_frame(&self.write_buffer)
        );
        self.transport.write_all(&self.write_buffer)?;
        for observer in &self.observers {
            observer.on_frame_sent(&self.write_buffer);
        }
        Ok(())
    }

    /// Block until a complete frame has been received and parse it
    ///
    /// Leading bytes that cannot start a frame are skipped. Gives up with a
    /// timeout once the read timeout has elapsed without a full frame.
    pub fn read_packet(&mut self) -> Result<Packet> {
        let timeout = self.config.read_timeout;
        let result = self.read_packet_before(Instant::now() + timeout);
        // Reads shrink the transport timeout to what is left of the deadline
        let restored = self.transport.set_read_timeout(timeout);
        let packet = result?;
        restored?;
        Ok(packet)
    }

    fn read_packet_before(&mut self, deadline: Instant) -> Result<Packet> {
        let timeout = self.config.read_timeout;
        let mut chunk = [0u8; MAX_PACKET_SIZE];

        loop {
            match extract_packet(&self.read_buffer) {
                Ok(Extraction::Complete(size)) => {
                    let frame: Vec<u8> = self.read_buffer.drain(..size).collect();
                    debug!("received {} bytes: {}", size, format_frame(&frame));
                    let packet = Packet::parse(&frame, false)?;
                    for observer in &self.observers {
                        observer.on_frame_received(&frame);
                    }
                    return Ok(packet);
                }
                Ok(Extraction::Invalid) => {
                    self.discard_garbage();
                    continue;
                }
                Ok(Extraction::Incomplete) => {}
                Err(e) => {
                    // No way to find the end of this frame, the stream is lost
                    warn!("{}, dropping {} buffered bytes", e, self.read_buffer.len());
                    self.read_buffer.clear();
                    return Err(e.into());
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout(timeout).into());
            }
            self.transport.set_read_timeout(remaining)?;
            let n = match self.transport.read(&mut chunk) {
                Err(TransportError::Timeout(_)) => {
                    return Err(TransportError::Timeout(timeout).into());
                }
                other => other?,
            };
            self.read_buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Drop bytes up to the next possible frame start
    fn discard_garbage(&mut self) {
        let skip = self.read_buffer[1..]
            .iter()
            .position(|&b| b == BRACKET_OPEN)
            .map_or(self.read_buffer.len(), |pos| pos + 1);
        let dropped: Vec<u8> = self.read_buffer.drain(..skip).collect();
        warn!(
            "discarding {} bytes: {}",
            dropped.len(),
            format_frame(&dropped)
        );
        for observer in &self.observers {
            observer.on_bytes_discarded(&dropped);
        }
    }

    /// Read the reply to `command` and return it with the echoed command
    /// stripped from its data
    ///
    /// Use after [`write_packet`](Self::write_packet) when the reply should
    /// be collected later.
    pub fn read_response(&mut self, command: &Packet, expected_size: usize) -> Result<Packet> {
        let response = self.read_packet()?;
        check_response(command, response, expected_size)
    }

    /// Write `command` and wait for its reply
    pub fn send_and_receive(&mut self, command: &Packet, expected_size: usize) -> Result<Packet> {
        self.write_packet(command)?;
        self.read_response(command, expected_size)
    }
}

/// Check that `response` answers `command` and strip the echoed command
///
/// A NAK is turned into [`PtuError::Rejected`] carrying the error bits
/// found after the echo.
pub fn check_response(
    command: &Packet,
    mut response: Packet,
    expected_size: usize,
) -> Result<Packet> {
    if !response.is_ack() && !response.is_nak() {
        return Err(ProtocolError::NotAckNak {
            command: response.command_as_string(),
        }
        .into());
    }

    if command.to != BROADCAST && response.from != command.to {
        return Err(ProtocolError::WrongSource {
            expected: command.to,
            actual: response.from,
        }
        .into());
    }

    let echo_size = command.command_size();
    if response.data_size() < echo_size {
        return Err(ProtocolError::ShortEcho {
            command: command.command_as_string(),
            actual: response.data_size(),
        }
        .into());
    }
    let echo = &response.data()[..echo_size];
    if echo != command.command() {
        return Err(ProtocolError::EchoMismatch {
            expected: command.command_as_string(),
            actual: String::from_utf8_lossy(echo).into_owned(),
        }
        .into());
    }

    if response.is_nak() {
        let bits = response.data().get(echo_size).copied().unwrap_or(0);
        return Err(PtuError::Rejected {
            command: command.command_as_string(),
            errors: NakErrors(bits),
        });
    }

    let actual = response.data_size() - echo_size;
    if actual != expected_size {
        return Err(ProtocolError::UnexpectedDataSize {
            command: command.command_as_string(),
            expected: expected_size,
            actual,
        }
        .into());
    }

    response.strip_data_prefix(echo_size);
    Ok(response)
}
