// Byte stream transports for the OE10 driver
//
// The driver only needs blocking reads and writes with timeouts. Serial
// ports (RS-232/RS-485 adapters) and TCP serial servers both provide that.

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::error::TransportError;
use crate::config::{DEFAULT_BAUDRATE, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT};

pub type Result<T> = std::result::Result<T, TransportError>;

/// Blocking byte stream the driver talks through
pub trait Transport: Send {
    /// Read whatever bytes are available, blocking up to the read timeout.
    /// Returns the number of bytes read, which is never zero on success.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all bytes, blocking up to the write timeout
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()>;

    fn set_write_timeout(&mut self, timeout: Duration) -> Result<()>;
}

/// Map a timed out read/write to TransportError::Timeout
fn map_io(err: io::Error, timeout: Duration) -> TransportError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout(timeout),
        _ => TransportError::Io(err),
    }
}

/// Serial port transport
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl SerialTransport {
    /// Open a serial port at the given baud rate
    pub fn open(path: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(path, baudrate)
            .timeout(DEFAULT_READ_TIMEOUT)
            .open()?;

        Ok(Self {
            port,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        // serialport has one timeout for both directions
        self.port.set_timeout(self.read_timeout)?;
        match self.port.read(buf) {
            Ok(0) => Err(TransportError::Timeout(self.read_timeout)),
            Ok(n) => Ok(n),
            Err(e) => Err(map_io(e, self.read_timeout)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.set_timeout(self.write_timeout)?;
        self.port
            .write_all(bytes)
            .and_then(|_| self.port.flush())
            .map_err(|e| map_io(e, self.write_timeout))
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }

    fn set_write_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.write_timeout = timeout;
        Ok(())
    }
}

/// TCP transport, for units behind a serial-to-ethernet bridge
pub struct TcpTransport {
    stream: TcpStream,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl TcpTransport {
    pub fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(DEFAULT_READ_TIMEOUT))?;
        stream.set_write_timeout(Some(DEFAULT_WRITE_TIMEOUT))?;
        Ok(Self {
            stream,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        })
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.stream.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(e) => Err(map_io(e, self.read_timeout)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream
            .write_all(bytes)
            .map_err(|e| map_io(e, self.write_timeout))
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.stream.set_read_timeout(Some(socket_timeout(timeout)))?;
        self.read_timeout = timeout;
        Ok(())
    }

    fn set_write_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.stream.set_write_timeout(Some(socket_timeout(timeout)))?;
        self.write_timeout = timeout;
        Ok(())
    }
}

// A zero duration would mean "no timeout" to the socket
fn socket_timeout(timeout: Duration) -> Duration {
    timeout.max(Duration::from_millis(1))
}

/// Where a device is reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceUri {
    /// `serial:///dev/ttyUSB0:9600`, or a bare device path
    Serial { path: String, baudrate: u32 },
    /// `tcp://host:port`
    Tcp { address: String },
}

impl FromStr for DeviceUri {
    type Err = TransportError;

    fn from_str(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| TransportError::InvalidUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        if let Some(rest) = uri.strip_prefix("serial://") {
            // An optional trailing ":BAUD"
            let (path, baudrate) = match rest.rsplit_once(':') {
                Some((path, baud)) => {
                    let baudrate = baud.parse().map_err(|_| invalid("bad baud rate"))?;
                    (path, baudrate)
                }
                None => (rest, DEFAULT_BAUDRATE),
            };
            if path.is_empty() {
                return Err(invalid("missing device path"));
            }
            Ok(DeviceUri::Serial {
                path: path.to_string(),
                baudrate,
            })
        } else if let Some(address) = uri.strip_prefix("tcp://") {
            match address.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                    Ok(DeviceUri::Tcp {
                        address: address.to_string(),
                    })
                }
                _ => Err(invalid("expected tcp://HOST:PORT")),
            }
        } else if uri.starts_with('/') {
            Ok(DeviceUri::Serial {
                path: uri.to_string(),
                baudrate: DEFAULT_BAUDRATE,
            })
        } else {
            Err(invalid("unknown scheme, use serial:// or tcp://"))
        }
    }
}

impl DeviceUri {
    /// Open the transport this URI designates
    pub fn open(&self) -> Result<Box<dyn Transport>> {
        match self {
            DeviceUri::Serial { path, baudrate } => {
                info!("Opening serial port {} at {} baud", path, baudrate);
                Ok(Box::new(SerialTransport::open(path, *baudrate)?))
            }
            DeviceUri::Tcp { address } => {
                info!("Connecting to {}", address);
                Ok(Box::new(TcpTransport::connect(address)?))
            }
        }
    }
}

/// Parse a device URI and open it
pub fn open_uri(uri: &str) -> Result<Box<dyn Transport>> {
    uri.parse::<DeviceUri>()?.open()
}
