use std::{
    io::{self, BufRead, BufReader, Read},
    time::Duration,
};

use serialport::SerialPort;
use tracing::{debug, instrument};

/// A line oriented byte source with a read timeout.
pub trait Transport: Send {
    /// Block until a full line (including its `\n`) has been read or the
    /// read timed out. A timeout yields whatever arrived before it, which
    /// may be nothing.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;
}

/// Where and how fast to talk to the sensor board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

/// Splits any byte stream into `\n` terminated lines.
pub struct LineTransport<R> {
    reader: BufReader<R>,
}

pub type SerialTransport = LineTransport<Box<dyn SerialPort>>;

impl<R: Read> LineTransport<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }
}

impl<R: Read + Send> Transport for LineTransport<R> {
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(_) => Ok(line),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(line),
            Err(e) => Err(e),
        }
    }
}

/// Open the serial port described by `settings`.
#[instrument(skip_all)]
pub fn open_serial(settings: &SerialSettings) -> Result<SerialTransport, serialport::Error> {
    debug!(
        "Opening port '{}' at {} baud.",
        settings.port_name, settings.baud_rate
    );
    let port = serialport::new(settings.port_name.as_str(), settings.baud_rate)
        .timeout(settings.timeout)
        .open()?;
    Ok(LineTransport::new(port))
}
