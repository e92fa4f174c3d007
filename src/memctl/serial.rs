use std::{
    io::{self, Read, Write},
    time::Duration,
};

use serialport::{ClearBuffer, SerialPort};
use tracing::debug;

use crate::memctl::{
    client::MemoryClient, config::Config, error::Result, shadow::ShadowMemory,
    transport::Transport,
};

/// [`Transport`] over a serial port, with RTS wired to the controller's
/// reset input.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl core::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .finish_non_exhaustive()
    }
}

impl SerialTransport {
    /// Opens `path` at `baud_rate`. `timeout` bounds every read.
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> io::Result<Self> {
        let port = serialport::new(path, baud_rate).timeout(timeout).open()?;
        debug!(path, baud_rate, ?timeout, "opened serial port");
        Ok(Self { port })
    }

    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    fn read_up_to(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::TimedOut => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn recv_exact(&mut self, len: usize) -> io::Result<Vec<u8>> {
        self.read_up_to(len)
    }

    fn drain_pending(&mut self) -> io::Result<Vec<u8>> {
        let pending = self.port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }
        self.read_up_to(pending)
    }

    fn discard_buffers(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn set_reset(&mut self, asserted: bool) -> io::Result<()> {
        self.port.write_request_to_send(asserted)?;
        Ok(())
    }
}

impl MemoryClient<SerialTransport> {
    /// Opens the configured serial port, loads the shadow files and resets
    /// the device.
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let transport =
            SerialTransport::open(&config.device.port, config.device.baud_rate, config.timeout())?;
        let shadow = ShadowMemory::open(config.device.kind, config.shadow_paths())?;
        MemoryClient::new(transport, shadow, config.client_options())
    }
}
