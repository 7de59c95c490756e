use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

use crate::error::{Result, TransportError};
use crate::stream::StreamTransport;

/// Line settings used when the opened path is a serial line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line speed in baud.
    pub baud_rate: u32,
    /// How long a read waits for the first byte before returning empty.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            timeout: Duration::from_millis(50),
        }
    }
}

/// One half of an opened device path.
pub enum DeviceHandle {
    /// Regular file, FIFO, or other non-terminal node, opened non-blocking.
    File(File),
    /// Serial line in raw mode with a read timeout.
    Serial(Box<dyn SerialPort>),
}

impl DeviceHandle {
    pub fn is_serial(&self) -> bool {
        matches!(self, DeviceHandle::Serial(_))
    }

    fn try_clone(&self) -> io::Result<Self> {
        match self {
            DeviceHandle::File(file) => file.try_clone().map(DeviceHandle::File),
            DeviceHandle::Serial(port) => port
                .try_clone()
                .map(DeviceHandle::Serial)
                .map_err(io::Error::from),
        }
    }
}

impl Read for DeviceHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DeviceHandle::File(file) => file.read(buf),
            DeviceHandle::Serial(port) => port.read(buf),
        }
    }
}

impl Write for DeviceHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            DeviceHandle::File(file) => file.write(buf),
            DeviceHandle::Serial(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            DeviceHandle::File(file) => file.flush(),
            DeviceHandle::Serial(port) => port.flush(),
        }
    }
}

/// Transport over a device node or file path.
pub type DeviceTransport = StreamTransport<DeviceHandle, DeviceHandle>;

impl StreamTransport<DeviceHandle, DeviceHandle> {
    /// Open a serial device or file with the default line settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &SerialConfig::default())
    }

    /// Open a serial device or file for reading and writing.
    ///
    /// Terminals are opened as serial lines: raw mode, `config.baud_rate`, and
    /// reads that give up after `config.timeout`. Anything else is opened
    /// non-blocking, so an idle FIFO reads as empty rather than stalling.
    pub fn open_with(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |source: io::Error| TransportError::Open {
            path: path.to_path_buf(),
            source,
        };

        let file = open_file(path).map_err(open_err)?;
        let reader = if is_serial_line(&file, path) {
            drop(file);
            let port = serialport::new(path.to_string_lossy(), config.baud_rate)
                .timeout(config.timeout)
                .open()
                .map_err(|err| open_err(err.into()))?;
            info!(?path, baud = config.baud_rate, "opened serial line");
            DeviceHandle::Serial(port)
        } else {
            info!(?path, "opened stream transport");
            DeviceHandle::File(file)
        };
        let writer = reader.try_clone().map_err(open_err)?;

        Ok(Self::new(reader, writer))
    }
}

#[cfg(unix)]
fn open_file(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
        .open(path)
}

#[cfg(not(unix))]
fn open_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

#[cfg(unix)]
fn is_serial_line(file: &File, _path: &Path) -> bool {
    use std::io::IsTerminal;

    file.is_terminal()
}

#[cfg(not(unix))]
fn is_serial_line(_file: &File, path: &Path) -> bool {
    let name = path.to_string_lossy().to_ascii_uppercase();
    name.starts_with(r"\\.\") || name.starts_with("COM")
}
