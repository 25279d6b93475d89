// Transport module - Byte stream seam between a session and its device
pub mod simulated;

pub use simulated::{SimEvent, SimulatedDelay, SimulatedDevice};

use std::io;
use std::time::Duration;

/// Transport type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    Serial,
    Simulated,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportType::Serial => write!(f, "serial"),
            TransportType::Simulated => write!(f, "simulated"),
        }
    }
}

/// Blocking, line-oriented byte stream to a device.
///
/// Every method maps device loss to an `io::Error`; the session treats any
/// error as fatal.
pub trait Transport {
    /// Get the transport type
    fn transport_type(&self) -> TransportType;

    /// Human readable endpoint, e.g. `/dev/ttyACM0 @ 115200`
    fn describe(&self) -> String;

    /// Write every byte of `data`
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Number of received bytes waiting in the input buffer
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read up to and including the next `\n`.
    ///
    /// Returns whatever arrived before the read timeout if no terminator was
    /// seen, which may be empty.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Release the underlying device
    fn close(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transport_type(&self) -> TransportType {
        (**self).transport_type()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_line()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Source of pauses (boot settle, per-command processing time, polling).
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

impl<D: Delay + ?Sized> Delay for Box<D> {
    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration)
    }
}

/// Wall-clock delay backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
