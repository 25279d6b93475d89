use crate::core::transport::{Transport, TransportType};
use crate::domain::config::DeviceConfig;
use crate::domain::error::{PicoCtlError, PicoCtlResult};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use tracing::{debug, info, warn};

/// Serial connection to a Pico over USB CDC
pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
    port_name: String,
    baud_rate: u32,
}

impl SerialLink {
    /// Open the device described by `device` with 8N1 framing and its read timeout.
    pub fn open(device: &DeviceConfig) -> PicoCtlResult<Self> {
        debug!(
            "Opening {} at {} baud (timeout {:?})",
            device.port,
            device.baud_rate,
            device.read_timeout()
        );

        let port = serialport::new(&device.port, device.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(device.read_timeout())
            .open()
            .map_err(|source| PicoCtlError::Connection {
                port: device.port.clone(),
                source,
            })?;

        info!("Serial port {} opened successfully", device.port);

        Ok(Self {
            port: Some(port),
            port_name: device.port.clone(),
            baud_rate: device.baud_rate,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn port_mut(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port is closed"))
    }
}

impl Transport for SerialLink {
    fn transport_type(&self) -> TransportType {
        TransportType::Serial
    }

    fn describe(&self) -> String {
        format!("{} @ {}", self.port_name, self.baud_rate)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()?;
        debug!("Sent {} bytes over serial", data.len());
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let waiting = self.port_mut()?.bytes_to_read().map_err(io::Error::from)?;
        Ok(waiting as usize)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let port = self.port_mut()?;
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                    if !line.is_empty() {
                        warn!("Read timed out mid-line after {} bytes", line.len());
                    }
                    break;
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        debug!("Received {} bytes over serial", line.len());
        Ok(line)
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(port) = self.port.take() {
            drop(port);
            info!("Serial port {} closed", self.port_name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_device_is_a_connection_error() {
        let device = DeviceConfig {
            port: "/dev/picoctl-no-such-device".to_string(),
            ..DeviceConfig::default()
        };

        match SerialLink::open(&device) {
            Err(PicoCtlError::Connection { port, .. }) => {
                assert_eq!(port, "/dev/picoctl-no-such-device");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opening a missing device must fail"),
        }
    }

    #[test]
    fn test_non_serial_file_fails_gracefully() {
        let device = DeviceConfig {
            port: "/dev/null".to_string(),
            ..DeviceConfig::default()
        };

        // /dev/null is not a tty
        assert!(SerialLink::open(&device).is_err());
    }
}
