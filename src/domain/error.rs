use thiserror::Error;

/// picoctl unified error type
#[derive(Error, Debug)]
pub enum PicoCtlError {
    /// The device could not be opened. Fatal before any command is sent.
    #[error("Could not connect to {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// I/O failed on an open transport. Fatal to the session.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl PicoCtlError {
    /// Remediation hints shown to the user when opening the device failed.
    pub fn hints(&self) -> &'static [&'static str] {
        match self {
            PicoCtlError::Connection { .. } => &[
                "Unplug and replug the Pico.",
                "Run 'ls /dev/ttyACM*' (or 'picoctl ports') to see the correct device.",
            ],
            _ => &[],
        }
    }

    /// True when the failure happened while opening the device.
    pub fn is_connection(&self) -> bool {
        matches!(self, PicoCtlError::Connection { .. })
    }
}

pub type PicoCtlResult<T> = Result<T, PicoCtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_carries_port_and_hints() {
        let error = PicoCtlError::Connection {
            port: "/dev/ttyACM9".to_string(),
            source: serialport::Error::new(serialport::ErrorKind::NoDevice, "no such device"),
        };

        assert!(error.is_connection());
        assert!(error.to_string().contains("/dev/ttyACM9"));
        assert_eq!(error.hints().len(), 2);
    }

    #[test]
    fn test_io_error_becomes_transport_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let error: PicoCtlError = io_error.into();

        assert!(matches!(error, PicoCtlError::Transport(_)));
        assert!(!error.is_connection());
        assert!(error.hints().is_empty());
    }
}
