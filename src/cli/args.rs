use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments for picoctl
#[derive(Parser, Debug)]
#[command(
    name = "picoctl",
    version = env!("CARGO_PKG_VERSION"),
    about = "Serial command console for Raspberry Pi Pico boards",
    long_about = "Sends single-line commands to a Pico over USB serial and prints its replies. Also encodes and inspects Brain <-> Spine contract frames."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path, layered over the global and project files
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open an interactive command console on a device
    Connect(ConnectArgs),
    /// Send one command and print the reply
    Send(SendArgs),
    /// List available serial ports
    Ports,
    /// Encode a Brain <-> Spine frame and print it as hex
    Frame(FrameArgs),
    /// Extract and validate frames from a captured byte stream
    Decode(DecodeArgs),
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
    /// CSV output
    Csv,
}

/// Which device to talk to and how
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// Device profile name
    #[arg(short, long)]
    pub device: Option<String>,

    /// Serial port path, overriding the profile
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate, overriding the profile
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Keep polling this many milliseconds for a slow reply
    #[arg(long)]
    pub reply_window: Option<u64>,

    /// Talk to an in-memory Pico instead of real hardware
    #[arg(long)]
    pub simulate: bool,
}

/// Interactive console arguments
#[derive(ClapArgs, Debug)]
pub struct ConnectArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

/// One-shot send arguments
#[derive(ClapArgs, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Command to send
    pub data: String,

    /// Data format (text, hex, base64)
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: DataFormat,
}

/// Frame encoding arguments
#[derive(ClapArgs, Debug)]
pub struct FrameArgs {
    /// Message type: name (e.g. s2b-ack), hex id (0x83) or decimal id
    #[arg(short = 't', long)]
    pub msg_type: String,

    /// Sequence number
    #[arg(short, long, default_value = "0")]
    pub seq: u16,

    /// Source node id, defaulting to the message's natural sender
    #[arg(long)]
    pub src: Option<u8>,

    /// Destination node id, defaulting to the message's natural receiver
    #[arg(long)]
    pub dst: Option<u8>,

    /// Header flags
    #[arg(long, default_value = "0")]
    pub flags: u8,

    /// Payload bytes as hex
    #[arg(long, default_value = "")]
    pub payload: String,
}

/// Stream decoding arguments
#[derive(ClapArgs, Debug)]
pub struct DecodeArgs {
    /// Encoded bytes; read from --file when omitted
    pub data: Option<String>,

    /// Encoding of DATA (hex, base64, text)
    #[arg(short, long, value_enum, default_value = "hex")]
    pub format: DataFormat,

    /// Raw capture file
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<PathBuf>,
    },
    /// Create default configuration
    Init {
        /// Project directory to create `.picoctl/config.toml` in
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Write the global configuration instead
        #[arg(short, long)]
        global: bool,
    },
    /// List device profiles
    Devices,
}

/// Data format argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Text,
    Hex,
    Base64,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormat::Text => write!(f, "text"),
            DataFormat::Hex => write!(f, "hex"),
            DataFormat::Base64 => write!(f, "base64"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_connect_overrides() {
        let args = Args::parse_from([
            "picoctl", "connect", "-d", "telemetry", "-p", "/dev/ttyUSB0", "--simulate",
        ]);

        match args.command {
            Command::Connect(connect) => {
                assert_eq!(connect.device.device.as_deref(), Some("telemetry"));
                assert_eq!(connect.device.port.as_deref(), Some("/dev/ttyUSB0"));
                assert!(connect.device.simulate);
                assert!(connect.device.baud.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_send_defaults_to_text() {
        let args = Args::parse_from(["picoctl", "-o", "json", "send", "t"]);

        assert_eq!(args.output, OutputFormat::Json);
        match args.command {
            Command::Send(send) => {
                assert_eq!(send.data, "t");
                assert_eq!(send.format, DataFormat::Text);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_decode_data_and_file_conflict() {
        let result = Args::try_parse_from(["picoctl", "decode", "3253", "--file", "capture.bin"]);
        assert!(result.is_err());
    }
}
