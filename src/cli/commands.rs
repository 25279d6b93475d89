use crate::cli::args::{
    Args, Command, ConfigArgs, ConfigCommand, ConnectArgs, DataFormat, DecodeArgs, DeviceArgs,
    FrameArgs, SendArgs,
};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::session::{run_interactive, CommandSession, LoopOutcome, ReplyRecord, SessionState};
use crate::core::transport::{Delay, SimulatedDevice, ThreadDelay, Transport};
use crate::domain::config::{DeviceConfig, PicoCtlConfig};
use crate::domain::error::{PicoCtlError, PicoCtlResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::{list_ports, SerialLink};
use crate::protocol::constants::{PROTO_VERSION_MAJOR, PROTO_VERSION_MINOR};
use crate::protocol::{inspect_stream, MessageType, Packet};
use std::fs;
use std::io;
use tracing::{debug, info};

/// Execute CLI command
pub fn execute_command(args: Args) -> PicoCtlResult<()> {
    let writer = ConsoleWriter::new(args.output);

    let config_manager = ConfigManager::new()?;
    let config = match &args.config {
        Some(path) => config_manager.load_config_with_override(path)?,
        None => config_manager.load_config()?,
    };

    if !args.quiet {
        init_logging(&config.global.log_level, args.verbose)?;
    }

    match args.command {
        Command::Connect(connect_args) => execute_connect(connect_args, &writer, &config, args.verbose),
        Command::Send(send_args) => execute_send(send_args, &writer, &config),
        Command::Ports => {
            let ports = list_ports()?;
            writer.write_ports(&ports)?;
            Ok(())
        }
        Command::Frame(frame_args) => execute_frame(frame_args, &writer),
        Command::Decode(decode_args) => execute_decode(decode_args, &writer),
        Command::Config(config_args) => {
            execute_config_command(config_args, &writer, &config, &config_manager)
        }
        Command::Version => {
            writer.write_message(&format!(
                "picoctl {} (Brain <-> Spine contract v{}.{})",
                env!("CARGO_PKG_VERSION"),
                PROTO_VERSION_MAJOR,
                PROTO_VERSION_MINOR
            ))?;
            Ok(())
        }
    }
}

/// Apply command line overrides on top of the selected profile.
fn resolve_device(args: &DeviceArgs, config: &PicoCtlConfig) -> PicoCtlResult<DeviceConfig> {
    let mut device = config.resolve_device(args.device.as_deref())?;

    if let Some(port) = &args.port {
        device.port = port.clone();
    }
    if let Some(baud) = args.baud {
        device.baud_rate = baud;
    }
    if let Some(window) = args.reply_window {
        device.timing.reply_window_ms = window;
    }

    device.commands.validate()?;
    Ok(device)
}

fn simulated(device: &DeviceConfig) -> SimulatedDevice {
    SimulatedDevice::pico().named(&device.name)
}

fn execute_connect(
    args: ConnectArgs,
    writer: &ConsoleWriter,
    config: &PicoCtlConfig,
    verbose: bool,
) -> PicoCtlResult<()> {
    let device = resolve_device(&args.device, config)?;

    let state = if args.device.simulate {
        let link = simulated(&device);
        let delay = link.delay();
        interact(link, &device, delay, writer)?
    } else {
        writer.write_message(&format!(
            "Connecting to {} at {} baud...",
            device.port, device.baud_rate
        ))?;
        let link = SerialLink::open(&device)?;
        interact(link, &device, ThreadDelay, writer)?
    };

    if verbose {
        writer.write_session(&state)?;
    }
    Ok(())
}

/// Run the console on stdin/stdout. A lost device is reported, not returned.
fn interact<T, D>(
    transport: T,
    device: &DeviceConfig,
    delay: D,
    writer: &ConsoleWriter,
) -> PicoCtlResult<SessionState>
where
    T: Transport,
    D: Delay,
{
    let session = CommandSession::open(transport, device, delay);

    let stdin = io::stdin();
    match run_interactive(session, stdin.lock(), io::stdout())? {
        LoopOutcome::Quit(state) => {
            debug!("Console closed after {} command(s)", state.statistics.commands_sent);
            Ok(state)
        }
        LoopOutcome::Disconnected { state, error } => {
            writer.write_error(&format!("Device disconnected unexpectedly ({})", error))?;
            Ok(state)
        }
    }
}

fn execute_send(args: SendArgs, writer: &ConsoleWriter, config: &PicoCtlConfig) -> PicoCtlResult<()> {
    let device = resolve_device(&args.device, config)?;
    let text = parse_command(&args.data, args.format, &device)?;

    let record = if args.device.simulate {
        let link = simulated(&device);
        let delay = link.delay();
        send_once(link, &device, delay, &text)?
    } else {
        let link = SerialLink::open(&device)?;
        send_once(link, &device, ThreadDelay, &text)?
    };

    writer.write_reply(&record)?;
    Ok(())
}

/// Decode a one-shot command argument; the quit token has no meaning here.
fn parse_command(data: &str, format: DataFormat, device: &DeviceConfig) -> PicoCtlResult<String> {
    let bytes = parse_data(data, format)?;
    let text = String::from_utf8(bytes)
        .map_err(|_| PicoCtlError::InvalidInput("Command must be valid UTF-8 text".to_string()))?;

    if device.commands.is_quit(&text) {
        return Err(PicoCtlError::InvalidInput(format!(
            "'{}' is the console quit token and is never sent to the device",
            text
        )));
    }
    Ok(text)
}

/// Open, send one command, close.
fn send_once<T, D>(transport: T, device: &DeviceConfig, delay: D, text: &str) -> PicoCtlResult<ReplyRecord>
where
    T: Transport,
    D: Delay,
{
    let mut session = CommandSession::open(transport, device, delay);
    let reply = session.send_command(text)?;
    let record = ReplyRecord::new(&reply, session.table());
    session.close()?;
    Ok(record)
}

fn execute_frame(args: FrameArgs, writer: &ConsoleWriter) -> PicoCtlResult<()> {
    let kind: MessageType = args.msg_type.parse().map_err(PicoCtlError::InvalidInput)?;
    let payload = parse_data(&args.payload, DataFormat::Hex)?;

    let packet = Packet::with_raw_type(
        kind.id(),
        args.src.unwrap_or(kind.source() as u8),
        args.dst.unwrap_or(kind.destination() as u8),
        args.seq,
        payload,
    )
    .map_err(|e| PicoCtlError::Protocol(e.to_string()))?
    .with_flags(args.flags);

    debug!("Encoded {} seq={} ({} bytes)", kind, args.seq, packet.header.frame_len());
    writer.write_frame(&packet)?;
    Ok(())
}

fn execute_decode(args: DecodeArgs, writer: &ConsoleWriter) -> PicoCtlResult<()> {
    let bytes = match (&args.data, &args.file) {
        (Some(data), _) => parse_data(data, args.format)?,
        (None, Some(path)) => fs::read(path).map_err(|e| {
            PicoCtlError::InvalidInput(format!("Failed to read {}: {}", path.display(), e))
        })?,
        (None, None) => {
            return Err(PicoCtlError::InvalidInput(
                "Provide encoded DATA or --file with a raw capture".to_string(),
            ))
        }
    };

    let (stats, frames) = inspect_stream(&bytes);
    info!(
        "Scanned {} bytes: {} frame(s), {} sync loss(es)",
        bytes.len(),
        stats.frames_extracted,
        stats.sync_losses
    );
    writer.write_harness(&stats, &frames)?;
    Ok(())
}

fn execute_config_command(
    args: ConfigArgs,
    writer: &ConsoleWriter,
    config: &PicoCtlConfig,
    config_manager: &ConfigManager,
) -> PicoCtlResult<()> {
    match args.command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            let result = match &file {
                Some(path) => config_manager
                    .load_config_from_path(path)
                    .and_then(|loaded| loaded.validate()),
                None => config.validate(),
            };
            match (result, file) {
                (Ok(()), Some(path)) => {
                    writer.write_message(&format!("Configuration file '{}' is valid", path.display()))?
                }
                (Ok(()), None) => writer.write_message("Current configuration is valid")?,
                (Err(e), _) => return Err(e),
            }
            Ok(())
        }
        ConfigCommand::Init { dir, global } => {
            let path = if global {
                config_manager.init_global_config()?
            } else {
                let target = match dir {
                    Some(dir) => dir,
                    None => std::env::current_dir().map_err(|e| PicoCtlError::Config {
                        message: format!("Failed to get current directory: {}", e),
                    })?,
                };
                config_manager.init_project_config(&target)?
            };
            writer.write_message(&format!("Configuration initialized at '{}'", path.display()))?;
            Ok(())
        }
        ConfigCommand::Devices => {
            writer.write_devices(&config.devices)?;
            Ok(())
        }
    }
}

fn parse_data(data: &str, format: DataFormat) -> PicoCtlResult<Vec<u8>> {
    match format {
        DataFormat::Text => Ok(data.as_bytes().to_vec()),
        DataFormat::Hex => {
            let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
            hex::decode(&cleaned)
                .map_err(|e| PicoCtlError::InvalidInput(format!("Invalid hex data: {}", e)))
        }
        DataFormat::Base64 => {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(data.trim())
                .map_err(|e| PicoCtlError::InvalidInput(format!("Invalid base64 data: {}", e)))
        }
    }
}
