use crate::cli::args::OutputFormat;
use crate::core::session::{ReplyRecord, SessionState, NO_RESPONSE};
use crate::domain::config::{DeviceConfig, PicoCtlConfig};
use crate::infrastructure::serial::PortInfo;
use crate::protocol::{FrameReport, HarnessStats, Packet};
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_reply(&self, reply: &ReplyRecord) -> Result<(), OutputError>;
    fn write_session(&self, session: &SessionState) -> Result<(), OutputError>;
    fn write_ports(&self, ports: &[PortInfo]) -> Result<(), OutputError>;
    fn write_config(&self, config: &PicoCtlConfig) -> Result<(), OutputError>;
    fn write_devices(&self, devices: &[DeviceConfig]) -> Result<(), OutputError>;
    fn write_frame(&self, packet: &Packet) -> Result<(), OutputError>;
    fn write_harness(&self, stats: &HarnessStats, frames: &[FrameReport]) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::PicoCtlError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), OutputError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table<R: Tabled>(rows: Vec<R>) {
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }
}

/// Quote a CSV field when it needs it
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[derive(Serialize)]
struct EncodedFrame<'a> {
    msg_type: u8,
    msg_name: Option<&'static str>,
    seq: u16,
    length: usize,
    hex: &'a str,
}

#[derive(Serialize)]
struct HarnessOutput<'a> {
    stats: &'a HarnessStats,
    frames: &'a [FrameReport],
}

impl OutputWriter for ConsoleWriter {
    fn write_reply(&self, reply: &ReplyRecord) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => match &reply.response {
                Some(text) => match &reply.unit {
                    Some(unit) => println!("{}: {} {}", reply.label, text, unit),
                    None => println!("{}: {}", reply.label, text),
                },
                None => println!("{}", NO_RESPONSE),
            },
            OutputFormat::Json => print_json(reply)?,
            OutputFormat::Table => print_table(vec![ReplyTableRow::from(reply)]),
            OutputFormat::Csv => {
                println!("command,response,label,unit");
                println!(
                    "{},{},{},{}",
                    csv_field(&reply.command),
                    csv_field(reply.response.as_deref().unwrap_or("")),
                    csv_field(&reply.label),
                    csv_field(reply.unit.as_deref().unwrap_or(""))
                );
            }
        }
        Ok(())
    }

    fn write_session(&self, session: &SessionState) -> Result<(), OutputError> {
        let stats = &session.statistics;
        match self.format {
            OutputFormat::Text => {
                println!("Session Summary:");
                println!("  Device: {}", session.device_name);
                println!("  Endpoint: {}", session.endpoint);
                println!("  Status: {}", session.status);
                println!("  Uptime: {:.1}s", session.get_uptime().as_secs_f64());
                println!("  Statistics:");
                println!("    Commands sent: {}", stats.commands_sent);
                println!("    Replies: {}", stats.replies);
                println!("    No response: {}", stats.silent);
                println!("    Bytes sent: {}", stats.bytes_sent);
                println!("    Bytes received: {}", stats.bytes_received);

                if stats.avg_response_time_ms > 0.0 {
                    println!("    Average response time: {:.2}ms", stats.avg_response_time_ms);
                }
            }
            OutputFormat::Json => print_json(session)?,
            OutputFormat::Table => print_table(vec![SessionTableRow::from(session)]),
            OutputFormat::Csv => {
                println!("device,endpoint,status,commands_sent,replies,silent,bytes_sent,bytes_received");
                println!(
                    "{},{},{},{},{},{},{},{}",
                    csv_field(&session.device_name),
                    csv_field(&session.endpoint),
                    csv_field(&session.status.to_string()),
                    stats.commands_sent,
                    stats.replies,
                    stats.silent,
                    stats.bytes_sent,
                    stats.bytes_received
                );
            }
        }
        Ok(())
    }

    fn write_ports(&self, ports: &[PortInfo]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    println!("No serial ports found");
                }
                for port in ports {
                    let marker = if port.is_pico { " [pico]" } else { "" };
                    match &port.description {
                        Some(description) => {
                            println!("{} ({}, {}){}", port.name, port.kind, description, marker)
                        }
                        None => println!("{} ({}){}", port.name, port.kind, marker),
                    }
                }
            }
            OutputFormat::Json => print_json(ports)?,
            OutputFormat::Table => print_table(ports.iter().map(PortTableRow::from).collect()),
            OutputFormat::Csv => {
                println!("name,kind,description,is_pico");
                for port in ports {
                    println!(
                        "{},{},{},{}",
                        csv_field(&port.name),
                        csv_field(&port.kind),
                        csv_field(port.description.as_deref().unwrap_or("")),
                        port.is_pico
                    );
                }
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &PicoCtlConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("picoctl Configuration:");
                println!("  Log level: {}", config.global.log_level);
                println!("  Default device: {}", config.global.default_device);

                if !config.devices.is_empty() {
                    println!("  Devices:");
                    for device in &config.devices {
                        let desc = if device.description.is_empty() { "No description" } else { &device.description };
                        println!("    {}: {}", device.name, desc);
                    }
                }
            }
            OutputFormat::Json => print_json(config)?,
            OutputFormat::Table | OutputFormat::Csv => self.write_devices(&config.devices)?,
        }
        Ok(())
    }

    fn write_devices(&self, devices: &[DeviceConfig]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for device in devices {
                    println!("Device: {}", device.name);
                    let desc = if device.description.is_empty() { "No description" } else { &device.description };
                    println!("  Description: {}", desc);
                    println!("  Port: {} @ {}", device.port, device.baud_rate);
                    println!("  Commands: {}", device.commands.banner());
                    println!();
                }
            }
            OutputFormat::Json => print_json(devices)?,
            OutputFormat::Table => print_table(devices.iter().map(DeviceTableRow::from).collect()),
            OutputFormat::Csv => {
                println!("name,description,port,baud_rate,commands");
                for device in devices {
                    println!(
                        "{},{},{},{},{}",
                        csv_field(&device.name),
                        csv_field(&device.description),
                        csv_field(&device.port),
                        device.baud_rate,
                        csv_field(&device.commands.banner())
                    );
                }
            }
        }
        Ok(())
    }

    fn write_frame(&self, packet: &Packet) -> Result<(), OutputError> {
        let bytes = packet.encode();
        let hex = hex::encode(&bytes);

        match self.format {
            OutputFormat::Text => println!("{}", hex),
            OutputFormat::Json => print_json(&EncodedFrame {
                msg_type: packet.header.msg_type,
                msg_name: packet.header.message_type().map(|kind| kind.name()),
                seq: packet.header.seq,
                length: bytes.len(),
                hex: &hex,
            })?,
            OutputFormat::Table => print_table(vec![FrameTableRow {
                r#type: type_label(packet.header.msg_type, packet.header.message_type().map(|kind| kind.name())),
                seq: packet.header.seq,
                length: bytes.len(),
                hex: hex.clone(),
            }]),
            OutputFormat::Csv => {
                println!("msg_type,seq,length,hex");
                println!("{},{},{},{}", packet.header.msg_type, packet.header.seq, bytes.len(), hex);
            }
        }
        Ok(())
    }

    fn write_harness(&self, stats: &HarnessStats, frames: &[FrameReport]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("Frames extracted: {}", stats.frames_extracted);
                println!("Valid packets: {}", stats.packets_valid);
                println!("Invalid packets: {}", stats.packets_invalid);
                println!("Sync losses: {}", stats.sync_losses);
                for frame in frames {
                    let verdict = match &frame.error {
                        Some(error) => error.as_str(),
                        None => "ok",
                    };
                    println!(
                        "  #{} {} seq={} {}->{} payload={}B: {}",
                        frame.index,
                        type_label(frame.msg_type, frame.msg_name),
                        frame.seq,
                        frame.src,
                        frame.dst,
                        frame.payload_len,
                        verdict
                    );
                }
            }
            OutputFormat::Json => print_json(&HarnessOutput { stats, frames })?,
            OutputFormat::Table => {
                print_table(vec![HarnessTableRow::from(stats)]);
                print_table(frames.iter().map(FrameReportRow::from).collect());
            }
            OutputFormat::Csv => {
                println!("index,msg_type,seq,src,dst,payload_len,valid,error");
                for frame in frames {
                    println!(
                        "{},{},{},{},{},{},{},{}",
                        frame.index,
                        frame.msg_type,
                        frame.seq,
                        frame.src,
                        frame.dst,
                        frame.payload_len,
                        frame.valid,
                        csv_field(frame.error.as_deref().unwrap_or(""))
                    );
                }
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

/// `s2b-ack (0x83)`, or just the id for unknown types
fn type_label(id: u8, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{} (0x{:02x})", name, id),
        None => format!("0x{:02x}", id),
    }
}

/// Table row for a command reply
#[derive(Tabled)]
struct ReplyTableRow {
    command: String,
    label: String,
    response: String,
}

impl From<&ReplyRecord> for ReplyTableRow {
    fn from(reply: &ReplyRecord) -> Self {
        let response = match (&reply.response, &reply.unit) {
            (Some(text), Some(unit)) => format!("{} {}", text, unit),
            (Some(text), None) => text.clone(),
            (None, _) => NO_RESPONSE.to_string(),
        };
        Self {
            command: reply.command.clone(),
            label: reply.label.clone(),
            response,
        }
    }
}

/// Table row for session summary
#[derive(Tabled)]
struct SessionTableRow {
    device: String,
    endpoint: String,
    status: String,
    commands: u64,
    replies: u64,
    silent: u64,
    sent: u64,
    received: u64,
}

impl From<&SessionState> for SessionTableRow {
    fn from(session: &SessionState) -> Self {
        Self {
            device: session.device_name.clone(),
            endpoint: session.endpoint.clone(),
            status: session.status.to_string(),
            commands: session.statistics.commands_sent,
            replies: session.statistics.replies,
            silent: session.statistics.silent,
            sent: session.statistics.bytes_sent,
            received: session.statistics.bytes_received,
        }
    }
}

/// Table row for a serial port
#[derive(Tabled)]
struct PortTableRow {
    name: String,
    kind: String,
    description: String,
    pico: bool,
}

impl From<&PortInfo> for PortTableRow {
    fn from(port: &PortInfo) -> Self {
        Self {
            name: port.name.clone(),
            kind: port.kind.clone(),
            description: port.description.clone().unwrap_or_default(),
            pico: port.is_pico,
        }
    }
}

/// Table row for device configuration
#[derive(Tabled)]
struct DeviceTableRow {
    name: String,
    description: String,
    port: String,
    baud: u32,
    quit: String,
}

impl From<&DeviceConfig> for DeviceTableRow {
    fn from(device: &DeviceConfig) -> Self {
        Self {
            name: device.name.clone(),
            description: device.description.clone(),
            port: device.port.clone(),
            baud: device.baud_rate,
            quit: device.commands.quit.clone(),
        }
    }
}

#[derive(Tabled)]
struct FrameTableRow {
    r#type: String,
    seq: u16,
    length: usize,
    hex: String,
}

#[derive(Tabled)]
struct HarnessTableRow {
    frames: u32,
    valid: u32,
    invalid: u32,
    sync_losses: u32,
}

impl From<&HarnessStats> for HarnessTableRow {
    fn from(stats: &HarnessStats) -> Self {
        Self {
            frames: stats.frames_extracted,
            valid: stats.packets_valid,
            invalid: stats.packets_invalid,
            sync_losses: stats.sync_losses,
        }
    }
}

#[derive(Tabled)]
struct FrameReportRow {
    index: usize,
    r#type: String,
    seq: u16,
    route: String,
    payload: u16,
    status: String,
}

impl From<&FrameReport> for FrameReportRow {
    fn from(frame: &FrameReport) -> Self {
        Self {
            index: frame.index,
            r#type: type_label(frame.msg_type, frame.msg_name),
            seq: frame.seq,
            route: format!("{}->{}", frame.src, frame.dst),
            payload: frame.payload_len,
            status: frame.error.clone().unwrap_or_else(|| "ok".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_field_quotes_when_needed() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_type_label() {
        assert_eq!(type_label(0x83, Some("s2b-ack")), "s2b-ack (0x83)");
        assert_eq!(type_label(0x42, None), "0x42");
    }

    #[test]
    fn test_reply_row_shows_unit_or_sentinel() {
        let temp = ReplyRecord {
            command: "t".to_string(),
            response: Some("42.5".to_string()),
            label: "Pico Temp".to_string(),
            unit: Some("°C".to_string()),
        };
        assert_eq!(ReplyTableRow::from(&temp).response, "42.5 °C");

        let silent = ReplyRecord {
            response: None,
            ..temp
        };
        assert_eq!(ReplyTableRow::from(&silent).response, NO_RESPONSE);
    }

    #[test]
    fn test_output_error_converts() {
        let error: crate::domain::error::PicoCtlError =
            OutputError::IoError(io::Error::new(io::ErrorKind::BrokenPipe, "closed")).into();
        assert!(error.to_string().contains("closed"));
    }
}
