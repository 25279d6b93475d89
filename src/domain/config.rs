use crate::domain::error::{PicoCtlError, PicoCtlResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// picoctl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PicoCtlConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Device profiles
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Device profile used when none is named on the command line
    #[serde(default = "default_device_name")]
    pub default_device: String,
}

/// A named serial device and the vocabulary it understands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Profile name
    pub name: String,
    /// Profile description
    #[serde(default)]
    pub description: String,
    /// Serial device path
    #[serde(default = "default_port")]
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Session timing
    #[serde(default)]
    pub timing: TimingConfig,
    /// Command vocabulary
    #[serde(default)]
    pub commands: CommandTable,
}

/// Delays and timeouts applied by a command session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Upper bound on a single read call
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// Pause after opening so the board finishes its reset
    #[serde(default = "default_boot_settle")]
    pub boot_settle_ms: u64,
    /// Extra time to keep polling for a reply (0 = check once)
    #[serde(default)]
    pub reply_window_ms: u64,
    /// Polling step inside the reply window
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// Command vocabulary for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTable {
    /// Token handled client-side to end the session
    #[serde(default = "default_quit_token")]
    pub quit: String,
    /// Label printed before replies to commands without their own label
    #[serde(default = "default_reply_label")]
    pub default_label: String,
    /// Known commands
    #[serde(default)]
    pub entries: Vec<CommandEntry>,
}

/// A single known command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// Exact text sent to the device
    pub token: String,
    /// Human description shown in the banner
    #[serde(default)]
    pub description: String,
    /// Reply label, e.g. "Pico Temp"
    #[serde(default)]
    pub label: Option<String>,
    /// Unit appended to the reply, e.g. "°C"
    #[serde(default)]
    pub unit: Option<String>,
    /// Processing time the device needs before it replies
    #[serde(default)]
    pub delay_ms: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_device_name() -> String {
    "pico".to_string()
}

fn default_port() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout() -> u64 {
    1000
}

fn default_boot_settle() -> u64 {
    2000
}

fn default_poll_interval() -> u64 {
    10
}

fn default_quit_token() -> String {
    "q".to_string()
}

fn default_reply_label() -> String {
    "Pico Says".to_string()
}

impl Default for PicoCtlConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            devices: vec![
                DeviceConfig::default(),
                DeviceConfig::control(),
                DeviceConfig::telemetry(),
            ],
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_device: default_device_name(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout(),
            boot_settle_ms: default_boot_settle(),
            reply_window_ms: 0,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self {
            quit: default_quit_token(),
            default_label: default_reply_label(),
            entries: vec![
                CommandEntry::new("1", "ON"),
                CommandEntry::new("0", "OFF"),
                CommandEntry::new("t", "Temp")
                    .with_label("Pico Temp")
                    .with_unit("°C")
                    .with_delay_ms(100),
            ],
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            description: "Pico on the first ACM port with the standard vocabulary".to_string(),
            port: default_port(),
            baud_rate: default_baud_rate(),
            timing: TimingConfig::default(),
            commands: CommandTable::default(),
        }
    }
}

impl DeviceConfig {
    /// Opt-in LED-only profile: `1` and `0` get a short settle, no `t`.
    pub fn control() -> Self {
        Self {
            name: "control".to_string(),
            description: "Pico LED control on the first ACM port".to_string(),
            port: "/dev/ttyACM0".to_string(),
            commands: CommandTable {
                entries: vec![
                    CommandEntry::new("1", "ON").with_delay_ms(100),
                    CommandEntry::new("0", "OFF").with_delay_ms(100),
                ],
                ..CommandTable::default()
            },
            ..Self::default()
        }
    }

    /// Built-in telemetry profile with the temperature command.
    pub fn telemetry() -> Self {
        Self {
            name: "telemetry".to_string(),
            description: "Pico monitor with temperature readout".to_string(),
            port: "/dev/ttyACM1".to_string(),
            ..Self::default()
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timing.read_timeout_ms)
    }
}

impl CommandEntry {
    pub fn new(token: &str, description: &str) -> Self {
        Self {
            token: token.to_string(),
            description: description.to_string(),
            label: None,
            unit: None,
            delay_ms: 0,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

impl CommandTable {
    /// Look up a command by its exact text
    pub fn entry(&self, text: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|entry| entry.token == text)
    }

    pub fn is_quit(&self, text: &str) -> bool {
        text == self.quit
    }

    /// Processing delay to wait before checking for a reply
    pub fn delay_for(&self, text: &str) -> Duration {
        self.entry(text)
            .map(|entry| Duration::from_millis(entry.delay_ms))
            .unwrap_or(Duration::ZERO)
    }

    /// One-line summary such as `'1' (ON), 't' (Temp), 'q' (Quit)`
    pub fn banner(&self) -> String {
        let mut parts: Vec<String> = self
            .entries
            .iter()
            .map(|entry| format!("'{}' ({})", entry.token, entry.description))
            .collect();
        parts.push(format!("'{}' (Quit)", self.quit));
        parts.join(", ")
    }

    pub fn validate(&self) -> PicoCtlResult<()> {
        if self.quit.is_empty() {
            return Err(PicoCtlError::Config {
                message: "Quit token must not be empty".to_string(),
            });
        }
        if self.entry(&self.quit).is_some() {
            return Err(PicoCtlError::Config {
                message: format!("Quit token '{}' is also listed as a device command", self.quit),
            });
        }
        Ok(())
    }
}

impl PicoCtlConfig {
    /// Pick a device profile by name, falling back to the configured default.
    ///
    /// Later profiles shadow earlier ones with the same name, so project
    /// configuration can override the built-ins.
    pub fn resolve_device(&self, name: Option<&str>) -> PicoCtlResult<DeviceConfig> {
        let wanted = name.unwrap_or(&self.global.default_device);

        if let Some(device) = self.devices.iter().rev().find(|device| device.name == wanted) {
            return Ok(device.clone());
        }

        if name.is_none() && self.devices.is_empty() {
            return Ok(DeviceConfig::default());
        }

        Err(PicoCtlError::Config {
            message: format!("Unknown device profile '{}'", wanted),
        })
    }

    pub fn validate(&self) -> PicoCtlResult<()> {
        for device in &self.devices {
            if device.baud_rate == 0 {
                return Err(PicoCtlError::Config {
                    message: format!("Device '{}' has a zero baud rate", device.name),
                });
            }
            if device.port.is_empty() {
                return Err(PicoCtlError::Config {
                    message: format!("Device '{}' has no port", device.name),
                });
            }
            device.commands.validate()?;
        }
        Ok(())
    }
}
