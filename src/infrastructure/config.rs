use crate::domain::config::{DeviceConfig, GlobalConfig, PicoCtlConfig};
use crate::domain::error::{PicoCtlError, PicoCtlResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR: &str = ".picoctl";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
///
/// Layers, lowest to highest: built-in profiles, the global file
/// (`~/.config/picoctl/config.toml`), then the nearest project file
/// (`.picoctl/config.toml` in the working directory or any parent).
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> PicoCtlResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Manager with explicit paths, bypassing home and directory discovery
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration from files
    pub fn load_config(&self) -> PicoCtlResult<PicoCtlConfig> {
        let mut config = PicoCtlConfig::default();

        if self.global_config_path.exists() {
            let (global_config, has_global) = self.load_layer(&self.global_config_path)?;
            if has_global {
                config.global = global_config.global;
            }
            config.devices.extend(global_config.devices);
        }

        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                let project_config = self.load_config_from_path(project_path)?;
                config.devices.extend(project_config.devices);
            }
        }

        debug!("Loaded {} device profile(s)", config.devices.len());
        Ok(config)
    }

    /// Load the normal layers, then an explicitly named file on top.
    ///
    /// The overlay replaces global settings only if it has a `[global]` table.
    pub fn load_config_with_override(&self, path: &Path) -> PicoCtlResult<PicoCtlConfig> {
        let mut config = self.load_config()?;
        let (overlay, has_global) = self.load_layer(path)?;

        if has_global {
            config.global = overlay.global;
        }
        config.devices.extend(overlay.devices);
        Ok(config)
    }

    /// Parse one file, noting whether it carries its own `[global]` table
    fn load_layer(&self, path: &Path) -> PicoCtlResult<(PicoCtlConfig, bool)> {
        let parse_error = |e: toml::de::Error| PicoCtlError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        };

        let value: toml::Value = toml::from_str(&read_config_file(path)?).map_err(parse_error)?;
        let has_global = value.get("global").is_some();
        let config: PicoCtlConfig = value.try_into().map_err(parse_error)?;

        Ok((config, has_global))
    }

    /// Save configuration to files
    pub fn save_config(&self, config: &PicoCtlConfig) -> PicoCtlResult<()> {
        let global_config = PicoCtlConfig {
            global: config.global.clone(),
            devices: Vec::new(),
        };
        self.save_config_to_path(&self.global_config_path, &global_config)?;

        if let Some(project_path) = &self.project_config_path {
            let project_config = PicoCtlConfig {
                global: GlobalConfig::default(),
                devices: config.devices.clone(),
            };
            self.save_config_to_path(project_path, &project_config)?;
        }

        Ok(())
    }

    /// Get global configuration path
    fn get_global_config_path() -> PicoCtlResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| PicoCtlError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("picoctl").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> PicoCtlResult<PicoCtlConfig> {
        let content = read_config_file(path)?;

        toml::from_str(&content).map_err(|e| PicoCtlError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path, creating parent directories
    pub fn save_config_to_path(&self, path: &Path, config: &PicoCtlConfig) -> PicoCtlResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PicoCtlError::Config {
                message: format!("Failed to create config directory {}: {}", parent.display(), e),
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| PicoCtlError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| PicoCtlError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Write a starter project configuration under `path/.picoctl/`
    pub fn init_project_config(&self, path: &Path) -> PicoCtlResult<PathBuf> {
        let config_file = path.join(CONFIG_DIR).join(CONFIG_FILE);

        if config_file.exists() {
            return Err(PicoCtlError::Config {
                message: format!("Project configuration already exists at {}", config_file.display()),
            });
        }

        let mut bench = DeviceConfig::telemetry();
        bench.name = "bench".to_string();
        bench.description = "Pico on a USB-serial adapter".to_string();
        bench.port = "/dev/ttyUSB0".to_string();
        bench.timing.reply_window_ms = 250;

        let starter = PicoCtlConfig {
            global: GlobalConfig::default(),
            devices: vec![bench],
        };

        self.save_config_to_path(&config_file, &starter)?;
        Ok(config_file)
    }

    /// Write the built-in defaults to the global configuration file
    pub fn init_global_config(&self) -> PicoCtlResult<PathBuf> {
        if self.global_config_path.exists() {
            return Err(PicoCtlError::Config {
                message: format!(
                    "Global configuration already exists at {}",
                    self.global_config_path.display()
                ),
            });
        }

        self.save_config_to_path(&self.global_config_path, &PicoCtlConfig::default())?;
        Ok(self.global_config_path.clone())
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}

fn read_config_file(path: &Path) -> PicoCtlResult<String> {
    fs::read_to_string(path).map_err(|e| PicoCtlError::Config {
        message: format!("Failed to read config file {}: {}", path.display(), e),
    })
}
