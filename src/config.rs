use crate::error::{Result, WaypointError};
use crate::logger::LogSeverity;
use crate::protocol::float::FloatMode;
use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::Path;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "WAYPOINT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "waypoint.json";

/// Smallest decode window that still fits every fixed-size packet.
const MIN_WINDOW_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the proxy accepts game clients on.
    pub listen_address: String,
    /// Upstream game server.
    pub server_address: String,
    /// Feed chunk and block updates to the world model.
    pub track_terrain: bool,
    /// Chat lines starting with this are diverted to the command interpreter.
    pub command_prefix: String,
    /// Decode window size per direction, in bytes. Bounds the largest frame.
    pub window_capacity: usize,
    pub float_mode: FloatMode,
    pub log_level: LogSeverity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:25565".to_owned(),
            server_address: "127.0.0.1:25566".to_owned(),
            track_terrain: true,
            command_prefix: "//".to_owned(),
            window_capacity: 256 * 1024,
            float_mode: FloatMode::Native,
            log_level: LogSeverity::Info,
        }
    }
}

impl Config {
    /// Loads the file named by `WAYPOINT_CONFIG`, or `waypoint.json`.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        Self::from_path(path)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).map_err(|err| match err {
                WaypointError::ConfigError(msg) => {
                    WaypointError::ConfigError(format!("{}: {}", path.display(), msg))
                }
                other => other,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|err| WaypointError::ConfigError(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.window_capacity < MIN_WINDOW_CAPACITY {
            return Err(WaypointError::ConfigError(format!(
                "window_capacity must be at least {} bytes",
                MIN_WINDOW_CAPACITY
            )));
        }
        if self.command_prefix.is_empty() {
            return Err(WaypointError::ConfigError(
                "command_prefix must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}
