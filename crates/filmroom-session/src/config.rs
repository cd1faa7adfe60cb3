use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use filmroom_player::endpoint::default_endpoint;
use filmroom_player::LaunchOptions;

/// Configuration for filmroom.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (FILMROOM_* prefix)
/// 3. Config file (~/.config/filmroom/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite annotation store.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: FILMROOM_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/filmroom/data.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Player control endpoint (socket path, or named pipe on Windows).
    ///
    /// Can be set via:
    /// - CLI: --socket /tmp/mpv.sock
    /// - ENV: FILMROOM_SOCKET_PATH
    /// - Config: socket_path = "/tmp/mpv.sock"
    #[serde(default = "default_endpoint")]
    pub socket_path: String,

    #[serde(default = "default_player_bin")]
    pub player_bin: String,

    #[serde(default = "default_encoder_bin")]
    pub encoder_bin: String,

    /// How long a player command may take, in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// TUI time-position poll interval, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub logging: twyg::Opts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            socket_path: default_endpoint(),
            player_bin: default_player_bin(),
            encoder_bin: default_encoder_bin(),
            command_timeout_ms: default_command_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/filmroom/config.toml
    /// Reads environment variables with FILMROOM_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("filmroom");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration, then apply the `--db` and `--socket` CLI flags.
    pub fn load_with_overrides(db_path: Option<PathBuf>, socket: Option<String>) -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_overrides(db_path, socket);
        Ok(config)
    }

    pub fn apply_overrides(&mut self, db_path: Option<PathBuf>, socket: Option<String>) {
        if let Some(db_path) = db_path {
            self.database_path = db_path;
        }
        if let Some(socket) = socket.filter(|s| !s.is_empty()) {
            self.socket_path = socket;
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    /// Where the CLI keeps a pending clip start between invocations.
    pub fn marker_path(&self) -> PathBuf {
        self.database_path.with_file_name("marker.json")
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            player_bin: self.player_bin.clone(),
            endpoint: self.socket_path.clone(),
            command_timeout: self.command_timeout(),
            ..LaunchOptions::default()
        }
    }

    /// Look up a key for `config get`. Logging keys are dotted.
    pub fn value_of(&self, key: &str) -> Option<String> {
        let value = match key {
            "database_path" => self.database_path.display().to_string(),
            "socket_path" => self.socket_path.clone(),
            "player_bin" => self.player_bin.clone(),
            "encoder_bin" => self.encoder_bin.clone(),
            "command_timeout_ms" => self.command_timeout_ms.to_string(),
            "poll_interval_ms" => self.poll_interval_ms.to_string(),
            "logging.level" => format!("{:?}", self.logging.level()),
            "logging.coloured" => self.logging.coloured().to_string(),
            "logging.output" => format!("{:?}", self.logging.output()),
            _ => return None,
        };
        Some(value)
    }
}

/// Top-level keys accepted by `config set`.
pub const FILE_KEYS: &[&str] = &[
    "database_path",
    "socket_path",
    "player_bin",
    "encoder_bin",
    "command_timeout_ms",
    "poll_interval_ms",
];

/// Keys shown by `config show` and accepted by `config get`.
pub const KEYS: &[&str] = &[
    "database_path",
    "socket_path",
    "player_bin",
    "encoder_bin",
    "command_timeout_ms",
    "poll_interval_ms",
    "logging.level",
    "logging.coloured",
    "logging.output",
];

/// Keys whose values are integers in the config file.
pub const INTEGER_KEYS: &[&str] = &["command_timeout_ms", "poll_interval_ms"];

/// Get the default database path.
///
/// Returns: ~/.local/share/filmroom/data.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filmroom")
        .join("data.db")
}

fn default_player_bin() -> String {
    "mpv".to_string()
}

fn default_encoder_bin() -> String {
    "ffmpeg".to_string()
}

const fn default_command_timeout_ms() -> u64 {
    5000
}

const fn default_poll_interval_ms() -> u64 {
    250
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/filmroom/config.toml
/// - macOS: ~/Library/Application Support/filmroom/config.toml
/// - Windows: %APPDATA%\filmroom\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filmroom")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Filmroom Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (FILMROOM_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite annotation store
#
# Can also be set via:
# - CLI: filmroom --db /custom/path.db note list
# - Environment: FILMROOM_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/data.db"

# Player control endpoint
#
# The player is started with --input-ipc-server pointing here, and every
# command connects to it. On Windows this is a named pipe.
#
# Can also be set via:
# - CLI: filmroom --socket /tmp/mpv.sock clip start
# - Environment: FILMROOM_SOCKET_PATH=/tmp/mpv.sock
#socket_path = "/tmp/filmroom-mpv.sock"

# Media player and encoder binaries
player_bin = "mpv"
encoder_bin = "ffmpeg"

# How long to wait for the player to answer a command (milliseconds)
command_timeout_ms = 5000

# How often the TUI refreshes the playback position (milliseconds)
poll_interval_ms = 250
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database_path.ends_with("filmroom/data.db"));
        assert_eq!(config.player_bin, "mpv");
        assert_eq!(config.encoder_bin, "ffmpeg");
        assert_eq!(config.command_timeout(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.socket_path, default_endpoint());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(
            Some(PathBuf::from("/tmp/test.db")),
            Some("/tmp/test.sock".to_string()),
        );
        assert_eq!(config.database_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.socket_path, "/tmp/test.sock");
        assert_eq!(config.marker_path(), PathBuf::from("/tmp/marker.json"));

        config.apply_overrides(None, Some(String::new()));
        assert_eq!(config.socket_path, "/tmp/test.sock");
    }

    #[test]
    fn test_launch_options_follow_config() {
        let mut config = Config::default();
        config.player_bin = "/opt/mpv/bin/mpv".to_string();
        config.command_timeout_ms = 750;
        let opts = config.launch_options();
        assert_eq!(opts.player_bin, "/opt/mpv/bin/mpv");
        assert_eq!(opts.endpoint, config.socket_path);
        assert_eq!(opts.command_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_value_of_known_keys() {
        let config = Config::default();
        for key in KEYS {
            assert!(config.value_of(key).is_some(), "{key}");
        }
        assert!(config.value_of("nope").is_none());
        assert!(config.value_of("logging").is_none());
    }

    #[test]
    fn test_logging_keys_are_readable() {
        let config = Config::default();
        assert_eq!(
            config.value_of("logging.coloured"),
            Some(config.logging.coloured().to_string())
        );
        assert_eq!(
            config.value_of("logging.level"),
            Some(format!("{:?}", config.logging.level()))
        );
        for key in FILE_KEYS {
            assert!(KEYS.contains(key), "{key}");
        }
    }

    #[test]
    fn test_example_config_mentions_every_key() {
        let example = example_config();
        for key in FILE_KEYS {
            assert!(example.contains(key), "example config lacks {key}");
        }
    }
}
