//! Configuration module for the remote-edit server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::protocol::MAX_CONTENT_LENGTH;

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "remote-edit")]
#[command(author = "remote-edit authors")]
#[command(version = "0.1.0")]
#[command(about = "Edit a shared file over a Unix socket", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Unix socket path to listen on
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Target file that WRITE and CLEAR operate on
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Largest content length a frame may declare, in bytes
    #[arg(long)]
    pub max_content_length: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub file: FileConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Unix socket path
    pub socket: Option<PathBuf>,
    /// Largest declared content length accepted
    #[serde(default = "default_max_content_length")]
    pub max_content_length: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket: None,
            max_content_length: default_max_content_length(),
        }
    }
}

/// Target file configuration
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    /// Path of the shared file
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_max_content_length() -> u32 {
    MAX_CONTENT_LENGTH
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub socket_path: PathBuf,
    pub file_path: PathBuf,
    pub max_content_length: u32,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::merge(cli, toml_config)
    }

    /// Merge CLI args with TOML config (CLI takes precedence).
    pub fn merge(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        Ok(Config {
            socket_path: cli
                .socket
                .or(toml_config.server.socket)
                .ok_or(ConfigError::Missing("socket"))?,
            file_path: cli
                .file
                .or(toml_config.file.path)
                .ok_or(ConfigError::Missing("file"))?,
            max_content_length: cli
                .max_content_length
                .unwrap_or(toml_config.server.max_content_length),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {err}", path = .0.display(), err = .1)]
    FileRead(PathBuf, std::io::Error),

    #[error("Failed to parse config file '{path}': {err}", path = .0.display(), err = .1)]
    TomlParse(PathBuf, toml::de::Error),

    #[error("No {0} path given (use --{0} or the config file)")]
    Missing(&'static str),
}
