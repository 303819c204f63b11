//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for duet
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection
    #[serde(default)]
    pub server: ServerConfig,
    /// Durable session storage
    #[serde(default)]
    pub storage: StorageConfig,
    /// View behaviour
    #[serde(default)]
    pub ui: UiConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the chat backend
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Durable storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the stored session records
    #[serde(default = "default_storage_dir")]
    pub dir: String,
}

fn default_storage_dir() -> String {
    "~/.duet/storage".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

/// View settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Widths at or below this (logical pixels) use the single-panel layout
    #[serde(default = "default_narrow_breakpoint")]
    pub narrow_breakpoint: u32,
    /// Splash delay before showing the login form
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    /// Logical pixels per terminal column
    #[serde(default = "default_cell_width_px")]
    pub cell_width_px: u32,
    /// Largest attachment accepted, in raw bytes
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,
}

fn default_narrow_breakpoint() -> u32 {
    768
}

fn default_startup_delay_ms() -> u64 {
    500
}

fn default_cell_width_px() -> u32 {
    8
}

fn default_max_attachment_bytes() -> u64 {
    crate::attachment::MAX_ATTACHMENT_BYTES
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            narrow_breakpoint: default_narrow_breakpoint(),
            startup_delay_ms: default_startup_delay_ms(),
            cell_width_px: default_cell_width_px(),
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.duet/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
