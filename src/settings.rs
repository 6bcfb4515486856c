// src/settings.rs
//
// Application settings: protocol tunables and the defaults a freshly
// placed marking starts with. Stored as settings.json in the app config
// dir; missing fields fall back so old settings files keep loading.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::io::mb3::session::SessionConfig;
use crate::marking::{MarkingItem, DEFAULT_FONT};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppSettings {
    #[serde(default = "default_device_port")]
    pub device_port: u16,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    // Grid geometry: cell index = y * grid_columns + x
    #[serde(default = "default_grid_columns")]
    pub grid_columns: u32,

    // Defaults for a freshly placed marking
    #[serde(default = "default_marking_text")]
    pub marking_text: String,
    #[serde(default = "default_marking_height")]
    pub marking_height: i32,
    #[serde(default = "default_marking_width")]
    pub marking_width: f32,
    #[serde(default = "default_marking_force")]
    pub marking_force: i32,
    #[serde(default = "default_marking_quality")]
    pub marking_quality: i32,
    #[serde(default = "default_marking_font")]
    pub marking_font: String,
}

fn default_device_port() -> u16 {
    23
}
fn default_probe_timeout_ms() -> u64 {
    500
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_read_timeout_ms() -> u64 {
    10_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    2000
}
fn default_grid_columns() -> u32 {
    60
}
fn default_marking_text() -> String {
    "Text".to_string()
}
fn default_marking_height() -> i32 {
    5
}
fn default_marking_width() -> f32 {
    60.0
}
fn default_marking_force() -> i32 {
    50
}
fn default_marking_quality() -> i32 {
    100
}
fn default_marking_font() -> String {
    DEFAULT_FONT.to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            device_port: default_device_port(),
            probe_timeout_ms: default_probe_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            grid_columns: default_grid_columns(),
            marking_text: default_marking_text(),
            marking_height: default_marking_height(),
            marking_width: default_marking_width(),
            marking_force: default_marking_force(),
            marking_quality: default_marking_quality(),
            marking_font: default_marking_font(),
        }
    }
}

impl AppSettings {
    /// Session tunables derived from these settings.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            port: self.device_port,
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// The marking a tap on an empty grid cell creates, positioned from
    /// the cell index. Goes through the sanitizing constructor.
    pub fn placed_item(&self, index: u32) -> MarkingItem {
        MarkingItem::new(
            self.marking_text.clone(),
            (index % self.grid_columns) as i32,
            (index / self.grid_columns) as i32,
            self.marking_height,
            0.0,
            0.0,
            self.marking_width,
            self.marking_force,
            self.marking_quality,
            self.marking_font.clone(),
        )
    }
}

fn settings_path() -> Result<PathBuf, String> {
    let dir = dirs::config_dir()
        .ok_or_else(|| "Failed to resolve the app config dir".to_string())?
        .join("markstudio");
    std::fs::create_dir_all(&dir).map_err(|e| format!("Failed to create config dir: {}", e))?;
    Ok(dir.join("settings.json"))
}

pub fn load_settings() -> Result<AppSettings, String> {
    let path = settings_path()?;

    if path.exists() {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse settings: {}", e))
    } else {
        // First run: write the defaults so the operator has a file to edit.
        let settings = AppSettings::default();
        save_settings(&settings)?;
        Ok(settings)
    }
}

pub fn save_settings(settings: &AppSettings) -> Result<(), String> {
    let path = settings_path()?;
    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialise settings: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write settings: {}", e))
}
