//! Application configuration
//!
//! Tunables are embedded from `config.toml` at build time and parsed into
//! typed sections. Callers that need different values can parse their own
//! TOML with [`AppConfig::from_toml_str`].

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::camera::Facing;

const CONFIG_TOML: &str = include_str!("../config.toml");

static EMBEDDED: Lazy<AppConfig> = Lazy::new(|| match AppConfig::from_toml_str(CONFIG_TOML) {
    Ok(config) => config,
    Err(e) => {
        tracing::error!("Embedded config.toml is invalid, using built-in values: {:#}", e);
        AppConfig::default()
    }
});

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct AppConfig {
    pub autoscroll: AutoscrollConfig,
    pub panel: PanelConfig,
    pub capture: CaptureConfig,
    pub recorder: RecorderConfig,
    pub storage: StorageConfig,
    pub save: SaveConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AutoscrollConfig {
    pub speed_divisor: f64,
    pub bottom_tolerance_px: f64,
}

impl Default for AutoscrollConfig {
    fn default() -> Self {
        Self {
            speed_divisor: 10.0,
            bottom_tolerance_px: 1.0,
        }
    }
}

/// Size bounds for the floating script panel, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PanelConfig {
    pub min_width: f64,
    pub max_width: f64,
    pub min_height: f64,
    pub max_height: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            min_width: 200.0,
            max_width: 1600.0,
            min_height: 120.0,
            max_height: 1200.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub audio: bool,
    pub default_facing: Facing,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 30,
            audio: true,
            default_facing: Facing::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecorderConfig {
    /// Interval at which the device is asked to emit a data chunk
    pub timeslice_ms: u32,
    /// MIME types probed in preference order
    pub mime_candidates: Vec<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            timeslice_ms: 1000,
            mime_candidates: [
                "video/mp4;codecs=avc1,mp4a",
                "video/webm;codecs=vp9,opus",
                "video/webm;codecs=vp8,opus",
                "video/webm",
                "video/mp4",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageConfig {
    pub key: String,
    /// Whether panel position/size survives across sessions
    pub persist_geometry: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: "teleprompterSettings".to_string(),
            persist_geometry: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SaveConfig {
    pub filename_prefix: String,
    pub revoke_delay_ms: u32,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            filename_prefix: "teleprompter-recording".to_string(),
            revoke_delay_ms: 1000,
        }
    }
}

/// Default preference values and the accepted ranges for user input
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefaultsConfig {
    pub script_text: String,
    pub scroll_speed_wpm: u32,
    pub text_size_px: u32,
    pub min_speed_wpm: u32,
    pub max_speed_wpm: u32,
    pub min_text_size_px: u32,
    pub max_text_size_px: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            script_text: String::new(),
            scroll_speed_wpm: 10,
            text_size_px: 32,
            min_speed_wpm: 1,
            max_speed_wpm: 500,
            min_text_size_px: 12,
            max_text_size_px: 120,
        }
    }
}

impl AppConfig {
    /// The configuration embedded from `config.toml`
    pub fn embedded() -> &'static AppConfig {
        &EMBEDDED
    }

    /// Parse and validate a TOML configuration document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(source).context("Failed to parse configuration")?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Reject bounds that would make the interaction logic meaningless
    pub fn validate(&self) -> Result<()> {
        let panel = &self.panel;
        if panel.min_width <= 0.0 || panel.min_height <= 0.0 {
            bail!("panel minimum size must be positive");
        }
        if panel.min_width > panel.max_width || panel.min_height > panel.max_height {
            bail!("panel minimum size exceeds maximum size");
        }
        if self.autoscroll.speed_divisor <= 0.0 {
            bail!("autoscroll.speed_divisor must be positive");
        }
        if self.recorder.timeslice_ms == 0 {
            bail!("recorder.timeslice_ms must be positive");
        }
        if self.recorder.mime_candidates.is_empty() {
            bail!("recorder.mime_candidates must not be empty");
        }
        if self.storage.key.is_empty() {
            bail!("storage.key must not be empty");
        }
        let d = &self.defaults;
        if d.min_speed_wpm == 0 || d.min_speed_wpm > d.max_speed_wpm {
            bail!("speed range must be non-empty and positive");
        }
        if d.min_text_size_px == 0 || d.min_text_size_px > d.max_text_size_px {
            bail!("text size range must be non-empty and positive");
        }
        Ok(())
    }
}
