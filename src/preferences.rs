//! User preferences
//!
//! A single versioned JSON document holding the script, scroll speed, text
//! size, rotation and the panel geometry. Every field has an explicit default
//! and out-of-range values are replaced on load.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::DefaultsConfig;
use crate::geometry::Rect;

/// Current preferences document version
pub const PREFERENCES_VERSION: u32 = 1;

/// Persisted panel geometry, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl From<Rect> for BoxGeometry {
    fn from(r: Rect) -> Self {
        Self {
            left: r.left,
            top: r.top,
            width: r.width,
            height: r.height,
        }
    }
}

impl From<BoxGeometry> for Rect {
    fn from(g: BoxGeometry) -> Self {
        Rect::new(g.left, g.top, g.width, g.height)
    }
}

impl BoxGeometry {
    fn is_finite(&self) -> bool {
        [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// User preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Document version
    pub version: u32,
    pub script_text: String,
    #[serde(rename = "scrollSpeedWPM")]
    pub scroll_speed_wpm: u32,
    pub text_size_px: u32,
    pub is_text_rotated: bool,
    /// Panel position and size (None = use the page layout)
    pub box_geometry: Option<BoxGeometry>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self::from_defaults(&DefaultsConfig::default())
    }
}

impl Preferences {
    /// Preferences populated from configured defaults
    pub fn from_defaults(defaults: &DefaultsConfig) -> Self {
        Self {
            version: PREFERENCES_VERSION,
            script_text: defaults.script_text.clone(),
            scroll_speed_wpm: defaults.scroll_speed_wpm,
            text_size_px: defaults.text_size_px,
            is_text_rotated: false,
            box_geometry: None,
        }
    }

    /// Replace out-of-range fields with defaults
    ///
    /// Returns the names of the fields that were reset.
    pub fn validate(&mut self, defaults: &DefaultsConfig) -> Vec<&'static str> {
        let mut reset = Vec::new();

        if self.version > PREFERENCES_VERSION {
            warn!(
                "Preferences version {} is newer than supported {}, reading known fields",
                self.version, PREFERENCES_VERSION
            );
        }
        self.version = PREFERENCES_VERSION;

        if !(defaults.min_speed_wpm..=defaults.max_speed_wpm).contains(&self.scroll_speed_wpm) {
            self.scroll_speed_wpm = defaults.scroll_speed_wpm;
            reset.push("scrollSpeedWPM");
        }
        if !(defaults.min_text_size_px..=defaults.max_text_size_px).contains(&self.text_size_px) {
            self.text_size_px = defaults.text_size_px;
            reset.push("textSizePx");
        }
        if let Some(geometry) = self.box_geometry {
            if !geometry.is_finite() || geometry.width <= 0.0 || geometry.height <= 0.0 {
                self.box_geometry = None;
                reset.push("boxGeometry");
            }
        }

        for field in &reset {
            warn!("Preference {} was out of range, using default", field);
        }
        reset
    }

    /// Parse a stored JSON document
    pub fn from_json(json: &str) -> Result<Self, PreferencesError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a stored JSON document, taking missing fields from `defaults`
    pub fn from_json_with_defaults(
        json: &str,
        defaults: &DefaultsConfig,
    ) -> Result<Self, PreferencesError> {
        let stored: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut merged = match serde_json::to_value(Self::from_defaults(defaults))? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        merged.extend(stored);
        Ok(serde_json::from_value(serde_json::Value::Object(merged))?)
    }

    pub fn to_json(&self) -> Result<String, PreferencesError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Preferences errors
#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}
