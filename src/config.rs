use crate::detection::{CentroidMode, RECORD_WIDTH};
use crate::geometry::{Rect, SurfaceGeometry};
use crate::target::{Action, InteractiveTarget};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "gazetype.toml";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub dwell: DwellConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub keyboard: KeyboardConfig,
}

// ============================================================================
// Detection Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DetectionConfig {
    /// Detections below this confidence are discarded (0.0-1.0)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Side of the square model input, in pixels
    #[serde(default = "default_model_size")]
    pub model_size: f32,

    /// Record width used when the output tensor has no usable shape
    #[serde(default = "default_stride")]
    pub default_stride: usize,

    /// How detection centers are combined: "mean" or "confidence"
    #[serde(default)]
    pub centroid: CentroidMode,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            model_size: default_model_size(),
            default_stride: default_stride(),
            centroid: CentroidMode::default(),
        }
    }
}

fn default_confidence_threshold() -> f32 {
    0.4
}

fn default_model_size() -> f32 {
    384.0
}

fn default_stride() -> usize {
    RECORD_WIDTH
}

// ============================================================================
// Dwell Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DwellConfig {
    #[serde(default = "default_dwell_time_ms")]
    pub dwell_time_ms: u64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            dwell_time_ms: default_dwell_time_ms(),
        }
    }
}

impl DwellConfig {
    pub fn dwell_time(&self) -> Duration {
        Duration::from_millis(self.dwell_time_ms)
    }
}

fn default_dwell_time_ms() -> u64 {
    2000
}

// ============================================================================
// Calibration Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CalibrationConfig {
    /// Require the calibration dwell before typing
    #[serde(default = "default_calibration_enabled")]
    pub enabled: bool,

    /// Label of the key used as the calibration anchor
    #[serde(default = "default_anchor")]
    pub anchor: String,

    /// Operator text; built from the anchor and dwell time when unset
    #[serde(default)]
    pub instruction: Option<String>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            enabled: default_calibration_enabled(),
            anchor: default_anchor(),
            instruction: None,
        }
    }
}

impl CalibrationConfig {
    pub fn instruction(&self, dwell_time: Duration) -> String {
        match self.instruction {
            Some(ref text) => text.clone(),
            None => format!(
                "Look at the '{}' key and confirm, then keep looking for {:.1} seconds to calibrate",
                self.anchor,
                dwell_time.as_secs_f32()
            ),
        }
    }
}

fn default_calibration_enabled() -> bool {
    true
}

fn default_anchor() -> String {
    "G".into()
}

// ============================================================================
// Surface Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SurfaceConfig {
    /// Capture resolution
    #[serde(default = "default_render_width")]
    pub render_width: f32,
    #[serde(default = "default_render_height")]
    pub render_height: f32,

    /// Placement of the preview in target space
    #[serde(default = "default_placement")]
    pub placement: Rect,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            render_width: default_render_width(),
            render_height: default_render_height(),
            placement: default_placement(),
        }
    }
}

impl SurfaceConfig {
    pub fn geometry(&self) -> SurfaceGeometry {
        SurfaceGeometry {
            render_width: self.render_width,
            render_height: self.render_height,
            placement: self.placement,
        }
    }
}

fn default_render_width() -> f32 {
    640.0
}

fn default_render_height() -> f32 {
    480.0
}

fn default_placement() -> Rect {
    Rect::new(0.0, 0.0, 640.0, 480.0)
}

// ============================================================================
// Keyboard Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct KeyboardConfig {
    /// Top-left corner of the key grid in target space
    #[serde(default = "default_keyboard_x")]
    pub x: f32,
    #[serde(default = "default_keyboard_y")]
    pub y: f32,
    #[serde(default = "default_key_size")]
    pub key_width: f32,
    #[serde(default = "default_key_size")]
    pub key_height: f32,
    #[serde(default = "default_gap")]
    pub gap: f32,

    /// One key per character, one string per row
    #[serde(default = "default_rows")]
    pub rows: Vec<String>,

    /// Add a space bar below the rows
    #[serde(default = "default_true")]
    pub space: bool,

    /// Add a delete key next to the space bar
    #[serde(default = "default_true")]
    pub delete: bool,

    /// Extra keys with explicit rectangles
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeyConfig {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub action: Action,
    pub rect: Rect,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            x: default_keyboard_x(),
            y: default_keyboard_y(),
            key_width: default_key_size(),
            key_height: default_key_size(),
            gap: default_gap(),
            rows: default_rows(),
            space: true,
            delete: true,
            keys: Vec::new(),
        }
    }
}

fn default_keyboard_x() -> f32 {
    0.0
}

fn default_keyboard_y() -> f32 {
    0.0
}

fn default_key_size() -> f32 {
    64.0
}

fn default_gap() -> f32 {
    0.0
}

fn default_rows() -> Vec<String> {
    vec![
        "QWERTYUIOP".to_string(),
        "ASDFGHJKL".to_string(),
        "ZXCVBNM".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

impl KeyboardConfig {
    /// Lay out the keys in hit-test order: rows top to bottom, then the
    /// space/delete row, then explicit keys.
    pub fn build_targets(&self) -> Vec<InteractiveTarget> {
        let pitch_x = self.key_width + self.gap;
        let pitch_y = self.key_height + self.gap;
        let mut targets = Vec::new();

        for (row_idx, row) in self.rows.iter().enumerate() {
            let y = self.y + row_idx as f32 * pitch_y;
            for (col_idx, ch) in row.chars().enumerate() {
                let x = self.x + col_idx as f32 * pitch_x;
                targets.push(InteractiveTarget::new(
                    format!("key-{}", ch),
                    ch.to_string(),
                    Action::AppendChar { ch },
                    Rect::new(x, y, self.key_width, self.key_height),
                ));
            }
        }

        let widest = self.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let bottom_y = self.y + self.rows.len() as f32 * pitch_y;
        let mut x = self.x;

        if self.space {
            // Space takes the row width minus the delete key
            let keys_wide = widest.saturating_sub(if self.delete { 2 } else { 0 }).max(2);
            let width = keys_wide as f32 * pitch_x - self.gap;
            targets.push(InteractiveTarget::new(
                "space",
                "Space",
                Action::AppendSpace,
                Rect::new(x, bottom_y, width, self.key_height),
            ));
            x += width + self.gap;
        }
        if self.delete {
            let width = 2.0 * pitch_x - self.gap;
            targets.push(InteractiveTarget::new(
                "delete",
                "Del",
                Action::DeleteLast,
                Rect::new(x, bottom_y, width, self.key_height),
            ));
        }

        targets.extend(self.keys.iter().map(|k| {
            InteractiveTarget::new(
                k.id.clone(),
                k.label.clone().unwrap_or_else(|| k.id.clone()),
                k.action,
                k.rect,
            )
        }));

        targets
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is missing
    /// or unparsable.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Config::default();
        }

        match fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| Self::from_toml_str(&s).map_err(|e| e.to_string()))
        {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("ignoring config {}: {}", path.display(), e);
                Config::default()
            }
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
