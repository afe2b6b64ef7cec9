//! Edit parameters: the mutable control state and its immutable snapshot.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Slider controls and their default values, in display order.
pub const SLIDER_DEFAULTS: &[(&str, f64)] = &[
    ("exposure", 0.0),
    ("contrast", 1.0),
    ("saturation", 1.0),
    ("gamma", 1.0),
    ("temperature", 0.0),
    ("tint", 0.0),
    ("rotate", 0.0),
    ("sharpness", 1.0),
    ("blur", 0.0),
    ("vignette", 0.0),
    ("wm_opacity", 100.0),
    ("wm_scale", 20.0),
    ("wm_off_x", 0.0),
    ("wm_off_y", 0.0),
];

/// Sliders restored by [`EditControls::reset_params`]. Gamma, tint and the
/// watermark sliders survive a reset.
const RESETTABLE_SLIDERS: &[&str] = &[
    "exposure",
    "contrast",
    "saturation",
    "temperature",
    "rotate",
    "sharpness",
    "blur",
    "vignette",
];

/// Checkbox controls, all off by default.
pub const FLAG_KEYS: &[&str] = &["bw"];

/// A single edit parameter value as sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Number(f64),
    Text(String),
}

impl ConfigValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Number(_) => None,
        }
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Immutable snapshot of every edit parameter at one instant.
///
/// Serializes as the flat JSON object the render and batch endpoints expect.
/// Two snapshots are interchangeable when their values are equal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditConfig(BTreeMap<String, ConfigValue>);

impl EditConfig {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ConfigValue::as_number)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_text)
    }

    /// Read a checkbox value encoded as `"true"` / `"false"`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.text(key)? {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl FromIterator<(String, ConfigValue)> for EditConfig {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Watermark anchor on a 3x3 grid of compass points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WatermarkPosition {
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    #[default]
    SouthEast,
}

impl WatermarkPosition {
    pub const ALL: [WatermarkPosition; 9] = [
        Self::NorthWest,
        Self::North,
        Self::NorthEast,
        Self::West,
        Self::Center,
        Self::East,
        Self::SouthWest,
        Self::South,
        Self::SouthEast,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NorthWest => "nw",
            Self::North => "n",
            Self::NorthEast => "ne",
            Self::West => "w",
            Self::Center => "c",
            Self::East => "e",
            Self::SouthWest => "sw",
            Self::South => "s",
            Self::SouthEast => "se",
        }
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatermarkPosition {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|position| position.as_str() == normalized)
            .ok_or_else(|| AppError::invalid_value("wm_position", value))
    }
}

/// Output aspect ratio for the crop stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Original,
    Ratio { width: u32, height: u32 },
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("original"),
            Self::Ratio { width, height } => write!(f, "{}:{}", width, height),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("original") {
            return Ok(Self::Original);
        }
        let invalid = || AppError::invalid_value("aspect_ratio", value);
        let (width, height) = trimmed.split_once(':').ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self::Ratio { width, height })
    }
}

/// Crop anchor as percentages of the free space on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropAnchor {
    x: f64,
    y: f64,
}

impl CropAnchor {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 100.0),
            y: y.clamp(0.0, 100.0),
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

impl Default for CropAnchor {
    fn default() -> Self {
        Self::new(50.0, 50.0)
    }
}

/// Live state of the edit controls.
///
/// This is the mutable side of the config model; every change is turned into
/// a fresh [`EditConfig`] via [`EditControls::build_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct EditControls {
    sliders: BTreeMap<String, f64>,
    flags: BTreeMap<String, bool>,
    position: WatermarkPosition,
    watermark: Option<String>,
    rotate_base: i32,
    aspect_ratio: AspectRatio,
    crop_anchor: CropAnchor,
}

impl Default for EditControls {
    fn default() -> Self {
        Self {
            sliders: SLIDER_DEFAULTS
                .iter()
                .map(|(key, value)| (key.to_string(), *value))
                .collect(),
            flags: FLAG_KEYS.iter().map(|key| (key.to_string(), false)).collect(),
            position: WatermarkPosition::default(),
            watermark: None,
            rotate_base: 0,
            aspect_ratio: AspectRatio::default(),
            crop_anchor: CropAnchor::default(),
        }
    }
}

impl EditControls {
    /// Read every control into an immutable snapshot.
    ///
    /// Pure and cheap; runs on every input event. Unset controls (no
    /// watermark chosen) simply omit their key.
    pub fn build_config(&self) -> EditConfig {
        let mut entries: Vec<(String, ConfigValue)> =
            Vec::with_capacity(self.sliders.len() + self.flags.len() + 6);
        entries.push(("wm_position".to_string(), self.position.as_str().into()));
        if let Some(watermark) = self.watermark.as_deref() {
            entries.push(("wm_filename".to_string(), watermark.into()));
        }
        entries.push((
            "rotate_base".to_string(),
            ConfigValue::Number(f64::from(self.rotate_base)),
        ));
        entries.push((
            "aspect_ratio".to_string(),
            self.aspect_ratio.to_string().into(),
        ));
        entries.push(("crop_pos_x".to_string(), self.crop_anchor.x().into()));
        entries.push(("crop_pos_y".to_string(), self.crop_anchor.y().into()));
        for (key, value) in &self.sliders {
            entries.push((key.clone(), ConfigValue::Number(*value)));
        }
        for (key, enabled) in &self.flags {
            let text = if *enabled { "true" } else { "false" };
            entries.push((key.clone(), text.into()));
        }
        entries.into_iter().collect()
    }

    pub fn slider(&self, key: &str) -> Option<f64> {
        self.sliders.get(key).copied()
    }

    /// Set a slider value.
    ///
    /// # Errors
    /// Returns [`AppError::InvalidValue`] for unknown slider names or non-finite values.
    pub fn set_slider(&mut self, key: &str, value: f64) -> Result<(), AppError> {
        if !value.is_finite() {
            return Err(AppError::invalid_value(key, value.to_string()));
        }
        match self.sliders.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(AppError::invalid_value(key, "unknown slider")),
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.flags.get(key).copied()
    }

    /// Toggle a checkbox control.
    ///
    /// # Errors
    /// Returns [`AppError::InvalidValue`] for unknown flag names.
    pub fn set_flag(&mut self, key: &str, enabled: bool) -> Result<(), AppError> {
        match self.flags.get_mut(key) {
            Some(slot) => {
                *slot = enabled;
                Ok(())
            }
            None => Err(AppError::invalid_value(key, "unknown flag")),
        }
    }

    pub fn position(&self) -> WatermarkPosition {
        self.position
    }

    pub fn set_position(&mut self, position: WatermarkPosition) {
        self.position = position;
    }

    pub fn watermark(&self) -> Option<&str> {
        self.watermark.as_deref()
    }

    /// Choose the watermark image by file name; blank names clear it.
    pub fn set_watermark(&mut self, filename: Option<&str>) {
        self.watermark = filename
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
    }

    pub fn rotate_base(&self) -> i32 {
        self.rotate_base
    }

    /// Accumulate a quarter-turn rotation, kept within `0..360`.
    ///
    /// # Errors
    /// Returns [`AppError::InvalidValue`] when `degrees` is not a multiple of 90.
    pub fn rotate90(&mut self, degrees: i32) -> Result<i32, AppError> {
        if degrees % 90 != 0 {
            return Err(AppError::invalid_value("rotate_base", degrees.to_string()));
        }
        self.rotate_base = (self.rotate_base + degrees.rem_euclid(360)).rem_euclid(360);
        Ok(self.rotate_base)
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.aspect_ratio = aspect_ratio;
    }

    pub fn crop_anchor(&self) -> CropAnchor {
        self.crop_anchor
    }

    pub fn set_crop_anchor(&mut self, anchor: CropAnchor) {
        self.crop_anchor = anchor;
    }

    /// Restore the adjustment sliders, crop anchor, base rotation and aspect
    /// ratio to their defaults. Watermark choices are kept.
    pub fn reset_params(&mut self) {
        for (key, default) in SLIDER_DEFAULTS {
            if RESETTABLE_SLIDERS.contains(key) {
                self.sliders.insert(key.to_string(), *default);
            }
        }
        self.crop_anchor = CropAnchor::default();
        self.rotate_base = 0;
        self.aspect_ratio = AspectRatio::Original;
    }
}
