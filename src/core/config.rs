//! Configuration for the tile service
//!
//! Settings can be built from presets, tweaked field by field, or loaded from
//! JSON. Missing JSON fields fall back to the defaults.

use crate::core::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_INITIAL_ZOOM, DEFAULT_TILE_EXTENSIONS, DEFAULT_ZOOM_STEP,
    MAX_ZOOM,
};
use crate::{Result, TileError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which way tile rows are numbered on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YAxisConvention {
    /// Row 0 is the northernmost row
    #[default]
    Xyz,
    /// Row 0 is the southernmost row
    Tms,
}

impl YAxisConvention {
    pub fn from_tms(tms: bool) -> Self {
        if tms {
            Self::Tms
        } else {
            Self::Xyz
        }
    }

    pub fn is_tms(&self) -> bool {
        matches!(self, Self::Tms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileServiceConfig {
    /// Cache entries kept, loaded and negative alike
    pub cache_capacity: usize,
    pub y_axis: YAxisConvention,
    /// File extensions probed in order
    pub extensions: Vec<String>,
    /// Extra tiles requested around the viewport on every edge
    pub tile_padding: u32,
    pub initial_zoom: f64,
    /// Zoom delta per wheel notch
    pub zoom_step: f64,
    pub max_zoom: u8,
    pub source_path: Option<PathBuf>,
    pub worker_thread_name: String,
}

impl Default for TileServiceConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            y_axis: YAxisConvention::Xyz,
            extensions: DEFAULT_TILE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            tile_padding: 1,
            initial_zoom: DEFAULT_INITIAL_ZOOM,
            zoom_step: DEFAULT_ZOOM_STEP,
            max_zoom: MAX_ZOOM,
            source_path: None,
            worker_thread_name: "map-tile-worker".to_string(),
        }
    }
}

/// Presets
impl TileServiceConfig {
    pub fn low_memory() -> Self {
        Self {
            cache_capacity: 256,
            ..Default::default()
        }
    }

    pub fn high_capacity() -> Self {
        Self {
            cache_capacity: 4096,
            ..Default::default()
        }
    }

    pub fn for_testing() -> Self {
        Self {
            cache_capacity: 64,
            worker_thread_name: "map-tile-worker-test".to_string(),
            ..Default::default()
        }
    }
}

impl TileServiceConfig {
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_y_axis(mut self, y_axis: YAxisConvention) -> Self {
        self.y_axis = y_axis;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(TileError::Config("cache_capacity must be at least 1".into()));
        }
        if self.extensions.is_empty() {
            return Err(TileError::Config("at least one tile extension is required".into()));
        }
        if self.max_zoom > MAX_ZOOM {
            return Err(TileError::Config(format!(
                "max_zoom {} exceeds the supported maximum {}",
                self.max_zoom, MAX_ZOOM
            )));
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 0.0) {
            return Err(TileError::Config("zoom_step must be a positive number".into()));
        }
        if !self.initial_zoom.is_finite() {
            return Err(TileError::Config("initial_zoom must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TileServiceConfig::default();
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.y_axis, YAxisConvention::Xyz);
        assert_eq!(config.extensions, vec!["jpg", "png"]);
        assert_eq!(config.tile_padding, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "cache_capacity": 12, "y_axis": "tms" }"#;
        let config = TileServiceConfig::from_json_str(json).unwrap();
        assert_eq!(config.cache_capacity, 12);
        assert!(config.y_axis.is_tms());
        assert_eq!(config.zoom_step, DEFAULT_ZOOM_STEP);
    }

    #[test]
    fn test_json_round_trip() {
        let config = TileServiceConfig::low_memory().with_source_path("/data/tiles");
        let json = config.to_json().unwrap();
        assert_eq!(TileServiceConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        assert!(matches!(
            TileServiceConfig::from_json_str(r#"{ "extensions": [] }"#),
            Err(TileError::Config(_))
        ));
        assert!(matches!(
            TileServiceConfig::from_json_str(r#"{ "cache_capacity": 0 }"#),
            Err(TileError::Config(_))
        ));
        assert!(matches!(
            TileServiceConfig::from_json_str(r#"{ "max_zoom": 30 }"#),
            Err(TileError::Config(_))
        ));
        assert!(matches!(
            TileServiceConfig::from_json_str("not json"),
            Err(TileError::Serialization(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiles.json");
        std::fs::write(&path, r#"{ "source_path": "/srv/tiles" }"#).unwrap();
        let config = TileServiceConfig::from_json_file(&path).unwrap();
        assert_eq!(config.source_path, Some(PathBuf::from("/srv/tiles")));
    }

    #[test]
    fn test_y_axis_from_flag() {
        assert_eq!(YAxisConvention::from_tms(true), YAxisConvention::Tms);
        assert_eq!(YAxisConvention::from_tms(false), YAxisConvention::Xyz);
    }
}
