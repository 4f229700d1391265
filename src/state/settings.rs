//! Map settings.
//!
//! Settings are read from localStorage on the web and from a JSON file next
//! to the executable's working directory on native builds. Every field has a
//! default, so a partial document only overrides what it names.

use geo_types::Coord;
use serde::{Deserialize, Serialize};

/// Geometry sources, projection constants and view tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// County topology location (URL on the web, file path natively)
    pub county_source: String,
    /// Name of the county object inside the topology
    pub county_object: String,
    /// Township topology location
    pub township_source: String,
    /// Name of the township object inside the topology
    pub township_object: String,

    /// Projection center as (lon, lat) in degrees
    pub center: [f64; 2],
    /// Projection scale in pixels per radian
    pub projection_scale: f64,
    /// Height of the header band above the map, in pixels
    pub header_height: f64,
    /// Re-apply the header offset when the viewport is resized
    pub keep_header_offset_on_resize: bool,

    pub transition_ms: u64,
    pub resize_throttle_ms: u64,
    /// Hover label size at zoom scale 1
    pub base_font_size: f64,
    pub max_zoom: f64,
    /// Share of the available viewport a drilled county fills
    pub fit_ratio: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            county_source: "assets/map-json/COUNTY_MOI.json".to_string(),
            county_object: "COUNTY_MOI".to_string(),
            township_source: "assets/map-json/TOWN_MOI.json".to_string(),
            township_object: "TOWN_MOI".to_string(),
            center: [121.0, 23.5],
            projection_scale: 8000.0,
            header_height: 80.0,
            keep_header_offset_on_resize: false,
            transition_ms: 750,
            resize_throttle_ms: 50,
            base_font_size: 12.0,
            max_zoom: 25.0,
            fit_ratio: 0.9,
        }
    }
}

impl MapSettings {
    /// localStorage key for persisting settings.
    const STORAGE_KEY: &'static str = "taiwan_map_settings";

    /// Settings file read by native builds.
    const SETTINGS_FILE: &'static str = "taiwan-map.json";

    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: self.center[0],
            y: self.center[1],
        }
    }

    /// Parses settings, falling back to defaults on error.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to parse map settings: {}", e);
                Self::default()
            }
        }
    }

    /// Load settings from localStorage.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let window = match web_sys::window() {
            Some(w) => w,
            None => return Self::default(),
        };

        let storage = match window.local_storage() {
            Ok(Some(s)) => s,
            _ => return Self::default(),
        };

        match storage.get_item(Self::STORAGE_KEY) {
            Ok(Some(json)) => {
                log::info!("Loaded map settings from localStorage");
                Self::from_json(&json)
            }
            _ => Self::default(),
        }
    }

    /// Load settings from the working directory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        match std::fs::read_to_string(Self::SETTINGS_FILE) {
            Ok(json) => {
                log::info!("Loaded map settings from {}", Self::SETTINGS_FILE);
                Self::from_json(&json)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::warn!("Failed to read {}: {}", Self::SETTINGS_FILE, e);
                Self::default()
            }
        }
    }

    /// Storage location, for display.
    pub fn location() -> &'static str {
        if cfg!(target_arch = "wasm32") {
            Self::STORAGE_KEY
        } else {
            Self::SETTINGS_FILE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = MapSettings::default();
        assert_eq!(settings.center(), Coord { x: 121.0, y: 23.5 });
        assert_eq!(settings.projection_scale, 8000.0);
        assert_eq!(settings.header_height, 80.0);
        assert_eq!(settings.transition_ms, 750);
        assert_eq!(settings.resize_throttle_ms, 50);
        assert!(!settings.keep_header_offset_on_resize);
    }

    #[test]
    fn test_partial_document() {
        let settings = MapSettings::from_json(r#"{"header_height": 64, "max_zoom": 10}"#);
        assert_eq!(settings.header_height, 64.0);
        assert_eq!(settings.max_zoom, 10.0);
        assert_eq!(settings.fit_ratio, 0.9);
        assert_eq!(settings.county_object, "COUNTY_MOI");
    }

    #[test]
    fn test_invalid_document_falls_back() {
        assert_eq!(MapSettings::from_json("[1, 2"), MapSettings::default());
    }
}
