//! Geographic data for the map.
//!
//! This module provides the county/township feature model, TopoJSON and
//! GeoJSON decoding, the Mercator projection, and painting of projected
//! shapes onto the egui canvas.

mod feature;
mod projection;
mod renderer;
mod topology;

pub use feature::{FeatureCollection, FeatureKey, MapFeature};
#[cfg(test)]
pub use feature::LocationInfo;
pub use projection::{path_data, screen_geometry, MercatorProjection, ScreenBounds};
pub use renderer::{render_scene, RenderStyle};
pub use topology::decode_collection;
