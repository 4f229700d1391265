//! Administrative area features and their attributes.

use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{GeoJson, Geometry, JsonObject, Value};
use std::sync::Arc;

use crate::error::MapError;

/// Attribute record attached to every county and township feature.
///
/// Field names follow the Ministry of the Interior boundary datasets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationInfo {
    pub county_code: String,
    pub county_name: String,
    pub town_name: String,
}

impl LocationInfo {
    pub fn new(
        county_code: impl Into<String>,
        county_name: impl Into<String>,
        town_name: impl Into<String>,
    ) -> Self {
        Self {
            county_code: county_code.into(),
            county_name: county_name.into(),
            town_name: town_name.into(),
        }
    }

    /// Builds the record from a GeoJSON/TopoJSON properties object.
    ///
    /// Missing or non-string fields fall back to empty strings.
    pub fn from_properties(properties: Option<&JsonObject>) -> Self {
        let Some(props) = properties else {
            return Self::default();
        };
        let field = |name: &str| -> String {
            match props.get(name) {
                Some(serde_json::Value::String(s)) => s.trim().to_string(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => String::new(),
            }
        };
        Self::new(field("COUNTYCODE"), field("COUNTYNAME"), field("TOWNNAME"))
    }

    /// Identity used to match rendered shapes against features.
    pub fn key(&self) -> FeatureKey {
        FeatureKey {
            county_code: self.county_code.clone(),
            town_name: self.town_name.clone(),
        }
    }
}

/// Identity of a feature: county code plus township name.
///
/// County features have an empty township name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureKey {
    pub county_code: String,
    pub town_name: String,
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.town_name.is_empty() {
            write!(f, "{}", self.county_code)
        } else {
            write!(f, "{}/{}", self.county_code, self.town_name)
        }
    }
}

/// An immutable polygon/multipolygon feature with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFeature {
    pub info: LocationInfo,
    pub geometry: MultiPolygon<f64>,
}

impl MapFeature {
    pub fn new(info: LocationInfo, geometry: MultiPolygon<f64>) -> Self {
        Self { info, geometry }
    }

    pub fn key(&self) -> FeatureKey {
        self.info.key()
    }

    /// True when the feature has no drawable ring.
    pub fn is_degenerate(&self) -> bool {
        self.geometry
            .0
            .iter()
            .all(|polygon| polygon.exterior().0.is_empty())
    }
}

/// Ordered features for one geographic level, shared read-only by renderers.
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Arc<MapFeature>>,
}

impl FeatureCollection {
    pub fn new(features: Vec<MapFeature>) -> Self {
        Self {
            features: features.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Parses a GeoJSON document into a collection.
    ///
    /// A bare `Feature` or `Geometry` becomes a one-element collection.
    pub fn from_geojson_str(geojson_str: &str) -> Result<Self, MapError> {
        let geojson: GeoJson = geojson_str
            .parse()
            .map_err(|e| MapError::MalformedTopology(format!("invalid GeoJSON: {}", e)))?;

        let features = match geojson {
            GeoJson::FeatureCollection(fc) => fc
                .features
                .iter()
                .map(|f| {
                    convert_feature(
                        LocationInfo::from_properties(f.properties.as_ref()),
                        f.geometry.as_ref(),
                    )
                })
                .collect(),
            GeoJson::Feature(f) => vec![convert_feature(
                LocationInfo::from_properties(f.properties.as_ref()),
                f.geometry.as_ref(),
            )],
            GeoJson::Geometry(g) => vec![convert_feature(LocationInfo::default(), Some(&g))],
        };

        Ok(Self::new(features))
    }
}

fn convert_feature(info: LocationInfo, geometry: Option<&Geometry>) -> MapFeature {
    let geometry = geometry
        .map(|g| convert_geometry(&g.value))
        .unwrap_or_else(|| MultiPolygon::new(Vec::new()));
    let feature = MapFeature::new(info, geometry);
    if feature.is_degenerate() {
        log::debug!("Feature {} has no areal geometry", feature.key());
    }
    feature
}

/// Converts a GeoJSON geometry to a multipolygon.
///
/// Non-areal geometries yield an empty multipolygon.
fn convert_geometry(value: &Value) -> MultiPolygon<f64> {
    match value {
        Value::Polygon(rings) => MultiPolygon::new(convert_rings(rings).into_iter().collect()),
        Value::MultiPolygon(polygons) => MultiPolygon::new(
            polygons
                .iter()
                .filter_map(|rings| convert_rings(rings))
                .collect(),
        ),
        Value::GeometryCollection(geometries) => MultiPolygon::new(
            geometries
                .iter()
                .flat_map(|g| convert_geometry(&g.value).0)
                .collect(),
        ),
        _ => MultiPolygon::new(Vec::new()),
    }
}

fn convert_rings(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let (exterior, holes) = rings.split_first()?;
    Some(Polygon::new(
        to_line_string(exterior),
        holes.iter().map(|ring| to_line_string(ring)).collect(),
    ))
}

fn to_line_string(positions: &[Vec<f64>]) -> LineString<f64> {
    LineString::new(
        positions
            .iter()
            .filter_map(|p| match p.as_slice() {
                [x, y, ..] => Some(Coord { x: *x, y: *y }),
                _ => None,
            })
            .collect(),
    )
}
