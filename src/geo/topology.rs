//! TopoJSON decoding.
//!
//! Converts a `Topology` object into the feature collection of one of its
//! named objects, the same result a `topojson.feature` call produces.
//! Plain GeoJSON documents are accepted as well.

use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use geojson::JsonObject;
use serde::Deserialize;
use std::collections::HashMap;

use super::feature::{FeatureCollection, LocationInfo, MapFeature};
use crate::error::MapError;

/// Quantization transform applied to delta-encoded arcs.
#[derive(Debug, Clone, Copy, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    #[serde(default)]
    objects: HashMap<String, TopoGeometry>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Deserialize)]
struct TopoGeometry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    arcs: Option<serde_json::Value>,
    #[serde(default)]
    geometries: Vec<TopoGeometry>,
    #[serde(default)]
    properties: Option<JsonObject>,
}

/// Decodes either a TopoJSON topology (using `object_name`) or a GeoJSON document.
pub fn decode_collection(json: &str, object_name: &str) -> Result<FeatureCollection, MapError> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| MapError::MalformedTopology(format!("invalid JSON: {}", e)))?;

    if value.get("type").and_then(|t| t.as_str()) != Some("Topology") {
        return FeatureCollection::from_geojson_str(json);
    }

    let topology: Topology = serde_json::from_value(value)
        .map_err(|e| MapError::MalformedTopology(format!("invalid topology: {}", e)))?;
    topology.feature_collection(object_name)
}

impl Topology {
    fn feature_collection(&self, object_name: &str) -> Result<FeatureCollection, MapError> {
        let object = self.objects.get(object_name).ok_or_else(|| {
            MapError::MalformedTopology(format!("object '{}' not found in topology", object_name))
        })?;

        let arcs = self.decode_arcs();

        let features = if object.kind.as_deref() == Some("GeometryCollection") {
            object
                .geometries
                .iter()
                .map(|g| self.to_feature(g, &arcs))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![self.to_feature(object, &arcs)?]
        };

        Ok(FeatureCollection::new(features))
    }

    /// Absolute coordinates for every arc, de-quantized when a transform is present.
    fn decode_arcs(&self) -> Vec<Vec<Coord<f64>>> {
        self.arcs
            .iter()
            .map(|arc| {
                let mut x = 0.0;
                let mut y = 0.0;
                arc.iter()
                    .filter_map(|position| match position.as_slice() {
                        [px, py, ..] => Some((*px, *py)),
                        _ => None,
                    })
                    .map(|(px, py)| match self.transform {
                        Some(t) => {
                            x += px;
                            y += py;
                            Coord {
                                x: x * t.scale[0] + t.translate[0],
                                y: y * t.scale[1] + t.translate[1],
                            }
                        }
                        None => Coord { x: px, y: py },
                    })
                    .collect()
            })
            .collect()
    }

    fn to_feature(
        &self,
        geometry: &TopoGeometry,
        arcs: &[Vec<Coord<f64>>],
    ) -> Result<MapFeature, MapError> {
        let feature = MapFeature::new(
            LocationInfo::from_properties(geometry.properties.as_ref()),
            MultiPolygon::new(self.polygons(geometry, arcs)?),
        );
        if feature.is_degenerate() {
            log::debug!("Topology feature {} has no areal geometry", feature.key());
        }
        Ok(feature)
    }

    fn polygons(
        &self,
        geometry: &TopoGeometry,
        arcs: &[Vec<Coord<f64>>],
    ) -> Result<Vec<Polygon<f64>>, MapError> {
        match geometry.kind.as_deref().unwrap_or_default() {
            "Polygon" => {
                let rings: Vec<Vec<i64>> = parse_arc_refs(geometry)?;
                Ok(polygon_from_rings(&rings, arcs).into_iter().collect())
            }
            "MultiPolygon" => {
                let polygons: Vec<Vec<Vec<i64>>> = parse_arc_refs(geometry)?;
                Ok(polygons
                    .iter()
                    .filter_map(|rings| polygon_from_rings(rings, arcs))
                    .collect())
            }
            "GeometryCollection" => {
                let mut polygons = Vec::new();
                for child in &geometry.geometries {
                    polygons.extend(self.polygons(child, arcs)?);
                }
                Ok(polygons)
            }
            _ => Ok(Vec::new()),
        }
    }
}

fn parse_arc_refs<T: serde::de::DeserializeOwned + Default>(
    geometry: &TopoGeometry,
) -> Result<T, MapError> {
    match &geometry.arcs {
        Some(arcs) => serde_json::from_value(arcs.clone()).map_err(|e| {
            MapError::MalformedTopology(format!(
                "invalid {} arcs: {}",
                geometry.kind.as_deref().unwrap_or("null"),
                e
            ))
        }),
        None => Ok(T::default()),
    }
}

fn polygon_from_rings(rings: &[Vec<i64>], arcs: &[Vec<Coord<f64>>]) -> Option<Polygon<f64>> {
    let (exterior, holes) = rings.split_first()?;
    Some(Polygon::new(
        stitch_ring(exterior, arcs),
        holes.iter().map(|ring| stitch_ring(ring, arcs)).collect(),
    ))
}

/// Joins the referenced arcs into one ring.
///
/// A negative index `i` refers to arc `!i` traversed in reverse. Consecutive
/// arcs share an endpoint, which is emitted once.
fn stitch_ring(refs: &[i64], arcs: &[Vec<Coord<f64>>]) -> LineString<f64> {
    let mut points: Vec<Coord<f64>> = Vec::new();

    for &index in refs {
        let (arc_index, reversed) = if index < 0 {
            (!index as usize, true)
        } else {
            (index as usize, false)
        };
        let Some(arc) = arcs.get(arc_index) else {
            log::warn!("Topology references missing arc {}", arc_index);
            continue;
        };

        if !points.is_empty() {
            points.pop();
        }
        if reversed {
            points.extend(arc.iter().rev().copied());
        } else {
            points.extend(arc.iter().copied());
        }
    }

    LineString::new(points)
}
