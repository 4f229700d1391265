//! Map projection and coordinate transformation.
//!
//! Handles converting between geographic coordinates (lon/lat) and
//! viewport pixel coordinates, and derives the path data, bounds and
//! centroid of a feature at the current projection.

use geo::{BoundingRect, Centroid};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use glam::DVec2;
use std::f64::consts::FRAC_PI_2;

/// Latitude limit of the Mercator projection, in degrees.
const MAX_LATITUDE: f64 = 85.0511;

/// Number of decimal places kept in path data.
const PATH_DIGITS: f64 = 1000.0;

/// Axis-aligned bounding box in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl ScreenBounds {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) / 2.0
    }
}

/// Spherical Mercator projection with a fixed center and scale.
///
/// `translate` is the pixel position the center maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct MercatorProjection {
    /// Geographic center (lon, lat) in degrees
    pub center: Coord<f64>,
    /// Pixels per radian
    pub scale: f64,
    /// Pixel position of the center
    pub translate: DVec2,
}

impl Default for MercatorProjection {
    fn default() -> Self {
        Self {
            // Geographic center of Taiwan
            center: Coord { x: 121.0, y: 23.5 },
            scale: 8000.0,
            translate: DVec2::new(480.0, 250.0),
        }
    }
}

impl MercatorProjection {
    pub fn new(center: Coord<f64>, scale: f64, translate: DVec2) -> Self {
        Self {
            center,
            scale,
            translate,
        }
    }

    /// Returns a copy of this projection with a different translate.
    pub fn with_translate(&self, translate: DVec2) -> Self {
        Self {
            translate,
            ..self.clone()
        }
    }

    fn raw(coord: Coord<f64>) -> DVec2 {
        let lambda = coord.x.to_radians();
        let phi = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        DVec2::new(lambda, ((FRAC_PI_2 + phi) / 2.0).tan().ln())
    }

    /// Converts geographic coordinates (lon, lat) to a pixel position.
    pub fn project(&self, coord: Coord<f64>) -> DVec2 {
        let p = Self::raw(coord);
        let c = Self::raw(self.center);
        DVec2::new(
            self.translate.x + self.scale * (p.x - c.x),
            self.translate.y - self.scale * (p.y - c.y),
        )
    }

    /// Projects every polygon of a geometry, exterior ring first.
    ///
    /// Closing duplicates are dropped and empty rings skipped; a polygon
    /// whose exterior is empty is skipped with its holes.
    pub fn project_polygons(&self, geometry: &MultiPolygon<f64>) -> Vec<Vec<Vec<DVec2>>> {
        geometry
            .0
            .iter()
            .filter_map(|polygon| {
                let exterior = self.project_ring(polygon.exterior())?;
                Some(
                    std::iter::once(exterior)
                        .chain(polygon.interiors().iter().filter_map(|r| self.project_ring(r)))
                        .collect(),
                )
            })
            .collect()
    }

    /// Projects every ring of a geometry (exteriors and holes) into one list.
    pub fn project_rings(&self, geometry: &MultiPolygon<f64>) -> Vec<Vec<DVec2>> {
        self.project_polygons(geometry).into_iter().flatten().collect()
    }

    fn project_ring(&self, ring: &LineString<f64>) -> Option<Vec<DVec2>> {
        let mut points: Vec<DVec2> = ring.0.iter().map(|c| self.project(*c)).collect();
        if points.len() >= 2 && points.first() == points.last() {
            points.pop();
        }
        (!points.is_empty()).then_some(points)
    }

    /// SVG path data for a geometry, or `None` when it has nothing to draw.
    pub fn path(&self, geometry: &MultiPolygon<f64>) -> Option<String> {
        path_data(&self.project_rings(geometry))
    }

    /// Pixel-space bounding box, or `None` for an empty geometry.
    pub fn bounds(&self, geometry: &MultiPolygon<f64>) -> Option<ScreenBounds> {
        polygons_bounds(&self.project_polygons(geometry))
    }

    /// Pixel-space centroid, or `None` for an empty geometry.
    pub fn centroid(&self, geometry: &MultiPolygon<f64>) -> Option<DVec2> {
        polygons_centroid(&self.project_polygons(geometry))
    }
}

/// Formats projected rings as SVG path commands (`M x,y L x,y ... Z`).
pub fn path_data(rings: &[Vec<DVec2>]) -> Option<String> {
    if rings.is_empty() {
        return None;
    }

    let mut d = String::new();
    for ring in rings {
        for (i, p) in ring.iter().enumerate() {
            d.push(if i == 0 { 'M' } else { 'L' });
            d.push_str(&format_number(p.x));
            d.push(',');
            d.push_str(&format_number(p.y));
        }
        d.push('Z');
    }
    Some(d)
}

fn format_number(value: f64) -> String {
    let rounded = (value * PATH_DIGITS).round() / PATH_DIGITS;
    if rounded == 0.0 {
        // Avoid "-0"
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

/// Projected polygons as a pixel-space geometry.
pub fn screen_geometry(polygons: &[Vec<Vec<DVec2>>]) -> MultiPolygon<f64> {
    let ring = |points: &Vec<DVec2>| {
        LineString::from(points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>())
    };
    MultiPolygon::new(
        polygons
            .iter()
            .filter_map(|rings| {
                let (exterior, holes) = rings.split_first()?;
                Some(Polygon::new(ring(exterior), holes.iter().map(ring).collect()))
            })
            .collect(),
    )
}

fn polygons_bounds(polygons: &[Vec<Vec<DVec2>>]) -> Option<ScreenBounds> {
    let rect = screen_geometry(polygons).bounding_rect()?;
    Some(ScreenBounds {
        min: DVec2::new(rect.min().x, rect.min().y),
        max: DVec2::new(rect.max().x, rect.max().y),
    })
}

/// Area-weighted centroid of projected polygons, net of holes.
///
/// Zero-area input falls back to the length-weighted centroid of the
/// edges, then to the vertex mean.
fn polygons_centroid(polygons: &[Vec<Vec<DVec2>>]) -> Option<DVec2> {
    let point = screen_geometry(polygons).centroid()?;
    Some(DVec2::new(point.x(), point.y()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(min, min),
            DVec2::new(max, min),
            DVec2::new(max, max),
            DVec2::new(min, max),
        ]
    }

    fn geo_square(lon: f64, lat: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (lon, lat),
                (lon + size, lat),
                (lon + size, lat + size),
                (lon, lat + size),
                (lon, lat),
            ]),
            vec![],
        )])
    }

    #[test]
    fn test_center_maps_to_translate() {
        let projection = MercatorProjection::new(
            Coord { x: 121.0, y: 23.5 },
            8000.0,
            DVec2::new(400.0, 380.0),
        );
        let p = projection.project(Coord { x: 121.0, y: 23.5 });
        assert!((p.x - 400.0).abs() < 1e-9);
        assert!((p.y - 380.0).abs() < 1e-9);
    }

    #[test]
    fn test_screen_orientation() {
        let projection = MercatorProjection::default();
        let east = projection.project(Coord { x: 122.0, y: 23.5 });
        let north = projection.project(Coord { x: 121.0, y: 24.5 });
        assert!(east.x > projection.translate.x);
        // Screen y grows downward
        assert!(north.y < projection.translate.y);
        // One degree of longitude is scale * pi / 180 pixels
        assert!((east.x - projection.translate.x - 8000.0_f64.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_path_format() {
        let d = path_data(&[vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.5),
        ]])
        .unwrap();
        assert_eq!(d, "M0,0L10,0L10,10.5Z");

        let d = path_data(&[vec![DVec2::new(1.23456, -0.0001)]]).unwrap();
        assert_eq!(d, "M1.235,0Z");
    }

    #[test]
    fn test_multipolygon_path_has_one_subpath_per_ring() {
        let d = path_data(&[square(0.0, 1.0), square(2.0, 3.0)]).unwrap();
        assert_eq!(d.matches('M').count(), 2);
        assert_eq!(d.matches('Z').count(), 2);
    }

    #[test]
    fn test_path_is_idempotent() {
        let projection = MercatorProjection::default();
        let geometry = geo_square(121.0, 23.0, 0.5);
        let first = projection.path(&geometry);
        let second = projection.path(&geometry);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_closing_point_dropped() {
        let projection = MercatorProjection::default();
        let rings = projection.project_rings(&geo_square(121.0, 23.0, 0.5));
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4);
    }

    #[test]
    fn test_polygons_keep_holes_together() {
        let projection = MercatorProjection::default();
        let mut geometry = geo_square(121.0, 23.0, 1.0);
        geometry.0[0].interiors_push(LineString::from(vec![
            (121.2, 23.2),
            (121.4, 23.2),
            (121.4, 23.4),
            (121.2, 23.2),
        ]));
        geometry.0.push(Polygon::new(LineString::new(vec![]), vec![]));

        let polygons = projection.project_polygons(&geometry);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].len(), 2);
        assert_eq!(polygons[0][1].len(), 3);
        assert_eq!(projection.project_rings(&geometry).len(), 2);
    }

    #[test]
    fn test_bounds() {
        let bounds = polygons_bounds(&[vec![square(2.0, 6.0)], vec![square(-1.0, 3.0)]]).unwrap();
        assert_eq!(bounds.min, DVec2::new(-1.0, -1.0));
        assert_eq!(bounds.max, DVec2::new(6.0, 6.0));
        assert_eq!(bounds.width(), 7.0);
        assert_eq!(bounds.center(), DVec2::new(2.5, 2.5));
    }

    #[test]
    fn test_centroid_of_square() {
        let c = polygons_centroid(&[vec![square(0.0, 10.0)]]).unwrap();
        assert!((c.x - 5.0).abs() < 1e-9);
        assert!((c.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_subtracts_holes() {
        let c = polygons_centroid(&[vec![square(0.0, 10.0), square(0.0, 5.0)]]).unwrap();
        let expected = (100.0 * 5.0 - 25.0 * 2.5) / 75.0;
        assert!((c.x - expected).abs() < 1e-9);
        assert!((c.y - expected).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_of_collinear_ring() {
        let c = polygons_centroid(&[vec![vec![DVec2::new(0.0, 0.0), DVec2::new(4.0, 0.0)]]]).unwrap();
        assert!((c.x - 2.0).abs() < 1e-9);
        assert!(c.y.abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_geometry() {
        let projection = MercatorProjection::default();
        let empty = MultiPolygon::new(vec![]);
        assert!(projection.path(&empty).is_none());
        assert!(projection.bounds(&empty).is_none());
        assert!(projection.centroid(&empty).is_none());
    }
}
