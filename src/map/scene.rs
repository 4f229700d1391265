//! Retained scene graph for the map.
//!
//! The scene is an ordered list of nodes (county and township shapes plus
//! at most one info label) under a single root transform. Node order is
//! paint order: later nodes are drawn on top.

use geo::Contains;
use geo_types::{MultiPolygon, Point};
use glam::{DAffine2, DVec2};
use std::sync::Arc;

use crate::geo::{path_data, screen_geometry, FeatureKey, MapFeature, MercatorProjection};

/// Class name of the info label node.
pub const INFO_TEXT_CLASS: &str = "info-text";

/// Stable identifier of a shape node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u64);

/// Shape class, one per geographic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeClass {
    County,
    Township,
}

impl ShapeClass {
    pub fn class_name(&self) -> &'static str {
        match self {
            ShapeClass::County => "county",
            ShapeClass::Township => "township",
        }
    }
}

/// Action triggered by clicking a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Zoom into the county with this code.
    DrillDown(String),
}

/// Pointer handlers attached to a shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeHandlers {
    /// Text shown by the info overlay while hovered
    pub hover_label: Option<String>,
    /// Action run on click
    pub click: Option<ClickAction>,
}

/// A rendered feature.
#[derive(Debug, Clone)]
pub struct Shape {
    pub id: ShapeId,
    pub class: ShapeClass,
    pub key: FeatureKey,
    /// Feature bound to this shape
    pub datum: Arc<MapFeature>,
    /// SVG path data at the current projection
    pub path: Option<String>,
    /// Projected polygons (exterior ring first) the path was built from
    pub polygons: Vec<Vec<Vec<DVec2>>>,
    /// The same polygons as a geometry, for hit testing
    pub region: MultiPolygon<f64>,
    pub opacity: f32,
    pub pointer_events: bool,
    pub handlers: ShapeHandlers,
    /// Set once the shape has left its data set and is waiting to be removed
    pub exiting: bool,
}

impl Shape {
    /// Re-derives path data and rings from the bound feature.
    pub fn apply_projection(&mut self, projection: &MercatorProjection) {
        self.polygons = projection.project_polygons(&self.datum.geometry);
        self.region = screen_geometry(&self.polygons);
        let rings: Vec<Vec<DVec2>> = self.polygons.iter().flatten().cloned().collect();
        self.path = path_data(&rings);
    }

    /// Whether `point` (untransformed scene coordinates) lies inside the
    /// shape. Points inside a hole are outside.
    pub fn contains(&self, point: DVec2) -> bool {
        self.region.contains(&Point::new(point.x, point.y))
    }
}

/// The single hover label.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoLabel {
    pub text: String,
    /// Anchor (text-anchor: middle) in scene coordinates; `None` when the
    /// hovered feature has no centroid
    pub position: Option<DVec2>,
    /// Font size in scene units
    pub font_size: f64,
}

impl InfoLabel {
    #[allow(dead_code)]
    pub fn class_name(&self) -> &'static str {
        INFO_TEXT_CLASS
    }
}

#[derive(Debug, Clone)]
pub enum SceneNode {
    Shape(Shape),
    Label(InfoLabel),
}

/// Root group transform: `translate(tx,ty) scale(s)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub translate: DVec2,
    pub scale: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform {
        translate: DVec2::ZERO,
        scale: 1.0,
    };

    pub fn new(translate: DVec2, scale: f64) -> Self {
        Self { translate, scale }
    }

    pub fn to_affine(&self) -> DAffine2 {
        DAffine2::from_scale_angle_translation(DVec2::splat(self.scale), 0.0, self.translate)
    }

    /// Maps a scene point to viewport pixels.
    pub fn apply(&self, point: DVec2) -> DVec2 {
        self.to_affine().transform_point2(point)
    }

    /// Maps a viewport pixel back to scene coordinates.
    pub fn invert(&self, point: DVec2) -> DVec2 {
        (point - self.translate) / self.scale
    }

    /// Component-wise interpolation between two transforms.
    pub fn lerp(&self, to: &ZoomTransform, t: f64) -> ZoomTransform {
        ZoomTransform {
            translate: self.translate.lerp(to.translate, t),
            scale: self.scale + (to.scale - self.scale) * t,
        }
    }

    /// SVG transform attribute value.
    pub fn to_svg(&self) -> String {
        format!(
            "translate({},{}) scale({})",
            self.translate.x, self.translate.y, self.scale
        )
    }
}

/// Shape group plus its root transform.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    transform: ZoomTransform,
    highlighted: Option<ShapeId>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: ZoomTransform) {
        self.transform = transform;
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// Appends a shape for `datum`, projected with `projection`.
    pub fn append_shape(
        &mut self,
        class: ShapeClass,
        datum: Arc<MapFeature>,
        projection: &MercatorProjection,
    ) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;

        let mut shape = Shape {
            id,
            class,
            key: datum.key(),
            datum,
            path: None,
            polygons: Vec::new(),
            region: MultiPolygon::new(Vec::new()),
            opacity: 1.0,
            pointer_events: true,
            handlers: ShapeHandlers::default(),
            exiting: false,
        };
        shape.apply_projection(projection);
        self.nodes.push(SceneNode::Shape(shape));
        id
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes().find(|s| s.id == id)
    }

    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes_mut().find(|s| s.id == id)
    }

    pub fn remove_shape(&mut self, id: ShapeId) -> bool {
        let before = self.nodes.len();
        self.nodes
            .retain(|node| !matches!(node, SceneNode::Shape(s) if s.id == id));
        if self.highlighted == Some(id) {
            self.highlighted = None;
        }
        self.nodes.len() != before
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.nodes.iter().filter_map(|node| match node {
            SceneNode::Shape(shape) => Some(shape),
            SceneNode::Label(_) => None,
        })
    }

    pub fn shapes_mut(&mut self) -> impl Iterator<Item = &mut Shape> {
        self.nodes.iter_mut().filter_map(|node| match node {
            SceneNode::Shape(shape) => Some(shape),
            SceneNode::Label(_) => None,
        })
    }

    pub fn shapes_of(&self, class: ShapeClass) -> impl Iterator<Item = &Shape> {
        self.shapes().filter(move |s| s.class == class)
    }

    /// Sets pointer interactivity for every shape of a class.
    pub fn set_pointer_events(&mut self, class: ShapeClass, enabled: bool) {
        for shape in self.shapes_mut().filter(|s| s.class == class) {
            shape.pointer_events = enabled;
        }
    }

    /// Re-applies path data to every shape at the given projection.
    pub fn refresh_paths(&mut self, projection: &MercatorProjection) {
        for shape in self.shapes_mut() {
            shape.apply_projection(projection);
        }
    }

    /// Topmost interactive shape under a viewport pixel.
    pub fn hit_test(&self, point: DVec2) -> Option<ShapeId> {
        let local = self.transform.invert(point);
        self.shapes()
            .filter(|s| s.pointer_events && !s.exiting)
            .filter(|s| s.contains(local))
            .last()
            .map(|s| s.id)
    }

    pub fn highlighted(&self) -> Option<ShapeId> {
        self.highlighted
    }

    pub fn set_highlighted(&mut self, id: Option<ShapeId>) {
        self.highlighted = id;
    }

    #[allow(dead_code)]
    pub fn label(&self) -> Option<&InfoLabel> {
        self.nodes.iter().find_map(|node| match node {
            SceneNode::Label(label) => Some(label),
            SceneNode::Shape(_) => None,
        })
    }

    pub fn label_mut(&mut self) -> Option<&mut InfoLabel> {
        self.nodes.iter_mut().find_map(|node| match node {
            SceneNode::Label(label) => Some(label),
            SceneNode::Shape(_) => None,
        })
    }

    /// Appends the info label. Any existing label is replaced.
    pub fn insert_label(&mut self, label: InfoLabel) {
        self.remove_label();
        self.nodes.push(SceneNode::Label(label));
    }

    pub fn remove_label(&mut self) -> bool {
        let before = self.nodes.len();
        self.nodes
            .retain(|node| !matches!(node, SceneNode::Label(_)));
        self.nodes.len() != before
    }

    /// Moves the label to the end of the paint order.
    pub fn raise_label(&mut self) {
        if let Some(index) = self
            .nodes
            .iter()
            .position(|node| matches!(node, SceneNode::Label(_)))
        {
            let node = self.nodes.remove(index);
            self.nodes.push(node);
        }
    }
}
