//! Scene rendering.
//!
//! Paints the map scene graph onto the egui canvas.

use crate::map::{InfoLabel, Scene, SceneNode, Shape, ShapeClass, ZoomTransform};
use eframe::egui::{self, Align2, Color32, FontId, Mesh, Painter, Pos2, Stroke, Vec2};
use glam::DVec2;

/// Colors and stroke widths used when painting the scene.
#[derive(Debug, Clone, Copy)]
pub struct RenderStyle {
    pub county_fill: Color32,
    pub township_fill: Color32,
    pub highlight_fill: Color32,
    pub outline: Stroke,
    pub label_color: Color32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            county_fill: Color32::from_rgb(120, 170, 140),
            township_fill: Color32::from_rgb(232, 196, 120),
            highlight_fill: Color32::from_rgb(240, 120, 90),
            outline: Stroke::new(0.8, Color32::from_rgb(250, 250, 245)),
            label_color: Color32::from_rgb(30, 30, 30),
        }
    }
}

/// Paints every node of the scene in order, offset by the canvas origin.
pub fn render_scene(painter: &Painter, scene: &Scene, origin: Pos2, style: &RenderStyle) {
    let transform = scene.transform();
    let to_screen = |p: DVec2| -> Pos2 {
        let t = transform.apply(p);
        Pos2::new(origin.x + t.x as f32, origin.y + t.y as f32)
    };

    for node in scene.nodes() {
        match node {
            SceneNode::Shape(shape) => {
                let highlighted = scene.highlighted() == Some(shape.id);
                render_shape(painter, shape, highlighted, style, &to_screen);
            }
            SceneNode::Label(label) => {
                render_label(painter, label, &transform, style, &to_screen);
            }
        }
    }
}

fn render_shape(
    painter: &Painter,
    shape: &Shape,
    highlighted: bool,
    style: &RenderStyle,
    to_screen: &impl Fn(DVec2) -> Pos2,
) {
    // Degenerate features have nothing to draw
    if shape.path.is_none() || shape.opacity <= 0.0 {
        return;
    }

    let base = match shape.class {
        ShapeClass::County => style.county_fill,
        ShapeClass::Township => style.township_fill,
    };
    let fill = if highlighted { style.highlight_fill } else { base };
    let fill = fill.gamma_multiply(shape.opacity);
    let outline = Stroke::new(
        style.outline.width,
        style.outline.color.gamma_multiply(shape.opacity),
    );

    for polygon in &shape.polygons {
        painter.add(egui::Shape::mesh(fill_mesh(polygon, fill, to_screen)));

        for ring in polygon {
            let points: Vec<Pos2> = ring.iter().map(|p| to_screen(*p)).collect();
            if points.len() >= 2 {
                painter.add(egui::Shape::closed_line(points, outline));
            }
        }
    }
}

/// Triangulates one polygon (exterior ring first, then holes) into a mesh.
fn fill_mesh(
    polygon: &[Vec<DVec2>],
    color: Color32,
    to_screen: &impl Fn(DVec2) -> Pos2,
) -> Mesh {
    let mut mesh = Mesh::default();

    let mut coords: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();
    for (i, ring) in polygon.iter().enumerate() {
        if i > 0 {
            hole_indices.push(coords.len() / 2);
        }
        for p in ring {
            coords.push(p.x);
            coords.push(p.y);
        }
    }

    if coords.len() < 6 {
        return mesh;
    }

    let indices = match earcutr::earcut(&coords, &hole_indices, 2) {
        Ok(ix) => ix,
        Err(_) => return mesh,
    };

    for pair in coords.chunks_exact(2) {
        mesh.colored_vertex(to_screen(DVec2::new(pair[0], pair[1])), color);
    }
    for tri in indices.chunks_exact(3) {
        mesh.add_triangle(tri[0] as u32, tri[1] as u32, tri[2] as u32);
    }
    mesh
}

fn render_label(
    painter: &Painter,
    label: &InfoLabel,
    transform: &ZoomTransform,
    style: &RenderStyle,
    to_screen: &impl Fn(DVec2) -> Pos2,
) {
    let Some(anchor) = label.position else {
        return;
    };
    if label.text.is_empty() {
        return;
    }

    // The anchor is the text baseline, so draw upward from it
    let size = (label.font_size * transform.scale) as f32;
    let pos = to_screen(anchor);
    let font = FontId::proportional(size);

    // Light halo so the label stays readable over any fill
    for offset in [Vec2::X, -Vec2::X, Vec2::Y, -Vec2::Y] {
        painter.text(
            pos + offset,
            Align2::CENTER_BOTTOM,
            &label.text,
            font.clone(),
            Color32::from_white_alpha(200),
        );
    }
    painter.text(pos, Align2::CENTER_BOTTOM, &label.text, font, style.label_color);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_screen(p: DVec2) -> Pos2 {
        Pos2::new(p.x as f32, p.y as f32)
    }

    fn square(min: f64, max: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(min, min),
            DVec2::new(max, min),
            DVec2::new(max, max),
            DVec2::new(min, max),
        ]
    }

    #[test]
    fn test_fill_mesh_square() {
        let mesh = fill_mesh(&[square(0.0, 10.0)], Color32::RED, &to_screen);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn test_fill_mesh_with_hole() {
        let mut hole = square(3.0, 6.0);
        hole.reverse();
        let mesh = fill_mesh(&[square(0.0, 10.0), hole], Color32::RED, &to_screen);
        assert_eq!(mesh.vertices.len(), 8);
        // A square with a square hole triangulates into 8 triangles
        assert_eq!(mesh.indices.len(), 24);
    }

    #[test]
    fn test_fill_mesh_degenerate() {
        let mesh = fill_mesh(
            &[vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 1.0)]],
            Color32::RED,
            &to_screen,
        );
        assert!(mesh.is_empty());
    }
}
