//! Hover info label.

use glam::DVec2;

use super::scene::{InfoLabel, Scene};

/// Places the single info label over the hovered feature.
#[derive(Debug, Clone)]
pub struct HoverInfoOverlay {
    base_font_size: f64,
}

impl HoverInfoOverlay {
    pub fn new(base_font_size: f64) -> Self {
        Self { base_font_size }
    }

    /// Font size that renders at `base_font_size` pixels under `zoom_scale`.
    pub fn font_size(&self, zoom_scale: f64) -> f64 {
        if zoom_scale > 0.0 {
            self.base_font_size / zoom_scale
        } else {
            self.base_font_size
        }
    }

    /// Shows `text` at `centroid`, on top of every shape.
    ///
    /// The anchor is lowered by half the font size so the text sits centred
    /// on the centroid. A missing centroid keeps the label text but leaves it
    /// unpositioned. Empty text removes the label.
    pub fn show(&self, scene: &mut Scene, centroid: Option<DVec2>, text: &str, zoom_scale: f64) {
        if text.is_empty() {
            self.hide(scene);
            return;
        }

        let font_size = self.font_size(zoom_scale);
        let label = InfoLabel {
            text: text.to_string(),
            position: centroid.map(|c| DVec2::new(c.x, c.y + font_size / 2.0)),
            font_size,
        };

        // Keyed by text: the same label is updated in place, a new one replaces it
        match scene.label_mut().filter(|existing| existing.text == text) {
            Some(existing) => *existing = label,
            None => scene.insert_label(label),
        }
        scene.raise_label();
    }

    /// Removes the label.
    pub fn hide(&self, scene: &mut Scene) {
        scene.remove_label();
    }
}
