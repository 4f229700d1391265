//! Central canvas UI: the map area.

use crate::geo::{render_scene, RenderStyle};
use crate::map::{MapSession, ViewportSize};
use crate::state::AppState;
use eframe::egui::{self, Color32, CursorIcon, Pos2, Rect, Sense};
use glam::DVec2;
use web_time::Instant;

const BACKGROUND: Color32 = Color32::from_rgb(214, 228, 238);

/// Renders the map canvas and the header drawn over its top band.
///
/// The canvas box is the map's host container: its size drives the
/// viewport every frame, and pointer input is forwarded to the session in
/// canvas-local pixels.
pub fn render_canvas(
    ctx: &egui::Context,
    session: &mut MapSession,
    state: &AppState,
    style: &RenderStyle,
    now: Instant,
) {
    egui::CentralPanel::default()
        .frame(egui::Frame::NONE.fill(BACKGROUND))
        .show(ctx, |ui| {
            let available_size = ui.available_size();
            let (response, painter) = ui.allocate_painter(available_size, Sense::click());
            let rect = response.rect;

            let size = ViewportSize::new(rect.width() as f64, rect.height() as f64);
            if session.viewport().is_initialized() {
                session.resize(size, now);
            } else if let Err(e) = session.initialize(size, now) {
                log::debug!("{}", e);
            }

            let hover = response.hover_pos().map(|p| to_local(rect, p));
            session.pointer_move(hover);
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    session.click_at(to_local(rect, pos), now);
                }
            }

            if let Some(id) = session.scene().highlighted() {
                let clickable = session
                    .scene()
                    .shape(id)
                    .is_some_and(|s| s.handlers.click.is_some());
                if clickable {
                    ctx.set_cursor_icon(CursorIcon::PointingHand);
                }
            }

            render_scene(&painter, session.scene(), rect.min, style);

            super::render_top_bar(ui, rect, session, state, now);
        });
}

fn to_local(rect: Rect, pos: Pos2) -> DVec2 {
    DVec2::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64)
}
