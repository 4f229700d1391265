//! Header band: app title, selected county, load status and the Back control.

use crate::map::{DrillPhase, MapSession};
use crate::state::{AppState, LoadStatus};
use eframe::egui::{self, Align2, Color32, FontId, Rect, RichText, Vec2};
use web_time::Instant;

const BACK_BUTTON_SIZE: Vec2 = Vec2::new(92.0, 32.0);
const BACK_BUTTON_MARGIN: f32 = 12.0;

/// Draws the header over the top of the map and, while a county is
/// drilled into, the Back button just below it.
pub fn render_top_bar(
    ui: &mut egui::Ui,
    canvas: Rect,
    session: &mut MapSession,
    state: &AppState,
    now: Instant,
) {
    let header_height = session.viewport().header_height() as f32;
    let band = Rect::from_min_size(canvas.min, Vec2::new(canvas.width(), header_height));
    let painter = ui.painter_at(canvas);

    painter.rect_filled(band, 0.0, Color32::from_rgb(226, 232, 240));
    painter.text(
        band.left_center() + Vec2::new(16.0, 0.0),
        Align2::LEFT_CENTER,
        "Taiwan Map",
        FontId::proportional(24.0),
        Color32::from_rgb(251, 146, 60),
    );

    let zoom = session.zoom();
    if zoom.is_drilled_down() {
        if let Some(county) = session
            .hierarchy()
            .and_then(|h| h.county(&zoom.selected_county_code))
        {
            painter.text(
                band.center(),
                Align2::CENTER_CENTER,
                &county.info.county_name,
                FontId::proportional(18.0),
                Color32::from_rgb(71, 85, 105),
            );
        }
    }

    let status_color = match state.load_status {
        LoadStatus::Failed(_) => Color32::from_rgb(200, 60, 60),
        _ => Color32::DARK_GRAY,
    };
    painter.text(
        band.right_center() - Vec2::new(16.0, 0.0),
        Align2::RIGHT_CENTER,
        &state.status_message,
        FontId::proportional(13.0),
        status_color,
    );

    if !session.is_back_visible() {
        return;
    }

    let button_rect = Rect::from_min_size(
        egui::pos2(
            canvas.max.x - BACK_BUTTON_MARGIN - BACK_BUTTON_SIZE.x,
            canvas.min.y + header_height + BACK_BUTTON_MARGIN,
        ),
        BACK_BUTTON_SIZE,
    );
    let label = RichText::new(format!("{} Back", egui_phosphor::regular::ARROW_LEFT)).size(14.0);
    // Clickable only once the zoom-in has settled
    let enabled = session.phase() == DrillPhase::CountyDrilled;
    let back = ui.put(button_rect, |ui: &mut egui::Ui| {
        ui.add_enabled(enabled, egui::Button::new(label))
    });

    if back.clicked() {
        session.drill_up(now);
    }
}
