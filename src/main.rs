#![warn(clippy::all)]

//! Taiwan Map - an interactive county/township map of Taiwan.
//!
//! Counties are shown at the national view. Clicking a county zooms into
//! it and fades in its townships; the Back control zooms out again.

mod data;
mod error;
mod geo;
mod map;
mod state;
mod ui;

use crate::geo::RenderStyle;
use data::{GeometryChannel, LoadResult};
use eframe::egui;
use map::MapSession;
use state::{AppState, MapSettings};
use web_time::Instant;

// Native entry point
#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Taiwan Map")
            .with_inner_size([960.0, 880.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Taiwan Map",
        native_options,
        Box::new(|cc| Ok(Box::new(TaiwanMapApp::new(cc)))),
    )
}

// WASM entry point - main is not called on wasm32
#[cfg(target_arch = "wasm32")]
fn main() {}

/// Entry point for the WASM application.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub async fn start() {
    use eframe::wasm_bindgen::JsCast as _;

    // Redirect `log` messages to `console.log`:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async {
        let document = web_sys::window()
            .expect("No window")
            .document()
            .expect("No document");

        let canvas = document
            .get_element_by_id("map_canvas")
            .expect("Failed to find map_canvas")
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .expect("map_canvas was not a HtmlCanvasElement");

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(TaiwanMapApp::new(cc)))),
            )
            .await;

        // Remove the loading text once the app has loaded:
        if let Some(loading_text) = document.get_element_by_id("loading_text") {
            match start_result {
                Ok(_) => {
                    loading_text.remove();
                }
                Err(e) => {
                    loading_text.set_inner_html(
                        "<p>The app has crashed. See the developer console for details.</p>",
                    );
                    panic!("Failed to start eframe: {e:?}");
                }
            }
        }
    });
}

/// Main application state and logic.
pub struct TaiwanMapApp {
    /// Header state and settings
    state: AppState,

    /// The map's render session
    session: MapSession,

    /// Channel for the one-shot geometry load
    geometry_channel: GeometryChannel,

    style: RenderStyle,
}

impl TaiwanMapApp {
    /// Creates the app and starts loading the map geometry.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        let settings = MapSettings::load();
        log::info!("Using settings from {}", MapSettings::location());

        let mut state = AppState::new();
        let mut geometry_channel = GeometryChannel::new();
        if geometry_channel.request(&cc.egui_ctx, &settings) {
            state.set_loading();
        }

        Self {
            state,
            session: MapSession::new(settings),
            geometry_channel,
            style: RenderStyle::default(),
        }
    }

    fn poll_geometry(&mut self, now: Instant) {
        let Some(result) = self.geometry_channel.try_recv() else {
            return;
        };

        match result {
            LoadResult::Loaded {
                counties,
                townships,
            } => {
                self.state.set_loaded(counties.len(), townships.len());
                self.session.load(counties, townships, now);
            }
            LoadResult::Failed(e) => {
                // No partial map: the session never sees any features
                self.state.set_failed(e.to_string());
            }
        }
    }
}

impl eframe::App for TaiwanMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        self.poll_geometry(now);
        self.session.tick(now);

        ui::render_canvas(ctx, &mut self.session, &self.state, &self.style, now);

        if self.session.needs_frame() {
            ctx.request_repaint();
        } else if let Some(deadline) = self.session.next_wakeup() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }
    }
}
