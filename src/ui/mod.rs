//! UI components for the map application.
//!
//! - Central canvas: the map itself, fed with size and pointer input
//! - Top bar: header band with the title, status and Back control

mod canvas;
mod top_bar;

pub use canvas::render_canvas;
pub use top_bar::render_top_bar;
