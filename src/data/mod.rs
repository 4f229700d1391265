//! Map data sources.
//!
//! ## Geometry Provider
//!
//! Loads the county and township topologies once per session and hands the
//! decoded feature collections to the UI thread:
//!
//! ```text
//! county source ──┐
//!                 ├─> decode_collection ─> LoadResult ─> channel ─> MapSession::load
//! township source ┘
//! ```

pub mod provider;

pub use provider::{GeometryChannel, LoadResult};
