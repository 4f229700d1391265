//! Geometry provider: loads the county and township topologies.
//!
//! Loading is asynchronous but egui's update() is synchronous, so results
//! come back to the UI thread through a channel. Each session issues the
//! request at most once.

use eframe::egui;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::MapError;
use crate::geo::{decode_collection, FeatureCollection};
use crate::state::MapSettings;

/// Outcome of the session's geometry load.
#[derive(Debug)]
pub enum LoadResult {
    /// Both levels decoded.
    Loaded {
        counties: FeatureCollection,
        townships: FeatureCollection,
    },
    /// Either source failed; nothing is rendered.
    Failed(MapError),
}

/// Decodes both sources. Either failure fails the whole load.
pub fn load_collections(
    county_json: Result<String, MapError>,
    township_json: Result<String, MapError>,
    settings: &MapSettings,
) -> LoadResult {
    let decode = || -> Result<(FeatureCollection, FeatureCollection), MapError> {
        let counties = decode_collection(&county_json?, &settings.county_object)?;
        let townships = decode_collection(&township_json?, &settings.township_object)?;
        Ok((counties, townships))
    };

    match decode() {
        Ok((counties, townships)) => {
            if counties.is_empty() {
                log::warn!("County object {} has no features", settings.county_object);
            }
            log::info!(
                "Loaded {} counties and {} townships",
                counties.len(),
                townships.len()
            );
            LoadResult::Loaded {
                counties,
                townships,
            }
        }
        Err(e) => {
            log::error!("{}", e);
            LoadResult::Failed(e)
        }
    }
}

/// Channel bridging the background load with the UI thread.
pub struct GeometryChannel {
    sender: Sender<LoadResult>,
    receiver: Receiver<LoadResult>,
    requested: bool,
}

impl Default for GeometryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryChannel {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            requested: false,
        }
    }

    /// Starts the load. Returns false if it was already started.
    pub fn request(&mut self, ctx: &egui::Context, settings: &MapSettings) -> bool {
        if self.requested {
            return false;
        }
        self.requested = true;
        self.spawn(ctx.clone(), settings.clone());
        true
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn(&self, ctx: egui::Context, settings: MapSettings) {
        let sender = self.sender.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let county = fetch_text(&settings.county_source).await;
            let township = fetch_text(&settings.township_source).await;
            let _ = sender.send(load_collections(county, township, &settings));
            ctx.request_repaint();
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn(&self, ctx: egui::Context, settings: MapSettings) {
        let sender = self.sender.clone();

        std::thread::spawn(move || {
            let county = read_text(&settings.county_source);
            let township = read_text(&settings.township_source);
            let _ = sender.send(load_collections(county, township, &settings));
            ctx.request_repaint();
        });
    }

    /// Non-blocking check for the finished load.
    pub fn try_recv(&self) -> Option<LoadResult> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_text(path: &str) -> Result<String, MapError> {
    log::info!("Reading {}", path);
    std::fs::read_to_string(path).map_err(|e| MapError::DataLoad(format!("{}: {}", path, e)))
}

#[cfg(target_arch = "wasm32")]
async fn fetch_text(url: &str) -> Result<String, MapError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    log::info!("Fetching {}", url);
    let fail = |what: &str, e: wasm_bindgen::JsValue| {
        MapError::DataLoad(format!("{} {}: {:?}", what, url, e))
    };

    let window = web_sys::window().ok_or_else(|| MapError::DataLoad("no window".to_string()))?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| fail("fetch", e))?;
    let response: web_sys::Response = response.dyn_into().map_err(|e| fail("response", e))?;
    if !response.ok() {
        return Err(MapError::DataLoad(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }

    let body = response.text().map_err(|e| fail("read", e))?;
    let text = JsFuture::from(body).await.map_err(|e| fail("read", e))?;
    text.as_string()
        .ok_or_else(|| MapError::DataLoad(format!("{} body is not text", url)))
}
