//! Interaction coordinator.
//!
//! `MapSession` owns every piece of mutable map state for one viewport: the
//! viewport/projection, the loaded features, the scene graph, running
//! transitions and the drill state. UI code feeds it pointer, click and
//! resize events and calls [`MapSession::tick`] once per frame.

use glam::DVec2;
use std::time::Duration;
use web_time::Instant;

use super::hierarchy::FeatureHierarchy;
use super::overlay::HoverInfoOverlay;
use super::reconcile::{reconcile, ExitDisposition, JoinSummary};
use super::scene::{ClickAction, Scene, ShapeClass, ShapeHandlers, ShapeId, ZoomTransform};
use super::transition::{fit_bounds, TransitionController, TransitionHandle};
use super::viewport::{ViewportController, ViewportSize};
use crate::error::MapError;
use crate::geo::FeatureCollection;
use crate::state::MapSettings;

/// Drill state of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrillPhase {
    /// County overview
    #[default]
    National,
    /// Zooming into a county
    DrillingIn,
    /// Showing one county's townships
    CountyDrilled,
    /// Zooming back out
    DrillingOut,
}

/// Current zoom target. Drilled down exactly when a county is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomState {
    pub current_scale: f64,
    pub selected_county_code: String,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            current_scale: 1.0,
            selected_county_code: String::new(),
        }
    }
}

impl ZoomState {
    pub fn is_drilled_down(&self) -> bool {
        !self.selected_county_code.is_empty()
    }
}

/// The single render session of a map viewport.
#[derive(Debug)]
pub struct MapSession {
    settings: MapSettings,
    viewport: ViewportController,
    hierarchy: Option<FeatureHierarchy>,
    scene: Scene,
    transitions: TransitionController,
    overlay: HoverInfoOverlay,
    phase: DrillPhase,
    zoom: ZoomState,
    /// Zoom transition that ends the current transient phase
    pending_zoom: Option<TransitionHandle>,
    hovered: Option<ShapeId>,
}

impl MapSession {
    pub fn new(settings: MapSettings) -> Self {
        Self {
            viewport: ViewportController::new(&settings),
            transitions: TransitionController::new(Duration::from_millis(settings.transition_ms)),
            overlay: HoverInfoOverlay::new(settings.base_font_size),
            settings,
            hierarchy: None,
            scene: Scene::new(),
            phase: DrillPhase::default(),
            zoom: ZoomState::default(),
            pending_zoom: None,
            hovered: None,
        }
    }

    /// Sets up the viewport from the host box.
    ///
    /// While the host is not laid out this fails with `ViewportUnavailable`
    /// and rendering waits for a resize with a usable size.
    pub fn initialize(&mut self, size: ViewportSize, now: Instant) -> Result<(), MapError> {
        self.viewport.initialize(size)?;
        self.render_if_ready(now);
        Ok(())
    }

    /// Hands the decoded features to the session.
    pub fn load(&mut self, counties: FeatureCollection, townships: FeatureCollection, now: Instant) {
        self.hierarchy = Some(FeatureHierarchy::new(counties, townships));
        if !self.viewport.is_initialized() {
            log::debug!("Viewport not laid out yet; deferring first render");
        }
        self.render_if_ready(now);
    }

    fn render_if_ready(&mut self, now: Instant) {
        let drawn = self.scene.shapes_of(ShapeClass::County).next().is_some();
        if self.hierarchy.is_some() && self.viewport.is_initialized() && !drawn {
            self.draw_counties();
            self.draw_townships("", now);
        }
    }

    /// Reconciles the county layer against every county feature.
    pub fn draw_counties(&mut self) -> JoinSummary {
        let Some(hierarchy) = &self.hierarchy else {
            return JoinSummary::default();
        };

        reconcile(
            &mut self.scene,
            ShapeClass::County,
            hierarchy.counties(),
            self.viewport.projection(),
            |shape| {
                let info = &shape.datum.info;
                shape.handlers = ShapeHandlers {
                    hover_label: Some(info.county_name.clone()),
                    click: Some(ClickAction::DrillDown(info.county_code.clone())),
                };
            },
            |_| ExitDisposition::Remove,
        )
    }

    /// Reconciles the township layer against the townships of `county_code`.
    ///
    /// New townships fade in and only become interactive once the fade has
    /// finished. Leaving townships lose interactivity at once, fade out and
    /// are removed when the fade ends.
    pub fn draw_townships(&mut self, county_code: &str, now: Instant) -> JoinSummary {
        let Some(hierarchy) = &self.hierarchy else {
            return JoinSummary::default();
        };
        let features = hierarchy.filtered_townships(county_code);

        let summary = reconcile(
            &mut self.scene,
            ShapeClass::Township,
            &features,
            self.viewport.projection(),
            |shape| {
                shape.opacity = 0.0;
                shape.pointer_events = false;
                shape.handlers = ShapeHandlers {
                    hover_label: Some(shape.datum.info.town_name.clone()),
                    click: None,
                };
            },
            |shape| {
                shape.pointer_events = false;
                shape.handlers = ShapeHandlers::default();
                ExitDisposition::Retain
            },
        );

        if !summary.entered.is_empty() {
            let fade_in = self
                .transitions
                .begin_fade(&self.scene, &summary.entered, 1.0, now);
            self.transitions.on_complete(fade_in, |scene| {
                for shape in scene.shapes_mut() {
                    if shape.class == ShapeClass::Township && !shape.exiting {
                        shape.pointer_events = true;
                    }
                }
            });
        }

        if !summary.exited.is_empty() {
            let fade_out = self
                .transitions
                .begin_fade(&self.scene, &summary.exited, 0.0, now);
            let exited = summary.exited.clone();
            self.transitions.on_complete(fade_out, move |scene| {
                for id in exited {
                    scene.remove_shape(id);
                }
            });
        }

        summary
    }

    /// Zooms into a county and fades in its townships.
    ///
    /// Only honoured from the national view; returns false otherwise.
    pub fn drill_down(&mut self, county_code: &str, now: Instant) -> bool {
        if self.phase != DrillPhase::National {
            log::debug!("Ignoring drill-down to {} while {:?}", county_code, self.phase);
            return false;
        }
        let Some(county) = self
            .hierarchy
            .as_ref()
            .and_then(|h| h.county(county_code))
            .cloned()
        else {
            log::warn!("No county with code {}", county_code);
            return false;
        };

        let target = match self.viewport.projection().bounds(&county.geometry) {
            Some(bounds) => fit_bounds(
                &bounds,
                self.viewport.size(),
                self.viewport.header_height(),
                self.settings.fit_ratio,
                self.settings.max_zoom,
            ),
            None => ZoomTransform::IDENTITY,
        };

        self.zoom = ZoomState {
            current_scale: target.scale,
            selected_county_code: county_code.to_string(),
        };
        self.scene.set_pointer_events(ShapeClass::County, false);
        self.pending_zoom = Some(self.transitions.begin_transform(&self.scene, target, now));
        self.phase = DrillPhase::DrillingIn;
        self.draw_townships(county_code, now);

        log::info!(
            "Drilling into {} ({}): {}",
            county.info.county_name,
            county_code,
            target.to_svg()
        );
        true
    }

    /// Zooms back out to the national view.
    ///
    /// Only honoured while a county is fully drilled; returns false otherwise.
    pub fn drill_up(&mut self, now: Instant) -> bool {
        if self.phase != DrillPhase::CountyDrilled {
            log::debug!("Ignoring drill-up while {:?}", self.phase);
            return false;
        }

        let handle = self
            .transitions
            .begin_transform(&self.scene, ZoomTransform::IDENTITY, now);
        self.transitions.on_complete(handle, |scene| {
            scene.set_pointer_events(ShapeClass::County, true);
        });
        self.pending_zoom = Some(handle);
        self.zoom = ZoomState::default();
        self.phase = DrillPhase::DrillingOut;
        self.draw_townships("", now);

        log::info!("Returning to national view");
        true
    }

    /// Runs the click handler of a shape.
    pub fn click(&mut self, id: ShapeId, now: Instant) -> bool {
        let action = self
            .scene
            .shape(id)
            .filter(|s| s.pointer_events)
            .and_then(|s| s.handlers.click.clone());
        match action {
            Some(ClickAction::DrillDown(code)) => self.drill_down(&code, now),
            None => false,
        }
    }

    /// Clicks whatever interactive shape is under a viewport pixel.
    pub fn click_at(&mut self, point: DVec2, now: Instant) -> bool {
        match self.scene.hit_test(point) {
            Some(id) => self.click(id, now),
            None => false,
        }
    }

    /// Tracks the pointer; `None` when it left the map.
    pub fn pointer_move(&mut self, point: Option<DVec2>) {
        let target = point.and_then(|p| self.scene.hit_test(p));
        if target == self.hovered {
            return;
        }
        if self.hovered.is_some() {
            self.pointer_leave();
        }
        if let Some(id) = target {
            self.pointer_enter(id);
        }
    }

    /// Highlights a shape and shows its label.
    pub fn pointer_enter(&mut self, id: ShapeId) {
        self.hovered = Some(id);
        self.scene.set_highlighted(Some(id));
        self.show_hover_label(id);
    }

    /// Clears the highlight and the label.
    pub fn pointer_leave(&mut self) {
        self.hovered = None;
        self.scene.set_highlighted(None);
        self.overlay.hide(&mut self.scene);
    }

    fn show_hover_label(&mut self, id: ShapeId) {
        let Some(shape) = self.scene.shape(id) else {
            return;
        };
        let text = shape.handlers.hover_label.clone().unwrap_or_default();
        let centroid = self.viewport.projection().centroid(&shape.datum.geometry);
        self.overlay
            .show(&mut self.scene, centroid, &text, self.zoom.current_scale);
    }

    /// Feeds a host resize signal through the throttle.
    pub fn resize(&mut self, size: ViewportSize, now: Instant) {
        let was_initialized = self.viewport.is_initialized();
        if self.viewport.request_resize(size, now) {
            self.on_projection_changed(was_initialized, now);
        }
    }

    fn on_projection_changed(&mut self, was_initialized: bool, now: Instant) {
        if !was_initialized {
            self.render_if_ready(now);
            return;
        }
        self.scene.refresh_paths(self.viewport.projection());
        if let Some(id) = self.hovered {
            self.show_hover_label(id);
        }
    }

    /// Advances throttled resizes and transitions to `now`.
    pub fn tick(&mut self, now: Instant) {
        let was_initialized = self.viewport.is_initialized();
        if self.viewport.poll_resize(now) {
            self.on_projection_changed(was_initialized, now);
        }

        self.transitions.tick(&mut self.scene, now);
        if self
            .pending_zoom
            .is_some_and(|h| !self.transitions.is_running(h))
        {
            self.pending_zoom = None;
            self.phase = match self.phase {
                DrillPhase::DrillingIn => DrillPhase::CountyDrilled,
                DrillPhase::DrillingOut => DrillPhase::National,
                other => other,
            };
            log::debug!("Zoom transition finished; now {:?}", self.phase);
        }
    }

    pub fn phase(&self) -> DrillPhase {
        self.phase
    }

    pub fn zoom(&self) -> &ZoomState {
        &self.zoom
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn hierarchy(&self) -> Option<&FeatureHierarchy> {
        self.hierarchy.as_ref()
    }

    /// Whether the Back control should be shown.
    pub fn is_back_visible(&self) -> bool {
        self.zoom.is_drilled_down()
    }

    /// True while something is animating.
    pub fn needs_frame(&self) -> bool {
        !self.transitions.is_idle()
    }

    /// When a held resize becomes due.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.viewport.next_resize_deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{LocationInfo, MapFeature};
    use crate::map::scene::SceneNode;
    use geo_types::{LineString, MultiPolygon, Polygon};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn square(code: &str, county: &str, town: &str, lon: f64, lat: f64, size: f64) -> MapFeature {
        MapFeature::new(
            LocationInfo::new(code, county, town),
            MultiPolygon::new(vec![Polygon::new(
                LineString::from(vec![
                    (lon, lat),
                    (lon + size, lat),
                    (lon + size, lat + size),
                    (lon, lat + size),
                    (lon, lat),
                ]),
                vec![],
            )]),
        )
    }

    fn counties() -> FeatureCollection {
        FeatureCollection::new(vec![
            square("63", "Taipei City", "", 121.5, 25.0, 0.2),
            square("64", "Kaohsiung City", "", 120.3, 22.6, 0.2),
        ])
    }

    fn townships() -> FeatureCollection {
        FeatureCollection::new(vec![
            square("63", "Taipei City", "Daan", 121.5, 25.0, 0.1),
            square("63", "Taipei City", "Xinyi", 121.6, 25.0, 0.1),
            square("64", "Kaohsiung City", "Lingya", 120.3, 22.6, 0.1),
        ])
    }

    fn loaded_session(t0: Instant) -> MapSession {
        let mut session = MapSession::new(MapSettings::default());
        session
            .initialize(ViewportSize::new(960.0, 880.0), t0)
            .unwrap();
        session.load(counties(), townships(), t0);
        session
    }

    fn shape_id(session: &MapSession, class: ShapeClass, key: &str) -> ShapeId {
        session
            .scene()
            .shapes_of(class)
            .find(|s| s.key.to_string() == key)
            .map(|s| s.id)
            .unwrap()
    }

    fn screen_centroid(session: &MapSession, id: ShapeId) -> DVec2 {
        let shape = session.scene().shape(id).unwrap();
        let centroid = session
            .viewport()
            .projection()
            .centroid(&shape.datum.geometry)
            .unwrap();
        session.scene().transform().apply(centroid)
    }

    #[test]
    fn test_national_view_after_load() {
        let t0 = Instant::now();
        let session = loaded_session(t0);

        assert_eq!(session.phase(), DrillPhase::National);
        assert_eq!(*session.zoom(), ZoomState::default());
        assert!(!session.is_back_visible());
        assert_eq!(session.scene().shapes_of(ShapeClass::County).count(), 2);
        assert_eq!(session.scene().shapes_of(ShapeClass::Township).count(), 0);
        assert!(session.hierarchy().unwrap().filtered_townships("").is_empty());
        assert_eq!(session.scene().transform(), ZoomTransform::IDENTITY);
    }

    #[test]
    fn test_drill_down_and_back() {
        let t0 = Instant::now();
        let mut session = loaded_session(t0);
        let taipei = shape_id(&session, ShapeClass::County, "63");

        let bounds = session
            .viewport()
            .projection()
            .bounds(&session.scene().shape(taipei).unwrap().datum.geometry)
            .unwrap();
        let expected = fit_bounds(&bounds, ViewportSize::new(960.0, 880.0), 80.0, 0.9, 25.0);

        assert!(session.click(taipei, t0));
        assert_eq!(session.phase(), DrillPhase::DrillingIn);
        assert!(session.is_back_visible());
        assert_eq!(session.zoom().selected_county_code, "63");
        assert_eq!(session.zoom().current_scale, expected.scale);
        assert!(expected.scale > 1.0 && expected.scale <= 25.0);

        let towns: Vec<_> = session.scene().shapes_of(ShapeClass::Township).collect();
        assert_eq!(towns.len(), 2);
        assert!(towns.iter().all(|s| s.opacity == 0.0 && !s.pointer_events));
        assert!(session
            .scene()
            .shapes_of(ShapeClass::County)
            .all(|s| !s.pointer_events));

        // Halfway: still fading, still not interactive
        session.tick(t0 + ms(375));
        assert_eq!(session.phase(), DrillPhase::DrillingIn);
        assert!(session
            .scene()
            .shapes_of(ShapeClass::Township)
            .all(|s| !s.pointer_events && s.opacity > 0.0 && s.opacity < 1.0));

        session.tick(t0 + ms(750));
        assert_eq!(session.phase(), DrillPhase::CountyDrilled);
        assert_eq!(session.scene().transform(), expected);
        assert!(session
            .scene()
            .shapes_of(ShapeClass::Township)
            .all(|s| s.pointer_events && s.opacity == 1.0));

        // Back
        let t1 = t0 + ms(1000);
        assert!(session.drill_up(t1));
        assert_eq!(session.phase(), DrillPhase::DrillingOut);
        assert_eq!(*session.zoom(), ZoomState::default());
        assert!(!session.is_back_visible());
        assert!(session
            .scene()
            .shapes_of(ShapeClass::Township)
            .all(|s| s.exiting && !s.pointer_events));
        assert!(session
            .scene()
            .shapes_of(ShapeClass::County)
            .all(|s| !s.pointer_events));

        session.tick(t1 + ms(750));
        assert_eq!(session.phase(), DrillPhase::National);
        assert_eq!(session.scene().transform(), ZoomTransform::IDENTITY);
        assert_eq!(session.scene().shapes_of(ShapeClass::Township).count(), 0);
        assert!(session
            .scene()
            .shapes_of(ShapeClass::County)
            .all(|s| s.pointer_events));
        assert!(session.hierarchy().unwrap().filtered_townships("").is_empty());
        assert!(!session.needs_frame());
    }

    #[test]
    fn test_clicks_ignored_while_transient() {
        let t0 = Instant::now();
        let mut session = loaded_session(t0);
        assert!(session.drill_down("63", t0));
        assert_eq!(session.phase(), DrillPhase::DrillingIn);

        assert!(!session.drill_down("64", t0 + ms(100)));
        assert!(!session.drill_up(t0 + ms(100)));
        assert_eq!(session.zoom().selected_county_code, "63");

        session.tick(t0 + ms(750));
        assert!(!session.drill_down("64", t0 + ms(800)));
        assert!(session.drill_up(t0 + ms(800)));
        assert!(!session.drill_down("64", t0 + ms(900)));
    }

    #[test]
    fn test_click_at_uses_hit_test() {
        let t0 = Instant::now();
        let mut session = loaded_session(t0);
        let kaohsiung = shape_id(&session, ShapeClass::County, "64");
        let point = screen_centroid(&session, kaohsiung);

        assert!(!session.click_at(DVec2::new(-50.0, -50.0), t0));
        assert!(session.click_at(point, t0));
        assert_eq!(session.zoom().selected_county_code, "64");
        let towns: Vec<String> = session
            .scene()
            .shapes_of(ShapeClass::Township)
            .map(|s| s.key.to_string())
            .collect();
        assert_eq!(towns, vec!["64/Lingya"]);
    }

    #[test]
    fn test_hover_label_and_highlight() {
        let t0 = Instant::now();
        let mut session = loaded_session(t0);
        let kaohsiung = shape_id(&session, ShapeClass::County, "64");

        session.pointer_move(Some(screen_centroid(&session, kaohsiung)));
        assert_eq!(session.scene().highlighted(), Some(kaohsiung));
        let label = session.scene().label().unwrap();
        assert_eq!(label.text, "Kaohsiung City");
        assert_eq!(label.font_size, 12.0);

        session.pointer_move(None);
        assert_eq!(session.scene().highlighted(), None);
        assert!(session.scene().label().is_none());
    }

    #[test]
    fn test_hover_township_scales_font() {
        let t0 = Instant::now();
        let mut session = loaded_session(t0);
        session.drill_down("63", t0);
        session.tick(t0 + ms(750));

        let daan = shape_id(&session, ShapeClass::Township, "63/Daan");
        session.pointer_move(Some(screen_centroid(&session, daan)));

        let scale = session.zoom().current_scale;
        let label = session.scene().label().unwrap();
        assert_eq!(label.text, "Daan");
        assert!((label.font_size - 12.0 / scale).abs() < 1e-9);
        assert!(matches!(
            session.scene().nodes().last(),
            Some(SceneNode::Label(_))
        ));
    }

    #[test]
    fn test_fading_townships_are_not_hoverable() {
        let t0 = Instant::now();
        let mut session = loaded_session(t0);
        session.drill_down("63", t0);
        session.tick(t0 + ms(100));

        let daan = shape_id(&session, ShapeClass::Township, "63/Daan");
        session.pointer_move(Some(screen_centroid(&session, daan)));
        assert_eq!(session.scene().highlighted(), None);
    }

    #[test]
    fn test_load_before_layout_defers_render() {
        let t0 = Instant::now();
        let mut session = MapSession::new(MapSettings::default());
        let err = session
            .initialize(ViewportSize::new(0.0, 0.0), t0)
            .unwrap_err();
        assert!(matches!(err, MapError::ViewportUnavailable { .. }));

        session.load(counties(), townships(), t0);
        assert!(session.hierarchy().is_some());
        assert_eq!(session.scene().shapes().count(), 0);

        session.resize(ViewportSize::new(960.0, 880.0), t0);
        assert_eq!(session.scene().shapes_of(ShapeClass::County).count(), 2);
    }

    #[test]
    fn test_resize_reapplies_paths() {
        let t0 = Instant::now();
        let mut session = loaded_session(t0);
        let taipei = shape_id(&session, ShapeClass::County, "63");
        let before = session.scene().shape(taipei).unwrap().path.clone();

        session.resize(ViewportSize::new(960.0, 880.0), t0);
        assert_eq!(session.scene().shape(taipei).unwrap().path, before);

        session.resize(ViewportSize::new(1200.0, 900.0), t0 + ms(10));
        let shape = session.scene().shape(taipei).unwrap();
        assert_ne!(shape.path, before);
        assert_eq!(
            shape.path,
            session.viewport().projection().path(&shape.datum.geometry)
        );

        // Burst inside the throttle window lands on the trailing edge
        session.resize(ViewportSize::new(1000.0, 800.0), t0 + ms(20));
        session.resize(ViewportSize::new(1100.0, 850.0), t0 + ms(30));
        assert_eq!(session.viewport().size(), ViewportSize::new(1200.0, 900.0));
        assert!(session.next_wakeup().is_some());

        session.tick(t0 + ms(60));
        assert_eq!(session.viewport().size(), ViewportSize::new(1100.0, 850.0));
        assert_eq!(
            session.viewport().projection().translate,
            DVec2::new(550.0, 425.0)
        );
    }

    #[test]
    fn test_degenerate_county_drills_with_identity() {
        let t0 = Instant::now();
        let mut session = MapSession::new(MapSettings::default());
        session
            .initialize(ViewportSize::new(960.0, 880.0), t0)
            .unwrap();
        let mut counties = counties();
        counties.features.push(std::sync::Arc::new(MapFeature::new(
            LocationInfo::new("99", "Nowhere", ""),
            MultiPolygon::new(vec![]),
        )));
        session.load(counties, townships(), t0);

        let nowhere = shape_id(&session, ShapeClass::County, "99");
        assert!(session.scene().shape(nowhere).unwrap().path.is_none());

        assert!(session.drill_down("99", t0));
        assert_eq!(session.zoom().current_scale, 1.0);
        session.tick(t0 + ms(750));
        assert_eq!(session.scene().transform(), ZoomTransform::IDENTITY);
        assert_eq!(session.phase(), DrillPhase::CountyDrilled);
    }
}
