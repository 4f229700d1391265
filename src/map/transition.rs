//! Timed view transitions with completion callbacks.
//!
//! A transition is started with one of the `begin_*` calls, which returns a
//! handle. Follow-up effects are attached with [`TransitionController::on_complete`]
//! and run from [`TransitionController::tick`] once the transition has
//! reached its end state.

use std::time::Duration;
use web_time::Instant;

use super::scene::{Scene, ShapeId, ZoomTransform};
use super::viewport::ViewportSize;
use crate::geo::ScreenBounds;

/// Identifies one running transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionHandle(u64);

/// Follow-up effect run against the scene when a transition completes.
pub type Completion = Box<dyn FnOnce(&mut Scene)>;

enum TransitionKind {
    /// Opacity of a set of shapes, each from its own starting value.
    Fade {
        targets: Vec<(ShapeId, f32)>,
        to: f32,
    },
    /// The root group transform.
    Transform {
        from: ZoomTransform,
        to: ZoomTransform,
    },
}

struct ActiveTransition {
    handle: TransitionHandle,
    kind: TransitionKind,
    start: Instant,
    callbacks: Vec<Completion>,
}

impl ActiveTransition {
    fn apply(&self, scene: &mut Scene, t: f64) {
        match &self.kind {
            TransitionKind::Fade { targets, to } => {
                for (id, from) in targets {
                    if let Some(shape) = scene.shape_mut(*id) {
                        shape.opacity = if t >= 1.0 {
                            *to
                        } else {
                            from + (to - from) * t as f32
                        };
                    }
                }
            }
            TransitionKind::Transform { from, to } => {
                // Land exactly on the target
                scene.set_transform(if t >= 1.0 { *to } else { from.lerp(to, t) });
            }
        }
    }
}

/// Drives fixed-duration transitions on the scene.
pub struct TransitionController {
    duration: Duration,
    active: Vec<ActiveTransition>,
    next: u64,
}

impl std::fmt::Debug for TransitionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionController")
            .field("duration", &self.duration)
            .field("active", &self.active.len())
            .finish()
    }
}

impl TransitionController {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            active: Vec::new(),
            next: 0,
        }
    }

    fn start(&mut self, kind: TransitionKind, now: Instant) -> TransitionHandle {
        let handle = TransitionHandle(self.next);
        self.next += 1;
        self.active.push(ActiveTransition {
            handle,
            kind,
            start: now,
            callbacks: Vec::new(),
        });
        handle
    }

    /// Starts fading the given shapes from their current opacity to `to`.
    pub fn begin_fade(
        &mut self,
        scene: &Scene,
        ids: &[ShapeId],
        to: f32,
        now: Instant,
    ) -> TransitionHandle {
        let targets = ids
            .iter()
            .filter_map(|id| scene.shape(*id).map(|s| (*id, s.opacity)))
            .collect();
        self.start(TransitionKind::Fade { targets, to }, now)
    }

    /// Starts moving the root transform from its current value to `to`.
    ///
    /// A transform transition already in flight is interrupted: it stops
    /// where it is and its completion callbacks never run.
    pub fn begin_transform(
        &mut self,
        scene: &Scene,
        to: ZoomTransform,
        now: Instant,
    ) -> TransitionHandle {
        let before = self.active.len();
        self.active
            .retain(|a| !matches!(a.kind, TransitionKind::Transform { .. }));
        if self.active.len() != before {
            log::debug!("Interrupted running zoom transition");
        }

        let from = scene.transform();
        self.start(TransitionKind::Transform { from, to }, now)
    }

    /// Registers a callback for when `handle` completes.
    ///
    /// Returns false (and drops the callback) if the handle is not running.
    pub fn on_complete(
        &mut self,
        handle: TransitionHandle,
        callback: impl FnOnce(&mut Scene) + 'static,
    ) -> bool {
        match self.active.iter_mut().find(|a| a.handle == handle) {
            Some(active) => {
                active.callbacks.push(Box::new(callback));
                true
            }
            None => false,
        }
    }

    /// Advances every transition to `now`.
    ///
    /// Finished transitions are set to their end state, their callbacks run
    /// in registration order, and their handles are returned in start order.
    pub fn tick(&mut self, scene: &mut Scene, now: Instant) -> Vec<TransitionHandle> {
        let mut finished = Vec::new();
        let mut running = Vec::with_capacity(self.active.len());

        for active in std::mem::take(&mut self.active) {
            let t = self.progress(active.start, now);
            active.apply(scene, ease_cubic_in_out(t));
            if t >= 1.0 {
                finished.push(active);
            } else {
                running.push(active);
            }
        }
        self.active = running;

        let mut handles = Vec::with_capacity(finished.len());
        for active in finished {
            for callback in active.callbacks {
                callback(&mut *scene);
            }
            handles.push(active.handle);
        }
        handles
    }

    fn progress(&self, start: Instant, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn is_running(&self, handle: TransitionHandle) -> bool {
        self.active.iter().any(|a| a.handle == handle)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }
}

/// Cubic ease-in-out: accelerates through the first half, decelerates through the second.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}

/// Transform that fits `bounds` into `fit_ratio` of the area below the header.
///
/// The scale is clamped to `[1, max_scale]`; a zero-area box zooms to the
/// maximum and an unusable viewport yields scale 1.
pub fn fit_bounds(
    bounds: &ScreenBounds,
    size: ViewportSize,
    header_height: f64,
    fit_ratio: f64,
    max_scale: f64,
) -> ZoomTransform {
    let available_height = size.height - header_height;
    let ratio = (bounds.width() / size.width).max(bounds.height() / available_height);

    let scale = fit_ratio / ratio;
    let scale = if scale.is_nan() { 1.0 } else { scale };
    let scale = scale.min(max_scale).max(1.0);

    let center = bounds.center();
    ZoomTransform::new(
        glam::DVec2::new(
            size.width / 2.0 - scale * center.x,
            available_height / 2.0 - scale * center.y + header_height,
        ),
        scale,
    )
}
