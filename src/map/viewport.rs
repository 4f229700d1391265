//! Viewport size, resize throttling and the projection derived from them.

use glam::DVec2;
use std::time::Duration;
use web_time::Instant;

use crate::error::MapError;
use crate::geo::MercatorProjection;
use crate::state::MapSettings;

/// Content box of the host container, in pixels. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    pub fn new(width: f64, height: f64) -> Self {
        // NaN also collapses to zero
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// True once the host has a usable, non-empty box.
    pub fn is_laid_out(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Collapses a stream of resize signals to at most one per window.
///
/// The first signal of a quiet period passes through immediately; later
/// signals inside the window are held and only the most recent one is
/// emitted when the window closes.
#[derive(Debug, Clone)]
pub struct ResizeThrottle {
    window: Duration,
    last_emit: Option<Instant>,
    pending: Option<ViewportSize>,
}

impl ResizeThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emit: None,
            pending: None,
        }
    }

    /// Records a resize signal. Returns the size to apply now, if any.
    pub fn push(&mut self, size: ViewportSize, now: Instant) -> Option<ViewportSize> {
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.window => {
                self.pending = Some(size);
                None
            }
            _ => {
                self.pending = None;
                self.last_emit = Some(now);
                Some(size)
            }
        }
    }

    /// Emits the held size once its window has closed.
    pub fn poll(&mut self, now: Instant) -> Option<ViewportSize> {
        let deadline = self.next_deadline()?;
        if now < deadline {
            return None;
        }
        self.last_emit = Some(now);
        self.pending.take()
    }

    /// When the held size becomes due, if one is held.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending?;
        Some(match self.last_emit {
            Some(last) => last + self.window,
            None => Instant::now(),
        })
    }
}

/// Owns the viewport size and the projection derived from it.
#[derive(Debug, Clone)]
pub struct ViewportController {
    size: ViewportSize,
    projection: MercatorProjection,
    header_height: f64,
    keep_header_offset_on_resize: bool,
    throttle: ResizeThrottle,
    initialized: bool,
}

impl ViewportController {
    pub fn new(settings: &MapSettings) -> Self {
        Self {
            size: ViewportSize::default(),
            projection: MercatorProjection::new(
                settings.center(),
                settings.projection_scale,
                DVec2::ZERO,
            ),
            header_height: settings.header_height,
            keep_header_offset_on_resize: settings.keep_header_offset_on_resize,
            throttle: ResizeThrottle::new(Duration::from_millis(settings.resize_throttle_ms)),
            initialized: false,
        }
    }

    /// Reads the host box and places the projection center.
    ///
    /// Fails with `ViewportUnavailable` while the host is not laid out; the
    /// controller then stays uninitialized.
    pub fn initialize(&mut self, size: ViewportSize) -> Result<(), MapError> {
        if !size.is_laid_out() {
            return Err(MapError::ViewportUnavailable {
                width: size.width,
                height: size.height,
            });
        }

        self.size = size;
        let translate = DVec2::new(size.width / 2.0, size.height / 2.0 + self.header_height);
        self.projection = self.projection.with_translate(translate);
        self.initialized = true;
        log::debug!(
            "Viewport initialized at {}x{}, translate {:?}",
            size.width,
            size.height,
            translate
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Feeds a resize signal through the throttle.
    ///
    /// Returns true when the projection changed and shapes need new paths.
    pub fn request_resize(&mut self, size: ViewportSize, now: Instant) -> bool {
        if size == self.size && self.throttle.next_deadline().is_none() {
            return false;
        }
        match self.throttle.push(size, now) {
            Some(size) => self.apply_resize(size),
            None => false,
        }
    }

    /// Applies a held resize whose throttle window has closed.
    pub fn poll_resize(&mut self, now: Instant) -> bool {
        match self.throttle.poll(now) {
            Some(size) => self.apply_resize(size),
            None => false,
        }
    }

    pub fn next_resize_deadline(&self) -> Option<Instant> {
        self.throttle.next_deadline()
    }

    fn apply_resize(&mut self, size: ViewportSize) -> bool {
        if !size.is_laid_out() {
            log::debug!("Skipping resize to empty box {}x{}", size.width, size.height);
            return false;
        }
        if !self.initialized {
            return self.initialize(size).is_ok();
        }

        self.size = size;
        let offset = if self.keep_header_offset_on_resize {
            self.header_height
        } else {
            0.0
        };
        let translate = DVec2::new(size.width / 2.0, size.height / 2.0 + offset);
        self.projection = self.projection.with_translate(translate);
        true
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn projection(&self) -> &MercatorProjection {
        &self.projection
    }

    pub fn header_height(&self) -> f64 {
        self.header_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_size_never_negative() {
        let size = ViewportSize::new(-5.0, 300.0);
        assert_eq!(size.width, 0.0);
        assert!(!size.is_laid_out());
        assert!(ViewportSize::new(1.0, 1.0).is_laid_out());
    }

    #[test]
    fn test_throttle_leading_and_trailing() {
        let t0 = Instant::now();
        let mut throttle = ResizeThrottle::new(ms(50));

        let first = ViewportSize::new(800.0, 600.0);
        assert_eq!(throttle.push(first, t0), Some(first));

        // Deluge inside the window is held
        assert_eq!(throttle.push(ViewportSize::new(810.0, 600.0), t0 + ms(10)), None);
        assert_eq!(throttle.push(ViewportSize::new(820.0, 600.0), t0 + ms(20)), None);
        assert_eq!(throttle.poll(t0 + ms(30)), None);
        assert_eq!(throttle.next_deadline(), Some(t0 + ms(50)));

        // Most recent size wins, not an average
        assert_eq!(throttle.poll(t0 + ms(50)), Some(ViewportSize::new(820.0, 600.0)));
        assert_eq!(throttle.poll(t0 + ms(200)), None);
        assert_eq!(throttle.next_deadline(), None);
    }

    #[test]
    fn test_throttle_quiet_period_passes_through() {
        let t0 = Instant::now();
        let mut throttle = ResizeThrottle::new(ms(50));
        throttle.push(ViewportSize::new(800.0, 600.0), t0);

        let later = ViewportSize::new(640.0, 480.0);
        assert_eq!(throttle.push(later, t0 + ms(60)), Some(later));
    }

    #[test]
    fn test_initialize_places_center_below_header() {
        let mut viewport = ViewportController::new(&MapSettings::default());
        viewport.initialize(ViewportSize::new(960.0, 600.0)).unwrap();
        assert_eq!(viewport.projection().translate, DVec2::new(480.0, 380.0));
    }

    #[test]
    fn test_initialize_requires_layout() {
        let mut viewport = ViewportController::new(&MapSettings::default());
        let err = viewport.initialize(ViewportSize::new(0.0, 600.0)).unwrap_err();
        assert!(matches!(err, MapError::ViewportUnavailable { .. }));
        assert!(!viewport.is_initialized());
    }

    #[test]
    fn test_resize_drops_header_offset() {
        let t0 = Instant::now();
        let mut viewport = ViewportController::new(&MapSettings::default());
        viewport.initialize(ViewportSize::new(960.0, 600.0)).unwrap();

        assert!(viewport.request_resize(ViewportSize::new(1000.0, 700.0), t0));
        assert_eq!(viewport.projection().translate, DVec2::new(500.0, 350.0));
    }

    #[test]
    fn test_resize_keeps_header_offset_when_configured() {
        let t0 = Instant::now();
        let settings = MapSettings {
            keep_header_offset_on_resize: true,
            ..MapSettings::default()
        };
        let mut viewport = ViewportController::new(&settings);
        viewport.initialize(ViewportSize::new(960.0, 600.0)).unwrap();

        assert!(viewport.request_resize(ViewportSize::new(1000.0, 700.0), t0));
        assert_eq!(viewport.projection().translate, DVec2::new(500.0, 430.0));
    }

    #[test]
    fn test_resize_before_layout_initializes() {
        let t0 = Instant::now();
        let mut viewport = ViewportController::new(&MapSettings::default());
        assert!(!viewport.request_resize(ViewportSize::new(0.0, 0.0), t0));
        assert!(!viewport.is_initialized());

        assert!(viewport.request_resize(ViewportSize::new(960.0, 600.0), t0 + ms(60)));
        assert!(viewport.is_initialized());
        assert_eq!(viewport.projection().translate, DVec2::new(480.0, 380.0));
    }

    #[test]
    fn test_unchanged_size_is_ignored() {
        let t0 = Instant::now();
        let mut viewport = ViewportController::new(&MapSettings::default());
        viewport.initialize(ViewportSize::new(960.0, 600.0)).unwrap();
        assert!(!viewport.request_resize(ViewportSize::new(960.0, 600.0), t0));
    }
}
