//! Map rendering and interaction engine.
//!
//! - `viewport`: host size, resize throttling and the derived projection
//! - `hierarchy`: county/township feature index
//! - `scene`: retained scene graph and hit testing
//! - `reconcile`: keyed enter/update/exit of shapes
//! - `transition`: timed fades and zooms with completion callbacks
//! - `overlay`: the hover info label
//! - `session`: drill-down state machine tying the above together

mod hierarchy;
mod overlay;
mod reconcile;
mod scene;
mod session;
mod transition;
mod viewport;

pub use scene::{InfoLabel, Scene, SceneNode, Shape, ShapeClass, ZoomTransform};
pub use session::{DrillPhase, MapSession};
pub use viewport::ViewportSize;
