//! Keyed enter/update/exit reconciliation of shapes against features.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::scene::{Scene, Shape, ShapeClass, ShapeId};
use crate::geo::{FeatureKey, MapFeature, MercatorProjection};

/// What to do with a shape after its exit hook ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDisposition {
    /// Remove the shape now.
    Remove,
    /// Keep it (marked as exiting) until someone removes it later.
    Retain,
}

/// Shapes touched by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSummary {
    pub entered: Vec<ShapeId>,
    pub updated: Vec<ShapeId>,
    pub exited: Vec<ShapeId>,
}

/// Reconciles the shapes of `class` against `features`, keyed by feature identity.
///
/// Matching shapes are rebound and re-projected. Features with no shape are
/// appended and passed to `enter`. Shapes with no feature are marked
/// exiting and passed to `exit`, which decides whether they go now. Shapes
/// already exiting never match, so a returning feature gets a fresh shape.
pub fn reconcile<E, X>(
    scene: &mut Scene,
    class: ShapeClass,
    features: &[Arc<MapFeature>],
    projection: &MercatorProjection,
    mut enter: E,
    mut exit: X,
) -> JoinSummary
where
    E: FnMut(&mut Shape),
    X: FnMut(&mut Shape) -> ExitDisposition,
{
    let mut summary = JoinSummary::default();

    // Duplicate keys among existing shapes: the first one wins, the rest exit
    let mut by_key: HashMap<FeatureKey, ShapeId> = HashMap::new();
    let mut unmatched: Vec<ShapeId> = Vec::new();
    for shape in scene.shapes_of(class).filter(|s| !s.exiting) {
        if by_key.contains_key(&shape.key) {
            unmatched.push(shape.id);
        } else {
            by_key.insert(shape.key.clone(), shape.id);
        }
    }

    let mut claimed: HashSet<ShapeId> = HashSet::new();
    for feature in features {
        let key = feature.key();
        let existing = by_key.get(&key).copied().filter(|id| !claimed.contains(id));

        match existing {
            Some(id) => {
                claimed.insert(id);
                if let Some(shape) = scene.shape_mut(id) {
                    shape.datum = Arc::clone(feature);
                    shape.apply_projection(projection);
                }
                summary.updated.push(id);
            }
            None => {
                let id = scene.append_shape(class, Arc::clone(feature), projection);
                if let Some(shape) = scene.shape_mut(id) {
                    enter(shape);
                }
                summary.entered.push(id);
            }
        }
    }

    unmatched.extend(by_key.values().filter(|id| !claimed.contains(*id)));
    unmatched.sort();

    for id in unmatched {
        let disposition = match scene.shape_mut(id) {
            Some(shape) => {
                shape.exiting = true;
                exit(shape)
            }
            None => continue,
        };
        if disposition == ExitDisposition::Remove {
            scene.remove_shape(id);
        }
        summary.exited.push(id);
    }

    log::debug!(
        "Reconciled {} shapes: {} entered, {} updated, {} exited",
        class.class_name(),
        summary.entered.len(),
        summary.updated.len(),
        summary.exited.len()
    );
    summary
}
