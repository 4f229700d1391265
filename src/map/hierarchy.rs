//! County/township feature index.

use std::sync::Arc;

use crate::geo::{FeatureCollection, MapFeature};

/// The two feature levels loaded for a session.
#[derive(Debug, Clone, Default)]
pub struct FeatureHierarchy {
    counties: FeatureCollection,
    townships: FeatureCollection,
}

impl FeatureHierarchy {
    pub fn new(counties: FeatureCollection, townships: FeatureCollection) -> Self {
        Self {
            counties,
            townships,
        }
    }

    pub fn counties(&self) -> &[Arc<MapFeature>] {
        &self.counties.features
    }

    /// Townships belonging to `county_code`, in load order.
    ///
    /// An empty code selects nothing.
    pub fn filtered_townships(&self, county_code: &str) -> Vec<Arc<MapFeature>> {
        if county_code.is_empty() {
            return Vec::new();
        }
        self.townships
            .features
            .iter()
            .filter(|f| f.info.county_code == county_code)
            .cloned()
            .collect()
    }

    /// First county feature with the given code.
    pub fn county(&self, county_code: &str) -> Option<&Arc<MapFeature>> {
        self.counties
            .features
            .iter()
            .find(|f| f.info.county_code == county_code)
    }
}
