//! Error types for map loading and rendering.

/// Errors that can occur while loading or rendering the map.
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    /// A geometry source could not be read or fetched.
    DataLoad(String),
    /// A geometry source was read but is not a usable topology or feature collection.
    MalformedTopology(String),
    /// The host container has not been laid out yet.
    ViewportUnavailable { width: f64, height: f64 },
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::DataLoad(msg) => write!(f, "Failed to load map data: {}", msg),
            MapError::MalformedTopology(msg) => write!(f, "Malformed topology: {}", msg),
            MapError::ViewportUnavailable { width, height } => {
                write!(f, "Viewport unavailable ({}x{})", width, height)
            }
        }
    }
}

impl std::error::Error for MapError {}
