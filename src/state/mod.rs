//! Application state management.
//!
//! Holds the load status shown in the header.

mod settings;

pub use settings::MapSettings;

/// Progress of the session's geometry load.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Load failed; the map stays unrendered
    Failed(String),
}

/// Root application state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub load_status: LoadStatus,

    /// Status message displayed in the header
    pub status_message: String,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            load_status: LoadStatus::Idle,
            status_message: "Ready".to_string(),
        }
    }

    pub fn set_loading(&mut self) {
        self.load_status = LoadStatus::Loading;
        self.status_message = "Loading map data...".to_string();
    }

    pub fn set_loaded(&mut self, counties: usize, townships: usize) {
        self.load_status = LoadStatus::Loaded;
        self.status_message = format!("{} counties, {} townships", counties, townships);
    }

    pub fn set_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.status_message = message.clone();
        self.load_status = LoadStatus::Failed(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let mut state = AppState::new();
        assert_eq!(state.status_message, "Ready");

        state.set_loading();
        assert_eq!(state.load_status, LoadStatus::Loading);

        state.set_loaded(22, 368);
        assert_eq!(state.status_message, "22 counties, 368 townships");

        state.set_failed("Failed to load map data: 404");
        assert!(matches!(state.load_status, LoadStatus::Failed(_)));
        assert_eq!(state.status_message, "Failed to load map data: 404");
    }
}
