//! Application State

use research_core::Researcher;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Runs one research call per request; holds the provider and the
    /// tool-server launcher
    pub researcher: Researcher,
}
