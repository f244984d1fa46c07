//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::coach::core::config::CoachConfig;
use crate::coach::core::errors::CoachResult;
use crate::coach::orchestrator::core::Orchestrator;

/// Shared application state.
pub struct AppState {
    /// Request orchestrator owning every conversation.
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Wrap an existing orchestrator.
    #[must_use]
    pub fn new(orchestrator: Orchestrator) -> Arc<Self> {
        Arc::new(Self {
            orchestrator: Arc::new(orchestrator),
        })
    }

    /// Build the orchestrator and its default backends from config.
    ///
    /// # Errors
    /// Returns an error if the configuration or a backend is invalid.
    pub async fn from_config(config: CoachConfig) -> CoachResult<Arc<Self>> {
        let orchestrator = Orchestrator::from_config(config).await?;
        Ok(Self::new(orchestrator))
    }
}
