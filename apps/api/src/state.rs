use std::sync::Arc;

use crate::backend_client::{LibrarySource, RulesEngine};
use crate::preview::registry::SessionRegistry;
use crate::preview::session::OrchestratorConfig;
use crate::variants::store::VariantStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Debounce window and override capability handed to every new session.
    pub orchestrator: OrchestratorConfig,
    pub library: Arc<dyn LibrarySource>,
    pub engine: Arc<dyn RulesEngine>,
    pub variants: Arc<dyn VariantStore>,
    pub sessions: Arc<SessionRegistry>,
}
