use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ChatModel;
use crate::storage::ProjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: ProjectStore,
    /// Chat model used for report writing and template authoring.
    pub llm: Arc<dyn ChatModel>,
    pub config: Config,
}
