use crate::config::Config;
use crate::services::ModelClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub model: Arc<dyn ModelClient>,
}

impl AppState {
    /// Configuration and model client are fixed at startup; handlers only
    /// ever read them.
    pub fn new(config: Config, model: Arc<dyn ModelClient>) -> Self {
        Self {
            config: Arc::new(config),
            model,
        }
    }
}
