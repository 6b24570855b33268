use std::sync::Arc;

use notia::NotiaService;

/// Shared state handed to every handler and to the poller.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NotiaService>,
}

impl AppState {
    pub fn new(service: NotiaService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
