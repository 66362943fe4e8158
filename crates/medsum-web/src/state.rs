use std::sync::Arc;

use medsum_core::AppContext;

/// Shared application state accessible from all handlers.
pub struct AppState {
    /// PDF backend plus the lazily loaded models.
    pub ctx: Arc<AppContext>,
    pub max_upload_mb: u32,
}

impl AppState {
    pub fn new(ctx: AppContext, max_upload_mb: u32) -> Self {
        Self {
            ctx: Arc::new(ctx),
            max_upload_mb,
        }
    }
}
