use std::sync::Arc;

use slides_core::SlideManager;

/// Router state shared by every handler
pub struct SlidesAxumState {
    pub manager: Arc<SlideManager>,
}

impl Clone for SlidesAxumState {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl SlidesAxumState {
    pub fn new(manager: SlideManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }
}
