use std::sync::Arc;

use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tracing::info;

use crate::actions::Actions;
use crate::error::Result;
use crate::schedule::Scheduler;

pub struct AppState {
    pub actions: Arc<Actions>,
    admin_token: String,
    scheduler: Mutex<Option<Scheduler>>,
}

impl AppState {
    pub fn new(actions: Arc<Actions>, admin_token: String, scheduler: Option<Scheduler>) -> Self {
        Self {
            actions,
            admin_token,
            scheduler: Mutex::new(scheduler),
        }
    }

    /// Stands in for the host's permission check on every admin action.
    pub fn is_authorized(&self, token: &str) -> bool {
        !self.admin_token.is_empty()
            && bool::from(token.as_bytes().ct_eq(self.admin_token.as_bytes()))
    }

    /// Stop the recurring jobs. Cached summaries are kept.
    pub async fn stop(&self) {
        if let Some(scheduler) = self.scheduler.lock().await.take() {
            scheduler.shutdown();
        }
    }

    /// Stop the recurring jobs and drop every cached summary. Safe to call twice.
    pub async fn deactivate(&self) -> Result<()> {
        self.stop().await;
        self.actions.clear_cache().await?;
        info!("deactivated: schedule cancelled, cached summaries cleared");
        Ok(())
    }
}
