use std::sync::Arc;

use axum::extract::State;
use axum::response::{Json, Response};
use serde::Deserialize;
use tracing::info;

use super::{denied, reply, Secured};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PreviewBody {
    /// Preview just this URL instead of the configured list.
    #[serde(default)]
    pub url: Option<String>,
}

/// Fetch and summarize now, without mailing anything.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Secured<PreviewBody>>,
) -> Response {
    if !state.is_authorized(&req.security) {
        return denied();
    }
    info!(url = ?req.body.url, "preview requested");
    reply(state.actions.preview(req.body.url.as_deref()).await)
}
