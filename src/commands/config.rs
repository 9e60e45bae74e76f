use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{Json, Response};
use serde::Deserialize;

use super::{denied, reply, Secured};
use crate::actions::SettingsUpdate;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub security: String,
}

/// Current settings, API key masked.
pub async fn show(State(state): State<Arc<AppState>>, Query(query): Query<TokenQuery>) -> Response {
    if !state.is_authorized(&query.security) {
        return denied();
    }
    reply(state.actions.settings_view().await)
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Secured<SettingsUpdate>>,
) -> Response {
    if !state.is_authorized(&req.security) {
        return denied();
    }
    reply(state.actions.update_settings(req.body).await)
}
