use std::sync::Arc;

use axum::extract::State;
use axum::response::{Json, Response};

use super::{denied, reply, Empty, Secured};
use crate::actions::{ActionData, ActionResponse};
use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

/// Cancel the schedule and clear cached summaries.
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Secured<Empty>>,
) -> Response {
    if !state.is_authorized(&req.security) {
        return denied();
    }
    let resp = match state.deactivate().await {
        Ok(()) => ActionResponse {
            success: true,
            data: ActionData {
                message: "Schedule cancelled and cached summaries cleared".into(),
                ..Default::default()
            },
        },
        Err(e) => e.into(),
    };
    reply(resp)
}
