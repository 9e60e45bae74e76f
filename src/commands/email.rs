use std::sync::Arc;

use axum::extract::State;
use axum::response::{Json, Response};

use super::{denied, reply, Empty, Secured};
use crate::state::AppState;

/// Run every configured URL and mail the digest right away.
pub async fn test_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Secured<Empty>>,
) -> Response {
    if !state.is_authorized(&req.security) {
        return denied();
    }
    reply(state.actions.send_test_digest().await)
}

/// Check mail delivery alone.
pub async fn test_mail(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Secured<Empty>>,
) -> Response {
    if !state.is_authorized(&req.security) {
        return denied();
    }
    reply(state.actions.send_mail_check().await)
}
