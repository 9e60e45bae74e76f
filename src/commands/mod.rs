//! Admin action surface: JSON in, `{success, data}` out.

mod config;
mod email;
mod manage;
mod preview;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tracing::warn;

use crate::actions::ActionResponse;
use crate::state::AppState;

/// Every mutating action carries the admin token as `security`.
#[derive(Debug, Deserialize)]
pub struct Secured<T> {
    pub security: String,
    #[serde(flatten)]
    pub body: T,
}

/// Body of actions that take nothing but the token.
#[derive(Debug, Default, Deserialize)]
pub struct Empty {}

fn reply(resp: ActionResponse) -> Response {
    (StatusCode::OK, Json(resp)).into_response()
}

fn denied() -> Response {
    warn!("admin action rejected: bad security token");
    let resp = ActionResponse {
        success: false,
        data: crate::actions::ActionData {
            message: "Permission denied".into(),
            ..Default::default()
        },
    };
    (StatusCode::FORBIDDEN, Json(resp)).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(manage::health))
        .route("/actions/preview", post(preview::preview))
        .route("/actions/test-email", post(email::test_email))
        .route("/actions/test-mail", post(email::test_mail))
        .route("/actions/deactivate", post(manage::deactivate))
        .route("/settings", get(config::show).post(config::update))
        .with_state(state)
}
