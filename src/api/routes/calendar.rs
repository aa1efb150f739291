use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CalendarRequest {
    pub question: String,
}

/// Failures are reported in the body with a 200, which the frontend expects.
pub async fn ask_calendar(
    State(state): State<AppState>,
    Json(request): Json<CalendarRequest>,
) -> Json<Value> {
    match state.calendar.ask(&request.question).await {
        Ok(response) => Json(json!({ "response": response })),
        Err(e) => {
            tracing::error!(error = %e, "calendar request failed");
            Json(json!({ "error": e.to_string() }))
        }
    }
}
