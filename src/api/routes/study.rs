use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::api::error::ApiError;
use crate::api::routes::multipart::Form;
use crate::api::state::AppState;
use crate::application::{StudyAction, StudyOutcome};

/// `POST /chat`: one study action over one uploaded file.
pub async fn study_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<StudyOutcome>, ApiError> {
    let (file, fields) = Form::read(multipart).await?.single_file()?;
    let action = StudyAction::parse(fields.get("action").map(String::as_str).unwrap_or_default());
    let text = file.text().await?;

    tracing::info!(file = %file.name, ?action, "study action requested");
    Ok(Json(state.study.run(&text, action).await))
}
