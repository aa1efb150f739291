use axum::{
    extract::{Multipart, State},
    Json,
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::routes::multipart::Form;
use crate::api::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

pub async fn upload_documents(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = Form::read(multipart).await?;
    if form.files.is_empty() {
        return Err(ApiError::bad_request("at least one file is required"));
    }

    // Files are indexed concurrently; messages keep upload order.
    let message = try_join_all(form.files.iter().map(|file| {
        let documents = state.documents.clone();
        async move {
            let text = file.text().await?;
            let report = documents
                .ingest(&file.name, &file.content_type, &text)
                .await?;
            Ok::<_, ApiError>(report.message())
        }
    }))
    .await?;

    Ok(Json(UploadResponse {
        status: "success",
        message,
    }))
}

pub async fn ask_documents(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("question must not be empty"));
    }
    let answer = state.rag.answer(&request.question).await?;
    Ok(Json(AskResponse { answer }))
}
