use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::routes::multipart::Form;
use crate::api::state::AppState;
use crate::domain::Stack;

pub async fn create_flashcards(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Stack>, ApiError> {
    let (file, _) = Form::read(multipart).await?.single_file()?;
    let text = file.text().await?;
    let stack = state.flashcards.generate(&file.name, &text).await?;
    Ok(Json(stack))
}

pub async fn list_flashcards(State(state): State<AppState>) -> Result<Json<Vec<Stack>>, ApiError> {
    Ok(Json(state.flashcards.list().await?))
}

pub async fn get_flashcards(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Stack>, ApiError> {
    Ok(Json(state.flashcards.get(id).await?))
}

pub async fn edit_flashcards(
    State(state): State<AppState>,
    Json(stack): Json<Stack>,
) -> Result<Json<Stack>, ApiError> {
    Ok(Json(state.flashcards.update(&stack).await?))
}

pub async fn delete_flashcards(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.flashcards.delete(id).await?;
    Ok(Json(json!({ "message": format!("Stack {id} deleted") })))
}
