use axum::body::Bytes;
use axum::extract::Multipart;
use std::collections::HashMap;

use crate::api::error::ApiError;
use crate::domain::DomainError;
use crate::infrastructure::extract_text;

pub struct UploadedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Extracts the text on the blocking pool; PDF parsing is CPU-bound.
    pub async fn text(&self) -> Result<String, DomainError> {
        let name = self.name.clone();
        let content_type = self.content_type.clone();
        let bytes = self.bytes.clone();
        tokio::task::spawn_blocking(move || extract_text(&name, &content_type, &bytes))
            .await
            .map_err(|e| DomainError::internal(format!("Text extraction failed: {e}")))?
    }
}

/// Parts with a file name are files; the rest are text fields.
pub struct Form {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl Form {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut files = Vec::new();
        let mut fields = HashMap::new();

        while let Some(field) = multipart.next_field().await? {
            let key = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    files.push(UploadedFile {
                        name,
                        content_type,
                        bytes,
                    });
                }
                None => {
                    fields.insert(key, field.text().await?);
                }
            }
        }

        Ok(Self { files, fields })
    }

    pub fn single_file(mut self) -> Result<(UploadedFile, HashMap<String, String>), ApiError> {
        if self.files.is_empty() {
            return Err(ApiError::bad_request("a file is required"));
        }
        let file = self.files.swap_remove(0);
        Ok((file, self.fields))
    }
}
