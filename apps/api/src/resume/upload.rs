//! Resume file uploads: multipart form → plain text for the parse task.

use axum::extract::Multipart;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::orchestrator::ProviderPreference;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug)]
pub struct ResumeUpload {
    pub user_id: Uuid,
    pub preference: ProviderPreference,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Reads the `user_id`, optional `provider_preference` and `file` parts.
pub async fn read_upload(mut multipart: Multipart) -> Result<ResumeUpload, AppError> {
    let mut user_id = None;
    let mut preference = ProviderPreference::Auto;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid user_id: {e}")))?;
                let id = Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::Validation("user_id must be a UUID".to_string()))?;
                user_id = Some(id);
            }
            "provider_preference" => {
                let raw = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Invalid provider_preference: {e}"))
                })?;
                preference = serde_json::from_value(serde_json::Value::String(
                    raw.trim().to_lowercase(),
                ))
                .map_err(|_| {
                    AppError::Validation(
                        "provider_preference must be auto, gemini or openai".to_string(),
                    )
                })?;
            }
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read file: {e}")))?;
                file = Some((file_name, content_type, data));
            }
            other => debug!("Ignoring multipart field '{other}'"),
        }
    }

    let user_id =
        user_id.ok_or_else(|| AppError::Validation("user_id field is required".to_string()))?;
    let (file_name, content_type, data) =
        file.ok_or_else(|| AppError::Validation("file field is required".to_string()))?;

    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "Uploaded file exceeds {} MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    Ok(ResumeUpload {
        user_id,
        preference,
        file_name,
        content_type,
        data,
    })
}

/// Extracts text from a PDF or plain-text upload.
pub fn extract_text(upload: &ResumeUpload) -> Result<String, AppError> {
    let text = if is_pdf(upload) {
        pdf_extract::extract_text_from_mem(&upload.data)
            .map_err(|e| AppError::Validation(format!("Could not read PDF: {e}")))?
    } else if is_plain_text(upload) {
        String::from_utf8(upload.data.to_vec())
            .map_err(|_| AppError::Validation("Text file is not valid UTF-8".to_string()))?
    } else {
        return Err(AppError::Validation(
            "Unsupported file type. Upload a PDF or a .txt file".to_string(),
        ));
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation(
            "No text could be extracted from the file".to_string(),
        ));
    }
    Ok(text)
}

fn is_pdf(upload: &ResumeUpload) -> bool {
    upload.data.starts_with(b"%PDF")
        || upload.content_type.as_deref() == Some("application/pdf")
        || has_extension(upload, ".pdf")
}

fn is_plain_text(upload: &ResumeUpload) -> bool {
    upload
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("text/plain"))
        || has_extension(upload, ".txt")
}

fn has_extension(upload: &ResumeUpload, ext: &str) -> bool {
    upload
        .file_name
        .as_deref()
        .is_some_and(|name| name.to_ascii_lowercase().ends_with(ext))
}
