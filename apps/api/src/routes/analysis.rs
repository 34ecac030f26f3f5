use axum::{
    extract::{Multipart, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::PromptType;
use crate::llm_client::GigaModel;
use crate::state::AppState;

/// Largest accepted upload, applied as the route's body limit.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// POST /api/analysis/resume
///
/// Multipart fields: `file` (required), `promptType` (default `BASE_ANALYSIS`),
/// `gigaModelType` (default `GIGA_CHAT`). Responds with the model's answer as plain text.
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload: Option<Upload> = None;
    let mut prompt_type = PromptType::default();
    let mut model = GigaModel::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("`file` must carry a file name".into()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
                upload = Some(Upload { file_name, bytes });
            }
            Some("promptType") => {
                prompt_type = text_field(field).await?.parse().map_err(AppError::Validation)?;
            }
            Some("gigaModelType") => {
                model = text_field(field).await?.parse().map_err(AppError::Validation)?;
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| AppError::Validation("Missing `file` field".into()))?;
    if upload.bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    info!(
        file_name = %upload.file_name,
        size = upload.bytes.len(),
        prompt_type = ?prompt_type,
        model = model.api_name(),
        "resume analysis requested"
    );

    let answer = state
        .analyzer
        .analyze_resume(upload.bytes, &upload.file_name, prompt_type, model)
        .await?;

    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], answer))
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read form field: {e}")))
}
