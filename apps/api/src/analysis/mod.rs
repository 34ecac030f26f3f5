//! Resume analysis pipeline: extract text, pick the prompt, ask GigaChat, unwrap the answer.

use std::sync::Arc;

use anyhow::anyhow;
use bytes::Bytes;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::extraction::TextExtractor;
use crate::llm_client::prompts::PromptType;
use crate::llm_client::response::extract_answer_text;
use crate::llm_client::{GigaChatClient, GigaModel};

#[derive(Clone)]
pub struct ResumeAnalyzer {
    extractor: Arc<TextExtractor>,
    llm: GigaChatClient,
}

impl ResumeAnalyzer {
    pub fn new(extractor: Arc<TextExtractor>, llm: GigaChatClient) -> Self {
        Self { extractor, llm }
    }

    /// Runs one uploaded resume through `prompt_type` on `model` and returns the
    /// model's answer text.
    pub async fn analyze_resume(
        &self,
        bytes: Bytes,
        file_name: &str,
        prompt_type: PromptType,
        model: GigaModel,
    ) -> Result<String, AppError> {
        let extractor = Arc::clone(&self.extractor);
        let name = file_name.to_string();
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes, &name))
            .await
            .map_err(|e| AppError::Internal(anyhow!("text extraction task failed: {e}")))??;

        debug!(
            file_name,
            chars = text.chars().count(),
            "resume text extracted"
        );

        let raw = self
            .llm
            .analyze(&prompt_type.system_prompt(), &text, model.api_name())
            .await?;
        let answer = extract_answer_text(&raw)?;

        info!(
            file_name,
            prompt_type = ?prompt_type,
            model = model.api_name(),
            "resume analysed"
        );
        Ok(answer)
    }
}
