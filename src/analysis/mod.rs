//! Document analysis pipeline.
//!
//! Turns a PDF file path plus an analysis directive into a natural-language
//! analysis: pages are rasterized to a bounded batch of images and submitted
//! in one request to a vision-capable completion model. Page images are
//! ephemeral; nothing is cached or retried here, and every failure is local
//! to the single call.

mod pdf;

pub use pdf::{page_count, render_pages};

use crate::error::{Result, SvarError};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
};
use base64::Engine;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Analyzes PDF documents with a vision-capable completion model.
pub struct DocumentAnalyzer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_tokens: u32,
    dpi: u32,
    work_dir: PathBuf,
}

impl DocumentAnalyzer {
    /// Create an analyzer rendering into `work_dir` with a bounded request
    /// timeout.
    pub fn new(model: &str, work_dir: &Path, timeout: Duration, dpi: u32, max_tokens: u32) -> Self {
        Self {
            client: create_client_with_timeout(timeout),
            model: model.to_string(),
            max_tokens,
            dpi,
            work_dir: work_dir.to_path_buf(),
        }
    }

    /// Analyze a PDF document and return the analysis text.
    ///
    /// Fails with a descriptive error when the path is missing or not a PDF,
    /// when no pages can be rasterized, or when the completion call errors.
    pub async fn analyze(
        &self,
        pdf_path: &str,
        analysis_type: &str,
        custom_prompt: Option<&str>,
        max_pages: u32,
    ) -> Result<String> {
        if pdf_path.trim().is_empty() {
            return Err(SvarError::InvalidInput(
                "no PDF path provided for analysis".to_string(),
            ));
        }

        let path = Path::new(pdf_path);
        if !path.exists() {
            return Err(SvarError::Analysis(format!(
                "PDF file not found at path: {}",
                pdf_path
            )));
        }
        if !pdf_path.to_lowercase().ends_with(".pdf") {
            return Err(SvarError::InvalidInput(format!(
                "file '{}' is not a PDF; only PDF analysis is supported",
                file_name(path)
            )));
        }

        // Clamp to the document length when the page count is obtainable;
        // otherwise attempt up to max_pages and tolerate a short read.
        let pages_to_render = match page_count(path).await {
            Ok(0) => {
                return Err(SvarError::Analysis(format!(
                    "PDF file {} appears to have 0 pages or could not be read",
                    file_name(path)
                )));
            }
            Ok(total) => total.min(max_pages),
            Err(e) => {
                warn!("Could not determine page count ({}); attempting up to {} pages", e, max_pages);
                max_pages
            }
        };

        let batch_dir = self.work_dir.join(format!("pages-{}", Uuid::new_v4()));
        let rendered = render_pages(path, pages_to_render, self.dpi, &batch_dir).await;

        // Read everything into memory so the batch directory can go away
        // before the (slow) completion call.
        let images = match rendered {
            Ok(files) => {
                let mut encoded = Vec::with_capacity(files.len());
                for file in &files {
                    let bytes = std::fs::read(file)?;
                    encoded.push(base64::engine::general_purpose::STANDARD.encode(bytes));
                }
                let _ = std::fs::remove_dir_all(&batch_dir);
                encoded
            }
            Err(e) => {
                let _ = std::fs::remove_dir_all(&batch_dir);
                return Err(e);
            }
        };

        if images.is_empty() {
            return Err(SvarError::Analysis(format!(
                "could not convert any pages from PDF {}; the file may be empty, corrupted, or password-protected",
                file_name(path)
            )));
        }

        let instruction = instruction_for(analysis_type, custom_prompt);

        info!(
            "Sending {} page image(s) from '{}' for '{}' analysis",
            images.len(),
            file_name(path),
            analysis_type
        );

        self.request_analysis(&instruction, &images).await
    }

    /// Submit one vision request: the instruction plus all page images in
    /// page order, at low detail.
    async fn request_analysis(&self, instruction: &str, images: &[String]) -> Result<String> {
        let mut parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(instruction)
                .build()
                .map_err(|e| SvarError::Analysis(e.to_string()))?
                .into(),
        ];

        for image in images {
            parts.push(
                ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(
                        ImageUrlArgs::default()
                            .url(format!("data:image/png;base64,{}", image))
                            .detail(ImageDetail::Low)
                            .build()
                            .map_err(|e| SvarError::Analysis(e.to_string()))?,
                    )
                    .build()
                    .map_err(|e| SvarError::Analysis(e.to_string()))?
                    .into(),
            );
        }

        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(parts))
            .build()
            .map_err(|e| SvarError::Analysis(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([user_message.into()])
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| SvarError::Analysis(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SvarError::OpenAI(format!("document analysis call failed: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| SvarError::OpenAI("no analysis returned from model".to_string()))
    }
}

/// Select the instruction text for an analysis request.
///
/// A custom prompt always wins. Unrecognized kinds are never dropped
/// silently; they fall back to a generic instruction naming the kind.
fn instruction_for(analysis_type: &str, custom_prompt: Option<&str>) -> String {
    if let Some(prompt) = custom_prompt {
        if !prompt.trim().is_empty() {
            return prompt.to_string();
        }
    }

    match analysis_type {
        "summarize" => {
            "Summarize the content of this document based on the provided pages. \
             Provide a concise overview."
                .to_string()
        }
        "extract_action_items" => {
            "Extract all action items, deadlines, and responsible individuals/teams \
             mentioned in this document based on the provided pages. If none, state \
             that clearly."
                .to_string()
        }
        "sentiment" => {
            "Analyze the overall sentiment of this document based on the provided \
             pages. Is it positive, negative, or neutral? Explain briefly."
                .to_string()
        }
        other => format!(
            "Analyze the content of this document based on the provided pages. \
             The user requested analysis type: '{}'.",
            other
        ),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> DocumentAnalyzer {
        DocumentAnalyzer::new(
            "gpt-4o-mini",
            Path::new("/tmp/svar-test"),
            Duration::from_secs(5),
            100,
            1000,
        )
    }

    #[tokio::test]
    async fn test_missing_file_fails_before_rasterization() {
        let err = analyzer()
            .analyze("/tmp/does_not_exist_anywhere.pdf", "summarize", None, 5)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_non_pdf_extension_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let txt = tmp.path().join("notes.txt");
        std::fs::write(&txt, "plain text").unwrap();

        let err = analyzer()
            .analyze(txt.to_str().unwrap(), "summarize", None, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SvarError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_empty_path_is_rejected() {
        let err = analyzer().analyze("  ", "summarize", None, 5).await.unwrap_err();
        assert!(matches!(err, SvarError::InvalidInput(_)));
    }

    #[test]
    fn test_instruction_selection() {
        assert!(instruction_for("summarize", None).starts_with("Summarize"));
        assert!(instruction_for("extract_action_items", None).contains("action items"));
        assert!(instruction_for("sentiment", None).contains("sentiment"));
    }

    #[test]
    fn test_custom_prompt_overrides_kind() {
        let text = instruction_for("summarize", Some("List every date mentioned."));
        assert_eq!(text, "List every date mentioned.");
    }

    #[test]
    fn test_unknown_kind_is_named_verbatim() {
        let text = instruction_for("translate_to_norwegian", None);
        assert!(text.contains("'translate_to_norwegian'"));
    }
}
