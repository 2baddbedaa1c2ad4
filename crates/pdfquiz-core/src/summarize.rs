//! Two-stage summarisation: long documents are summarised chunk by chunk,
//! then the segment summaries are condensed into one final summary.

use std::path::Path;

use thiserror::Error;

use crate::chunk::{CHUNK_OVERLAP, CHUNK_SIZE, chunk_text};
use crate::model::{GenerateRequest, LanguageModel, ModelError};
use crate::retry::{RetryPolicy, generate_with_retry};

pub const SEGMENT_SYSTEM_PROMPT: &str = "You are a segment summarizer. Read the following text chunk from a large document. \
Generate a detailed, stand-alone summary for this chunk, retaining all key concepts. \
The summary must be precise and objective. Do not introduce yourself.";

pub const FINAL_SYSTEM_PROMPT: &str = "You are an expert academic assistant. Analyze the provided text from the document \
and generate a comprehensive, clear, and professional summary suitable for study or analysis. \
The summary must be approximately 300 words and focus on key arguments, findings, and conclusions. \
Format the summary as continuous, readable paragraphs.";

/// Separator placed between segment summaries before the final stage.
pub const SEGMENT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("there is no text to summarize")]
    EmptyInput,
    #[error("the model returned an empty summary")]
    EmptySummary,
    #[error("summary of segment {index} of {total} failed: {source}")]
    Segment {
        index: usize,
        total: usize,
        #[source]
        source: ModelError,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("failed to save summary to {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Tunables for [`generate_summary`].
#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retry: RetryPolicy,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            retry: RetryPolicy::default(),
        }
    }
}

/// Progress events emitted while a summary is produced.
#[derive(Debug, Clone)]
pub enum SummaryProgress {
    /// The document was split for two-stage summarisation.
    Chunked { chars: usize, chunks: usize },
    /// Segment `index` (1-based) is being summarised.
    Segment { index: usize, total: usize },
    /// The final summary call has started.
    Final,
}

/// Summarise `text` with `model`.
pub async fn generate_summary(
    model: &dyn LanguageModel,
    text: &str,
    options: &SummaryOptions,
) -> Result<String, SummaryError> {
    generate_summary_with_progress(model, text, options, |_| {}).await
}

/// Summarise `text`, reporting each stage through `progress`.
pub async fn generate_summary_with_progress(
    model: &dyn LanguageModel,
    text: &str,
    options: &SummaryOptions,
    progress: impl Fn(SummaryProgress),
) -> Result<String, SummaryError> {
    if text.trim().is_empty() {
        return Err(SummaryError::EmptyInput);
    }

    let char_count = text.chars().count();
    let final_input = if char_count > options.chunk_size {
        let chunks = chunk_text(text, options.chunk_size, options.chunk_overlap);
        let total = chunks.len();
        tracing::info!(
            chars = char_count,
            chunks = total,
            "document requires two-stage summarization"
        );
        progress(SummaryProgress::Chunked {
            chars: char_count,
            chunks: total,
        });

        let mut segment_summaries = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            let index = i + 1;
            progress(SummaryProgress::Segment { index, total });
            tracing::debug!(index, total, "summarizing segment");

            let request = GenerateRequest::new(
                SEGMENT_SYSTEM_PROMPT,
                format!("Summarize this segment:{SEGMENT_SEPARATOR}{chunk}"),
            )
            .with_grounded_search();
            let summary = generate_with_retry(model, &request, options.retry)
                .await
                .map_err(|source| SummaryError::Segment {
                    index,
                    total,
                    source,
                })?;
            segment_summaries.push(summary);
        }

        segment_summaries.join(SEGMENT_SEPARATOR)
    } else {
        text.to_string()
    };

    progress(SummaryProgress::Final);
    let request = GenerateRequest::new(FINAL_SYSTEM_PROMPT, final_input).with_grounded_search();
    let summary = generate_with_retry(model, &request, options.retry).await?;

    if summary.trim().is_empty() {
        return Err(SummaryError::EmptySummary);
    }

    Ok(summary)
}

/// Write a finished summary to `path`, replacing any previous content.
pub fn write_summary(path: &Path, summary: &str) -> Result<(), SummaryError> {
    std::fs::write(path, summary).map_err(|source| SummaryError::Save {
        path: path.display().to_string(),
        source,
    })
}
