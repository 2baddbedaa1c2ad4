//! Summaries and multiple-choice quizzes from PDF text.
//!
//! PDF text extraction sits behind [`PdfBackend`] and text generation behind
//! [`LanguageModel`]; this crate owns the prompts, chunking, retry and
//! response parsing between the two.

pub mod backend;
pub mod chunk;
pub mod config_file;
pub mod gemini;
pub mod model;
pub mod quiz;
pub mod retry;
pub mod summarize;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend, extract_non_empty};
pub use chunk::chunk_text;
pub use config_file::ConfigFile;
pub use gemini::GeminiClient;
pub use model::{GenerateRequest, LanguageModel, ModelError};
pub use quiz::{
    AnswerOption, Difficulty, Question, Quiz, QuizError, QuizSettings, SettingsError, create_quiz,
};
pub use retry::RetryPolicy;
pub use summarize::{
    SummaryError, SummaryOptions, SummaryProgress, generate_summary,
    generate_summary_with_progress, write_summary,
};
