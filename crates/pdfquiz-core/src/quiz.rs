//! Multiple-choice quiz generation with a structured-output schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::model::{GenerateRequest, LanguageModel, ModelError};
use crate::retry::{RetryPolicy, generate_with_retry};

pub const DEFAULT_NUM_QUESTIONS: u32 = 5;
pub const MAX_NUM_QUESTIONS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(SettingsError::Difficulty(other.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("number of questions must be a whole number, got {0:?}")]
    NotANumber(String),
    #[error("number of questions must be between 1 and {}, got {}", MAX_NUM_QUESTIONS, .0)]
    OutOfRange(u32),
    #[error("unknown difficulty {0:?} (expected easy, medium or hard)")]
    Difficulty(String),
}

/// User-chosen quiz parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    pub num_questions: u32,
    pub difficulty: Difficulty,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            num_questions: DEFAULT_NUM_QUESTIONS,
            difficulty: Difficulty::default(),
        }
    }
}

impl QuizSettings {
    pub fn new(num_questions: u32, difficulty: Difficulty) -> Result<Self, SettingsError> {
        if num_questions == 0 || num_questions > MAX_NUM_QUESTIONS {
            return Err(SettingsError::OutOfRange(num_questions));
        }
        Ok(Self {
            num_questions,
            difficulty,
        })
    }

    /// Parse raw form values. Missing or blank fields take the defaults.
    pub fn from_form(
        num_questions: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Self, SettingsError> {
        let num_questions = match num_questions.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| SettingsError::NotANumber(raw.to_string()))?,
            None => DEFAULT_NUM_QUESTIONS,
        };
        let difficulty = match difficulty.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse()?,
            None => Difficulty::default(),
        };
        Self::new(num_questions, difficulty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quiz {
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Number questions 1..=n in their current order.
    pub fn renumber(&mut self) {
        for (i, q) in self.questions.iter_mut().enumerate() {
            q.question_number = i as u32 + 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Question {
    #[serde(deserialize_with = "null_as_default")]
    pub question_number: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub question: String,
    #[serde(deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub answer_options: Vec<AnswerOption>,
    #[serde(deserialize_with = "null_as_default")]
    pub hint: String,
}

impl Question {
    /// Index of the first option flagged correct.
    pub fn correct_option(&self) -> Option<usize> {
        self.answer_options.iter().position(|o| o.is_correct)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnswerOption {
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub rationale: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_correct: bool,
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("source content for quiz generation is empty")]
    EmptySource,
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Response schema handed to the model for structured output.
pub fn quiz_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "questionNumber": { "type": "INTEGER" },
                        "question": { "type": "STRING" },
                        "imageUrl": { "type": "STRING" },
                        "answerOptions": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "text": { "type": "STRING" },
                                    "rationale": { "type": "STRING" },
                                    "isCorrect": { "type": "BOOLEAN" }
                                }
                            }
                        },
                        "hint": { "type": "STRING" }
                    },
                    "propertyOrdering": ["questionNumber", "question", "imageUrl", "answerOptions", "hint"]
                }
            }
        },
        "propertyOrdering": ["questions"]
    })
}

pub fn system_prompt(settings: &QuizSettings) -> String {
    format!(
        "You are a test generator. Your task is to create exactly **{n}** multiple-choice questions (MCQs) \
with 4 options each, based *only* on the content provided by the user. \
The difficulty level for these questions must be **{d}**. \
Ensure the questions cover key facts, concepts, and conclusions from the text. \
For each question, provide a detailed rationale for every option and set exactly one option as correct. \
The questions should test comprehension and critical thinking, not just simple recall. \
Set the 'imageUrl' property to an empty string. The output MUST strictly follow the provided JSON schema.",
        n = settings.num_questions,
        d = settings.difficulty,
    )
}

pub fn user_query(source: &str) -> String {
    format!("Generate a quiz based on the following text:\n\n---\n\n{source}")
}

/// Parse model output into a [`Quiz`].
///
/// Malformed JSON or a missing `questions` array yields an empty quiz rather
/// than an error. Individual questions that do not match the schema are
/// skipped. The rest are renumbered sequentially.
pub fn parse_quiz(raw: &str) -> Quiz {
    let body = strip_code_fence(raw.trim());

    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "model returned malformed quiz JSON");
            return Quiz::default();
        }
    };

    let Some(items) = value.get("questions").and_then(Value::as_array) else {
        tracing::warn!("quiz JSON has no questions array");
        return Quiz::default();
    };

    let mut quiz = Quiz {
        questions: items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match Question::deserialize(item) {
                Ok(q) => Some(q),
                Err(e) => {
                    tracing::warn!(index = i, error = %e, "skipping malformed quiz question");
                    None
                }
            })
            .collect(),
    };
    quiz.renumber();
    quiz
}

/// Remove a surrounding markdown code fence, if any.
fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Ask `model` for a quiz over `source`.
pub async fn create_quiz(
    model: &dyn LanguageModel,
    source: &str,
    settings: &QuizSettings,
    retry: RetryPolicy,
) -> Result<Quiz, QuizError> {
    if source.trim().is_empty() {
        return Err(QuizError::EmptySource);
    }

    tracing::info!(
        questions = settings.num_questions,
        difficulty = %settings.difficulty,
        "generating quiz"
    );

    let request =
        GenerateRequest::new(system_prompt(settings), user_query(source)).with_schema(quiz_schema());
    let raw = generate_with_retry(model, &request, retry).await?;
    let quiz = parse_quiz(&raw);

    tracing::debug!(questions = quiz.questions.len(), "quiz parsed");
    Ok(quiz)
}
