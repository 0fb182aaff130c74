//! Admission checks for generation requests.
//!
//! A request that passes validation is turned into a [`GenerationRequest`],
//! which is the only thing the registry accepts.

use thiserror::Error;

pub const MIN_DURATION_SECS: u32 = 5;
pub const MAX_DURATION_SECS: u32 = 300;
pub const DEFAULT_DURATION_SECS: u32 = 30;
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("Prompt must be at most {max} characters, got {len}")]
    PromptTooLong { max: usize, len: usize },

    #[error("Duration must be between 5 and 300 seconds, got {0}")]
    DurationOutOfRange(i64),
}

/// A prompt and duration that were accepted for generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    duration: u32,
}

impl GenerationRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }
}

/// Checks prompt and duration.
///
/// The prompt is trimmed before both the emptiness and the length check,
/// and the trimmed text is what gets stored.
pub fn validate(
    prompt: &str,
    duration: Option<i64>,
    max_prompt_chars: usize,
) -> Result<GenerationRequest, ValidationError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }

    let len = prompt.chars().count();
    if len > max_prompt_chars {
        return Err(ValidationError::PromptTooLong {
            max: max_prompt_chars,
            len,
        });
    }

    let duration = match duration {
        None => DEFAULT_DURATION_SECS,
        Some(d) => u32::try_from(d)
            .ok()
            .filter(|d| (MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(d))
            .ok_or(ValidationError::DurationOutOfRange(d))?,
    };

    Ok(GenerationRequest {
        prompt: prompt.to_string(),
        duration,
    })
}
