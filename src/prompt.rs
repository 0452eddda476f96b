//! Prompt composition and text-model instructions
//!
//! The image endpoint takes no structured style or size parameters, so both
//! are expressed as descriptive clauses prepended to the user's prompt.
//! Translation and enhancement are plain instructions to the text model that
//! ask for the rewritten text and nothing else.

use crate::types::{AspectRatio, PromptOptions};

/// Build the final prompt sent to the image endpoint
///
/// Layout: optional style prefix (`in the style of {style}. `), then the
/// aspect-ratio clause, then the user's prompt text.
pub fn compose_prompt(prompt: &str, options: &PromptOptions, default_ratio: AspectRatio) -> String {
    let style_prefix = match options.style.as_deref() {
        Some(style) if !style.trim().is_empty() => format!("in the style of {style}. "),
        _ => String::new(),
    };
    let ratio = options.aspect_ratio.unwrap_or(default_ratio);
    format!("{style_prefix}{}{prompt}", ratio.prompt_clause())
}

/// Instruction asking the text model to translate a prompt to English
pub(crate) fn translation_instruction(text: &str) -> String {
    format!("Translate the following text to English, returning only the translated text: \"{text}\"")
}

/// Instruction asking the text model to rewrite a prompt more descriptively
pub(crate) fn enhancement_instruction(text: &str) -> String {
    format!(
        "Improve the following image generation prompt to make it more descriptive and detailed, returning only the improved text. The prompt is: \"{text}\""
    )
}

/// Strip one pair of wrapping double quotes from a model reply
///
/// Text models often echo the quoting used in the instruction; a leading and
/// a trailing quote are each removed independently if present.
pub(crate) fn strip_wrapping_quotes(text: &str) -> &str {
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}
