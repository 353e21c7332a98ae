//! Recovery of JSON payloads from model responses
//!
//! Models wrap JSON in Markdown fences or prose; only the text between the
//! first `[` and the last `]` is treated as the candidate array.

use serde_json::Value;

use crate::error::GenerationError;

/// Remove a surrounding Markdown code fence (with or without a language tag)
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "json") on the opening fence line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Extract the outermost JSON array from a model response
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, GenerationError> {
    let body = strip_code_fences(text);

    let (Some(start), Some(end)) = (body.find('['), body.rfind(']')) else {
        return Err(GenerationError::NoJsonArray);
    };
    if end < start {
        return Err(GenerationError::NoJsonArray);
    }

    match serde_json::from_str::<Value>(&body[start..=end])? {
        Value::Array(items) => Ok(items),
        other => Err(GenerationError::Shape(format!("expected an array, got {}", other))),
    }
}

/// Extract a JSON array whose elements must all be strings
pub fn extract_string_array(text: &str) -> Result<Vec<String>, GenerationError> {
    extract_json_array(text)?
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(s) => Ok(s),
            other => Err(GenerationError::Shape(format!(
                "element {} is not a string: {}",
                index, other
            ))),
        })
        .collect()
}
