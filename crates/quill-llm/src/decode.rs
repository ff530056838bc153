//! Typed decoding of model output

use serde::de::DeserializeOwned;

use crate::error::{LlmError, preview};
use crate::repair::{balanced_objects, extract, remove_trailing_commas, sanitize};

/// Default number of raw-output bytes carried by decode errors
pub const DEFAULT_PREVIEW_LEN: usize = 512;

/// Sanitize, extract, and deserialize model output into `T`
///
/// When the first-to-last-brace candidate does not decode, the sanitized text
/// is scanned once more for depth-balanced objects and the first one that
/// fits `T` wins.
///
/// # Errors
///
/// Returns `LlmError::NoJsonObject` when the text holds no `{ ... }` span and
/// `LlmError::DecodeFailed` when no candidate decodes. Both carry at most
/// `preview_len` bytes of `raw`.
pub fn decode<T: DeserializeOwned>(raw: &str, preview_len: usize) -> Result<T, LlmError> {
    let sanitized = sanitize(raw);

    let Some(candidate) = extract(&sanitized) else {
        tracing::warn!(preview = %preview(raw, preview_len), "no JSON object in model output");
        return Err(LlmError::NoJsonObject {
            preview: preview(raw, preview_len),
        });
    };

    let first_error = match serde_json::from_str(&candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    tracing::debug!(error = %first_error, "primary extraction did not decode, rescanning");

    for object in balanced_objects(&sanitized) {
        if let Ok(value) = serde_json::from_str(&remove_trailing_commas(object)) {
            tracing::debug!("decoded on fallback extraction");
            return Ok(value);
        }
    }

    let preview = preview(raw, preview_len);
    tracing::warn!(error = %first_error, preview = %preview, "failed to decode model output");

    Err(LlmError::DecodeFailed {
        reason: first_error.to_string(),
        preview,
    })
}
