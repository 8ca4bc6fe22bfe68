//! Upload filename sanitization and image type validation.

use unicode_normalization::UnicodeNormalization;

use crate::error::CoreError;

/// Accepted image extensions (lowercase, without the dot).
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Default upper bound on an uploaded photo (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Reduce a client-supplied filename to a safe, flat ASCII name.
///
/// Accented letters are NFKD-folded to their ASCII base (`é` -> `e`) and
/// other non-ASCII characters dropped. Path separators become spaces,
/// whitespace runs become `_`, anything outside `[A-Za-z0-9_.-]` is
/// dropped, and leading/trailing dots and underscores are trimmed.
/// Returns `None` if nothing usable is left.
pub fn secure_filename(raw: &str) -> Option<String> {
    let flattened: String = raw
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lowercased extension of `filename`, if any.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Sanitize `raw` and check it names a supported image type.
pub fn validate_image_filename(raw: &str) -> Result<String, CoreError> {
    if raw.trim().is_empty() {
        return Err(CoreError::Validation("No selected file".into()));
    }

    let name = secure_filename(raw)
        .ok_or_else(|| CoreError::Validation(format!("Unusable filename '{raw}'")))?;

    match extension(&name) {
        Some(ext) if SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(name),
        Some(ext) => Err(CoreError::Validation(format!(
            "Unsupported image format '.{ext}'. Supported: {SUPPORTED_IMAGE_EXTENSIONS:?}"
        ))),
        None => Err(CoreError::Validation(format!(
            "Filename '{name}' has no extension"
        ))),
    }
}

/// MIME type for a validated image filename.
pub fn content_type_for(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}
