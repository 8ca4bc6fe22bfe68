//! Recipe prompt loading.

use std::path::Path;

/// Default location of the prompt file, relative to the working directory.
pub const DEFAULT_PROMPT_PATH: &str = "prompt.txt";

/// Read the recipe prompt from `path`.
///
/// A missing or unreadable file is not fatal: the model is then asked with
/// an empty text part, and the problem is logged.
pub async fn load_prompt(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(prompt) => {
            tracing::info!(path = %path.display(), "Personalised prompt loaded");
            prompt
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Error reading prompt file");
            String::new()
        }
    }
}
