use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque identifier of one unit of remote work.
///
/// Backends hand these out at submission time; the protocol never
/// interprets the contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for JobHandle {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Reference to the image a job should read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRef {
    /// An independently fetchable URL (possibly carrying an expiring token).
    Url(String),
    /// Base64-encoded image bytes of type `mime`, sent inline.
    Base64 { data: String, mime: String },
}

impl InputRef {
    /// Render as a URL accepted by vision models (`data:` URL for inline bytes).
    pub fn to_image_url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Base64 { data, mime } => format!("data:{mime};base64,{data}"),
        }
    }
}
