use serde::{Deserialize, Serialize};
use std::path::Path;

pub const TEMPERATURE_RANGE: (f32, f32) = (0.1, 1.0);
pub const MAX_TOKENS_RANGE: (u32, u32) = (10, 500);
pub const TOP_P_RANGE: (f32, f32) = (0.0, 1.0);

/// A file as received from the upload form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Lower-cased extension without the leading dot, empty when the name has none
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default()
    }
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
    /// Unix timestamp (UTC) of when the answer was produced
    pub asked_at: i64,
}

impl QaEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Sampling settings for one "get answer" request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: 150,
            top_p: 1.0,
        }
    }
}

impl GenerationConfig {
    /// Builds a config, clamping every value into its slider range
    pub fn clamped(temperature: f32, max_tokens: u32, top_p: f32) -> Self {
        let defaults = Self::default();
        let temperature = if temperature.is_nan() {
            defaults.temperature
        } else {
            temperature.clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1)
        };
        let top_p = if top_p.is_nan() {
            defaults.top_p
        } else {
            top_p.clamp(TOP_P_RANGE.0, TOP_P_RANGE.1)
        };

        Self {
            temperature,
            max_tokens: max_tokens.clamp(MAX_TOKENS_RANGE.0, MAX_TOKENS_RANGE.1),
            top_p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Error,
    Info,
}

/// A message shown to the user on the next render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Decoded image ready to be shown back to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePreview {
    pub caption: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// `data:` URI embedding the original bytes
    pub data_uri: String,
}

/// What the document reader produced for an upload
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    /// Extracted text, possibly empty when the container was malformed
    Text(String),
    /// Images are displayed but yield no text
    Image(ImagePreview),
    /// Unknown extension or undecodable image
    Unreadable,
}

impl DocumentContent {
    pub fn text(&self) -> Option<&str> {
        match self {
            DocumentContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Text that can be asked about: present and non-empty
    pub fn askable_text(&self) -> Option<&str> {
        self.text().filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub file_name: String,
    pub content: DocumentContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_lowercased() {
        let file = UploadedFile::new("Report.PDF", vec![]);
        assert_eq!(file.extension(), "pdf");

        let file = UploadedFile::new("archive.tar.TXT", vec![]);
        assert_eq!(file.extension(), "txt");

        let file = UploadedFile::new("README", vec![]);
        assert_eq!(file.extension(), "");
    }

    #[test]
    fn test_generation_config_clamps() {
        let config = GenerationConfig::clamped(0.0, 9000, 1.5);
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.top_p, 1.0);

        let config = GenerationConfig::clamped(f32::NAN, 0, -1.0);
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.max_tokens, 10);
        assert_eq!(config.top_p, 0.0);
    }

    #[test]
    fn test_askable_text() {
        assert_eq!(DocumentContent::Text("hi".into()).askable_text(), Some("hi"));
        assert_eq!(DocumentContent::Text(String::new()).askable_text(), None);
        assert_eq!(DocumentContent::Unreadable.askable_text(), None);
    }
}
