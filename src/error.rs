use thiserror::Error;

/// Failures while turning an upload into text
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: usize, limit: usize },

    #[error("PDF extraction error: {0}")]
    PdfError(String),

    #[error("Word extraction error: {0}")]
    WordError(String),

    #[error("Image decoding error: {0}")]
    ImageError(String),
}
