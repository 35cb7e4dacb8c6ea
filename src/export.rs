use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use docx_rs::{BreakType, Docx, Paragraph, Run, Style, StyleType};
use std::io::Cursor;
use std::str::FromStr;
use thiserror::Error;

pub const HEADING_STYLE_ID: &str = "Heading1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to serialize document: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Docx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOCX" => Ok(ExportFormat::Docx),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A serialized answer ready to be downloaded
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// `data:` URI carrying the whole file, for client-side download links
    pub fn data_uri(&self) -> String {
        format!("data:file/octet-stream;base64,{}", BASE64_STANDARD.encode(&self.bytes))
    }
}

/// Serialize one question/answer pair.
///
/// `format` is the user-facing format name; only `"DOCX"` is supported.
pub fn export(question: &str, answer: &str, format: &str, file_name: &str) -> Result<ExportedFile, ExportError> {
    let format = ExportFormat::from_str(format)?;

    let bytes = match format {
        ExportFormat::Docx => build_docx(question, answer)?,
    };

    let file_name = format!("{}.{}", file_name, format.extension());
    log::info!("Exported {} ({} bytes)", file_name, bytes.len());

    Ok(ExportedFile {
        file_name,
        format,
        bytes,
    })
}

fn build_docx(question: &str, answer: &str) -> Result<Vec<u8>, ExportError> {
    let heading = Style::new(HEADING_STYLE_ID, StyleType::Paragraph)
        .name("Heading 1")
        .bold()
        .size(32);

    let docx = Docx::new()
        .add_style(heading)
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(question))
                .style(HEADING_STYLE_ID),
        )
        .add_paragraph(Paragraph::new().add_run(multiline_run(answer)));

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| ExportError::Serialization(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// One run with explicit line breaks, since Word ignores `\n` in text
fn multiline_run(text: &str) -> Run {
    let mut run = Run::new();
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    run
}
