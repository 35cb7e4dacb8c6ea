use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::docx::extract_text_from_docx;
use crate::error::DocumentError;
use crate::models::{DocumentContent, ImagePreview, Notice, UploadedFile};
use crate::pdf_parser::extract_text_from_pdf;

/// Extensions accepted by the upload form
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["pdf", "docx", "txt", "png", "jpg", "jpeg"];

/// Turns uploads into text.
///
/// Failures never propagate: they are pushed onto the caller's notices and
/// the read degrades to empty text (malformed PDF/DOCX) or to
/// [`DocumentContent::Unreadable`] (unknown type, bad image).
#[derive(Debug, Clone)]
pub struct DocumentReader {
    pdf_page_limit: usize,
    max_upload_bytes: usize,
}

impl DocumentReader {
    pub fn new(pdf_page_limit: usize, max_upload_bytes: usize) -> Self {
        Self {
            pdf_page_limit,
            max_upload_bytes,
        }
    }

    pub fn read(&self, file: &UploadedFile, extension: &str, notices: &mut Vec<Notice>) -> DocumentContent {
        log::info!(
            "Reading upload {:?} ({} bytes, extension {:?})",
            file.name,
            file.bytes.len(),
            extension
        );

        if file.bytes.len() > self.max_upload_bytes {
            let error = DocumentError::FileTooLarge {
                size: file.bytes.len(),
                limit: self.max_upload_bytes,
            };
            log::warn!("{}", error);
            notices.push(Notice::error(error.to_string()));
            return DocumentContent::Unreadable;
        }

        match extension {
            "pdf" => self.read_pdf(&file.bytes, notices),
            "docx" => read_docx(&file.bytes, notices),
            "txt" => read_txt(&file.bytes),
            "png" | "jpg" | "jpeg" => read_image(&file.bytes, notices),
            other => {
                log::warn!("{}", DocumentError::UnsupportedFileType(other.to_string()));
                notices.push(Notice::error("Unsupported file format"));
                DocumentContent::Unreadable
            }
        }
    }

    fn read_pdf(&self, bytes: &[u8], notices: &mut Vec<Notice>) -> DocumentContent {
        match extract_text_from_pdf(bytes, self.pdf_page_limit) {
            Ok(pdf) => DocumentContent::Text(pdf.text),
            Err(e) => {
                log::error!("{}", e);
                notices.push(Notice::error("Unsupported PDF format"));
                DocumentContent::Text(String::new())
            }
        }
    }
}

impl Default for DocumentReader {
    fn default() -> Self {
        let config = crate::config::AppConfig::default();
        Self::new(config.pdf_page_limit, config.max_upload_bytes)
    }
}

fn read_docx(bytes: &[u8], notices: &mut Vec<Notice>) -> DocumentContent {
    match extract_text_from_docx(bytes) {
        Ok(text) => DocumentContent::Text(text),
        Err(e) => {
            log::error!("{}", e);
            notices.push(Notice::error("Unsupported Word document format"));
            DocumentContent::Text(String::new())
        }
    }
}

fn read_txt(bytes: &[u8]) -> DocumentContent {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::warn!("Text upload is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    };
    DocumentContent::Text(text)
}

fn read_image(bytes: &[u8], notices: &mut Vec<Notice>) -> DocumentContent {
    match decode_image(bytes) {
        Ok(preview) => {
            log::info!("Decoded {} image {}x{}", preview.mime_type, preview.width, preview.height);
            DocumentContent::Image(preview)
        }
        Err(e) => {
            log::error!("{}", e);
            notices.push(Notice::error(format!(
                "An error occurred while reading the image: {}",
                e
            )));
            DocumentContent::Unreadable
        }
    }
}

fn decode_image(bytes: &[u8]) -> Result<ImagePreview, DocumentError> {
    let format = image::guess_format(bytes).map_err(|e| DocumentError::ImageError(e.to_string()))?;
    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(|e| DocumentError::ImageError(e.to_string()))?;
    let mime_type = format.to_mime_type().to_string();

    Ok(ImagePreview {
        caption: "Uploaded Image".to_string(),
        width: decoded.width(),
        height: decoded.height(),
        data_uri: format!("data:{};base64,{}", mime_type, BASE64_STANDARD.encode(bytes)),
        mime_type,
    })
}
