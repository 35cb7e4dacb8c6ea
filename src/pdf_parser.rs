use lopdf::Document;

use crate::error::DocumentError;

/// Text pulled from the leading pages of a PDF
#[derive(Debug, Clone)]
pub struct PdfText {
    pub text: String,
    /// Pages whose text was read (at most the page limit)
    pub pages_read: usize,
    /// Total pages in the document
    pub page_count: usize,
}

/// Extract text from the first `page_limit` pages of an in-memory PDF.
///
/// Returns an error only when the container itself cannot be parsed. A page
/// whose content stream cannot be decoded is skipped.
pub fn extract_text_from_pdf(bytes: &[u8], page_limit: usize) -> Result<PdfText, DocumentError> {
    let document = Document::load_mem(bytes).map_err(|e| DocumentError::PdfError(e.to_string()))?;

    let pages = document.get_pages();
    let page_count = pages.len();
    let mut text = String::new();
    let mut pages_read = 0;

    for page_number in pages.keys().copied().take(page_limit) {
        match document.extract_text(&[page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                pages_read += 1;
            }
            Err(e) => {
                log::warn!("Skipping PDF page {}: {}", page_number, e);
            }
        }
    }

    if is_scanned_pdf(&text, pages_read) {
        log::warn!(
            "PDF appears to have no text layer ({} chars over {} pages)",
            text.trim().len(),
            pages_read
        );
    }

    log::info!(
        "Extracted {} chars from {} of {} PDF pages",
        text.len(),
        pages_read,
        page_count
    );

    Ok(PdfText {
        text,
        pages_read,
        page_count,
    })
}

/// Detect if a PDF is scanned (no text layer)
/// Heuristic: If text is very sparse relative to page count, likely scanned
fn is_scanned_pdf(text: &str, page_count: usize) -> bool {
    let text_length = text.trim().len();

    if text_length == 0 {
        return true;
    }

    // A typical page has 1000-3000 characters
    let chars_per_page = text_length / page_count.max(1);
    chars_per_page < 50
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Build a PDF with one line of text per page
    pub(crate) fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for page_text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*page_text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_texts.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_is_scanned_pdf() {
        assert!(is_scanned_pdf("", 1));
        assert!(is_scanned_pdf("ABC", 10));

        let text = "a".repeat(1000);
        assert!(!is_scanned_pdf(&text, 2));
    }

    #[test]
    fn test_malformed_pdf_is_an_error() {
        let result = extract_text_from_pdf(b"This is not a PDF", 5);
        assert!(matches!(result, Err(DocumentError::PdfError(_))));
    }

    #[test]
    fn test_reads_only_leading_pages() {
        let bytes = build_pdf(&[
            "Marker1", "Marker2", "Marker3", "Marker4", "Marker5", "Marker6", "Marker7",
        ]);

        let pdf = extract_text_from_pdf(&bytes, 5).unwrap();
        assert_eq!(pdf.page_count, 7);
        assert_eq!(pdf.pages_read, 5);
        for marker in ["Marker1", "Marker3", "Marker5"] {
            assert!(pdf.text.contains(marker), "missing {marker}");
        }
        assert!(!pdf.text.contains("Marker6"));
        assert!(!pdf.text.contains("Marker7"));
    }

    #[test]
    fn test_short_pdf_reads_all_pages() {
        let bytes = build_pdf(&["Alpha", "Beta"]);

        let pdf = extract_text_from_pdf(&bytes, 5).unwrap();
        assert_eq!(pdf.pages_read, 2);
        assert!(pdf.text.find("Alpha").unwrap() < pdf.text.find("Beta").unwrap());
    }
}
