use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild};

use crate::error::DocumentError;

/// Extract the text of every body paragraph of a DOCX file.
///
/// Each paragraph contributes its text followed by a newline, so empty
/// paragraphs become blank lines. Tables and other non-paragraph content
/// are ignored.
pub fn extract_text_from_docx(bytes: &[u8]) -> Result<String, DocumentError> {
    let docx = read_docx(bytes).map_err(|e| DocumentError::WordError(e.to_string()))?;

    let mut text = String::new();
    let mut paragraph_count = 0;

    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            text.push_str(&paragraph_text(paragraph));
            text.push('\n');
            paragraph_count += 1;
        }
    }

    log::info!("Extracted {} chars from {} DOCX paragraphs", text.len(), paragraph_count);

    Ok(text)
}

/// Concatenate the runs of one paragraph.
///
/// Tabs and line breaks inside a run are kept as `\t` and `\n`.
pub(crate) fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();

    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }

    text
}
