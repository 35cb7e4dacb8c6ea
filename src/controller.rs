use std::sync::Arc;

use crate::config::AppConfig;
use crate::export::{export, ExportError, ExportedFile};
use crate::generator::AnswerGenerator;
use crate::models::{GenerationConfig, LoadedDocument, Notice, QaEntry, UploadedFile};
use crate::reader::DocumentReader;
use crate::session::{LatestAnswer, SessionState};

pub const EXPORT_FORMAT: &str = "DOCX";

/// Result of answering one question, before it is applied to a session
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub entry: QaEntry,
    pub export: Option<ExportedFile>,
    pub notices: Vec<Notice>,
}

/// Document text captured when a question is asked
#[derive(Debug, Clone)]
pub struct PendingQuestion {
    pub text: String,
    /// `SessionState::document_revision` at the time of asking
    pub revision: u64,
}

/// Orchestrates the upload / ask / curate flow against a session.
///
/// Every user action is one method taking the session explicitly; nothing
/// here holds state of its own besides the shared collaborators.
pub struct QaController {
    reader: DocumentReader,
    generator: Arc<AnswerGenerator>,
    chunk_size: usize,
    export_file_name: String,
}

impl QaController {
    pub fn new(reader: DocumentReader, generator: Arc<AnswerGenerator>, chunk_size: usize, export_file_name: String) -> Self {
        Self {
            reader,
            generator,
            chunk_size,
            export_file_name,
        }
    }

    pub fn from_config(config: &AppConfig, generator: Arc<AnswerGenerator>) -> Self {
        Self::new(
            DocumentReader::new(config.pdf_page_limit, config.max_upload_bytes),
            generator,
            config.chunk_size,
            config.export_file_name.clone(),
        )
    }

    /// Read an upload without touching any session.
    ///
    /// Extraction can be slow, so callers run this before taking the
    /// session lock and store the result with [`Self::apply_upload`].
    pub fn load(&self, file: UploadedFile) -> (LoadedDocument, Vec<Notice>) {
        let extension = file.extension();
        let mut notices = Vec::new();
        let content = self.reader.read(&file, &extension, &mut notices);

        if content.askable_text().is_none() {
            log::warn!("Upload {:?} produced no text to ask about", file.name);
        }

        let document = LoadedDocument {
            file_name: file.name,
            content,
        };
        (document, notices)
    }

    /// Make a loaded document the session's current one.
    ///
    /// The previous answer is cleared; history and favorites are kept.
    pub fn apply_upload(session: &mut SessionState, document: LoadedDocument, notices: Vec<Notice>) {
        session.set_document(document);
        session.notices.extend(notices);
    }

    /// Read an upload and make it the session's current document
    pub fn upload(&self, session: &mut SessionState, file: UploadedFile) {
        let (document, notices) = self.load(file);
        Self::apply_upload(session, document, notices);
    }

    /// Text of the current document if questions can be asked about it
    pub fn askable_text(session: &SessionState) -> Option<String> {
        session
            .document
            .as_ref()
            .and_then(|doc| doc.content.askable_text())
            .map(str::to_string)
    }

    /// Generate an answer over `text` and prepare its export.
    ///
    /// Runs without access to the session so callers can release any lock
    /// on it while the completion requests are in flight.
    pub async fn answer_question(&self, text: &str, question: &str, config: &GenerationConfig) -> AnswerOutcome {
        let mut notices = Vec::new();
        let answer = self
            .generator
            .answer(text, question, self.chunk_size, config, &mut notices)
            .await;
        let entry = QaEntry::new(question, answer);

        let export = match export(&entry.question, &entry.answer, EXPORT_FORMAT, &self.export_file_name) {
            Ok(file) => Some(file),
            Err(e) => {
                log::error!("Export failed: {}", e);
                notices.push(Notice::error(format!(
                    "An error occurred while exporting the results: {}",
                    e
                )));
                None
            }
        };

        AnswerOutcome { entry, export, notices }
    }

    /// Record an answer: append it to history, queue its notices, and show
    /// it unless another document was uploaded since the question was asked.
    pub fn apply_answer(session: &mut SessionState, pending: &PendingQuestion, outcome: AnswerOutcome) {
        session.add_history(outcome.entry.clone());
        session.notices.extend(outcome.notices);

        if session.document_revision != pending.revision {
            log::info!("Document changed while answering; answer kept in history only");
            session.notify(Notice::info(
                "The document changed while the answer was generated; the answer was added to history",
            ));
            return;
        }

        session.latest = Some(LatestAnswer {
            entry: outcome.entry,
            export: outcome.export,
        });
    }

    /// Remember the submitted question and settings, and capture the text to
    /// ask about. Queues a notice when there is nothing to ask about.
    pub fn begin_ask(session: &mut SessionState, question: &str, config: GenerationConfig) -> Option<PendingQuestion> {
        session.generation = config;
        session.question = question.to_string();

        match Self::askable_text(session) {
            Some(text) => Some(PendingQuestion {
                text,
                revision: session.document_revision,
            }),
            None => {
                session.notify(Notice::error("Upload a document with text before asking a question"));
                None
            }
        }
    }

    /// The whole "get answer" action for callers that own the session
    pub async fn ask(&self, session: &mut SessionState, question: &str, config: GenerationConfig) {
        if let Some(pending) = Self::begin_ask(session, question, config) {
            let outcome = self.answer_question(&pending.text, question, &config).await;
            Self::apply_answer(session, &pending, outcome);
        }
    }

    pub fn add_latest_to_favorites(session: &mut SessionState) {
        match session.latest.as_ref() {
            Some(latest) => {
                let entry = latest.entry.clone();
                session.add_favorite(entry);
                session.notify(Notice::info("Added to favorites"));
            }
            None => session.notify(Notice::error("There is no answer to add to favorites")),
        }
    }

    pub fn delete_history(session: &mut SessionState, index: usize) {
        if let Err(e) = session.delete_history(index) {
            log::warn!("{}", e);
            session.notify(Notice::error(e.to_string()));
        }
    }

    pub fn delete_favorite(session: &mut SessionState, index: usize) {
        if let Err(e) = session.delete_favorite(index) {
            log::warn!("{}", e);
            session.notify(Notice::error(e.to_string()));
        }
    }

    /// Serialize a stored entry for direct download
    pub fn export_entry(&self, entry: &QaEntry) -> Result<ExportedFile, ExportError> {
        export(
            &entry.question,
            &entry.answer,
            EXPORT_FORMAT,
            &self.export_file_name,
        )
    }
}
