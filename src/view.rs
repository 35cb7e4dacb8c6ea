//! HTML projection of a session.
//!
//! The page is derived entirely from the current [`SessionState`] on every
//! request; nothing here mutates the session.

use minijinja::Environment;
use serde::Serialize;

use crate::models::{DocumentContent, GenerationConfig, ImagePreview, Notice, QaEntry};
use crate::reader::SUPPORTED_EXTENSIONS;
use crate::session::SessionState;

pub const PAGE_TITLE: &str = "File Upload and GPT-4 Q&A";
const INDEX_TEMPLATE: &str = "index.html";

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub index: usize,
    pub number: usize,
    pub question: String,
    pub answer: String,
    pub asked_at: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentView {
    pub file_name: String,
    pub text: Option<String>,
    pub image: Option<ImagePreview>,
}

#[derive(Debug, Serialize)]
pub struct DownloadView {
    pub href: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerView {
    pub question: String,
    pub answer: String,
    pub download: Option<DownloadView>,
}

/// Slider positions, formatted the way the inputs expect them
#[derive(Debug, Serialize)]
pub struct GenerationView {
    pub temperature: String,
    pub max_tokens: u32,
    pub top_p: String,
}

impl From<GenerationConfig> for GenerationView {
    fn from(config: GenerationConfig) -> Self {
        Self {
            temperature: format!("{:.1}", config.temperature),
            max_tokens: config.max_tokens,
            top_p: format!("{:.1}", config.top_p),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageView {
    pub title: &'static str,
    pub accept: String,
    pub notices: Vec<Notice>,
    pub document: Option<DocumentView>,
    pub can_ask: bool,
    pub generation: GenerationView,
    pub question: String,
    pub latest: Option<AnswerView>,
    pub history: Vec<EntryView>,
    pub favorites: Vec<EntryView>,
}

impl PageView {
    pub fn project(session: &SessionState, notices: Vec<Notice>) -> Self {
        let document = session.document.as_ref().map(|doc| DocumentView {
            file_name: doc.file_name.clone(),
            text: doc.content.text().map(str::to_string),
            image: match &doc.content {
                DocumentContent::Image(preview) => Some(preview.clone()),
                _ => None,
            },
        });

        let can_ask = session
            .document
            .as_ref()
            .is_some_and(|doc| doc.content.askable_text().is_some());

        let latest = session.latest.as_ref().map(|latest| AnswerView {
            question: latest.entry.question.clone(),
            answer: latest.entry.answer.clone(),
            download: latest.export.as_ref().map(|file| DownloadView {
                href: file.data_uri(),
                file_name: file.file_name.clone(),
            }),
        });

        Self {
            title: PAGE_TITLE,
            accept: SUPPORTED_EXTENSIONS
                .iter()
                .map(|ext| format!(".{ext}"))
                .collect::<Vec<_>>()
                .join(","),
            notices,
            document,
            can_ask,
            generation: session.generation.into(),
            question: session.question.clone(),
            latest,
            history: entry_views(&session.history),
            favorites: entry_views(&session.favorites),
        }
    }
}

fn entry_views(entries: &[QaEntry]) -> Vec<EntryView> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| EntryView {
            index,
            number: index + 1,
            question: entry.question.clone(),
            answer: entry.answer.clone(),
            asked_at: chrono::DateTime::from_timestamp(entry.asked_at, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_default(),
        })
        .collect()
}

/// Renders [`PageView`]s with the bundled template
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))?;
        Ok(Self { env })
    }

    pub fn render(&self, view: &PageView) -> Result<String, minijinja::Error> {
        self.env.get_template(INDEX_TEMPLATE)?.render(view)
    }

    /// Project and render in one step
    pub fn render_session(&self, session: &SessionState, notices: Vec<Notice>) -> Result<String, minijinja::Error> {
        self.render(&PageView::project(session, notices))
    }
}
