pub mod chunker;
pub mod completion;
pub mod config;
pub mod controller;
pub mod docx;
pub mod error;
pub mod export;
pub mod generator;
pub mod http_server;
pub mod models;
pub mod pdf_parser;
pub mod reader;
pub mod session;
pub mod view;

use std::sync::Arc;

use completion::CompletionClient;
use config::AppConfig;
use controller::QaController;
use generator::AnswerGenerator;
use session::SessionRegistry;
use view::PageRenderer;

/// Everything the request handlers share
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionRegistry,
    pub controller: Arc<QaController>,
    pub renderer: Arc<PageRenderer>,
}

impl AppState {
    pub fn new(config: AppConfig, client: Arc<dyn CompletionClient>) -> Result<Self, minijinja::Error> {
        let generator = Arc::new(AnswerGenerator::new(client, config.cache_capacity));
        let controller = QaController::from_config(&config, generator);

        Ok(Self {
            controller: Arc::new(controller),
            renderer: Arc::new(PageRenderer::new()?),
            sessions: SessionRegistry::new(config.max_sessions),
            config: Arc::new(config),
        })
    }
}
