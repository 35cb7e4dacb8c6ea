use async_trait::async_trait;
use docqa::completion::{ApiError, CompletionClient};
use docqa::config::AppConfig;
use docqa::controller::QaController;
use docqa::generator::AnswerGenerator;
use docqa::models::{GenerationConfig, UploadedFile};
use docqa::session::SessionState;
use std::sync::{Arc, Mutex};

/// Answers each prompt with the length of the chunk it carried
#[derive(Default)]
struct ChunkLengthClient {
    chunk_lengths: Mutex<Vec<usize>>,
}

const PROMPT_HEAD: &str = "Answer the following question based on the document's content:\n\n";

#[async_trait]
impl CompletionClient for ChunkLengthClient {
    async fn complete(&self, prompt: &str, _config: &GenerationConfig) -> Result<String, ApiError> {
        let body = prompt
            .strip_prefix(PROMPT_HEAD)
            .and_then(|rest| rest.split_once("\n\nQuestion: "))
            .map(|(chunk, _)| chunk)
            .ok_or_else(|| ApiError::InvalidRequest("unexpected prompt shape".to_string()))?;

        let len = body.chars().count();
        self.chunk_lengths.lock().unwrap().push(len);
        Ok(format!("[{len}]"))
    }
}

fn controller(client: Arc<ChunkLengthClient>) -> QaController {
    let config = AppConfig::default();
    let generator = Arc::new(AnswerGenerator::new(client, config.cache_capacity));
    QaController::from_config(&config, generator)
}

#[tokio::test]
async fn long_text_is_answered_chunk_by_chunk() {
    let client = Arc::new(ChunkLengthClient::default());
    let controller = controller(client.clone());
    let mut session = SessionState::new();

    let body = "abcdefghij".repeat(1000);
    controller.upload(&mut session, UploadedFile::new("long.txt", body.into_bytes()));
    controller
        .ask(&mut session, "How long?", GenerationConfig::default())
        .await;

    assert_eq!(*client.chunk_lengths.lock().unwrap(), vec![4096, 4096, 1808]);
    assert_eq!(session.history.len(), 1);
    assert_eq!(session.history[0].answer, "[4096][4096][1808]");
    assert!(session.take_notices().is_empty());
}

#[tokio::test]
async fn repeated_question_is_served_from_cache() {
    let client = Arc::new(ChunkLengthClient::default());
    let controller = controller(client.clone());
    let mut session = SessionState::new();

    controller.upload(&mut session, UploadedFile::new("short.txt", b"tiny".to_vec()));
    controller.ask(&mut session, "q", GenerationConfig::default()).await;
    controller.ask(&mut session, "q", GenerationConfig::default()).await;

    assert_eq!(client.chunk_lengths.lock().unwrap().len(), 1);
    assert_eq!(session.history.len(), 2);
    assert_eq!(session.history[0].answer, session.history[1].answer);
}

#[tokio::test]
async fn multibyte_text_is_split_on_characters() {
    let client = Arc::new(ChunkLengthClient::default());
    let controller = controller(client.clone());
    let mut session = SessionState::new();

    let body = "é".repeat(5000);
    controller.upload(&mut session, UploadedFile::new("accents.txt", body.into_bytes()));
    controller.ask(&mut session, "q", GenerationConfig::default()).await;

    assert_eq!(*client.chunk_lengths.lock().unwrap(), vec![4096, 904]);
}
