use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::chunker::FixedWidthChunker;
use crate::completion::CompletionClient;
use crate::models::{GenerationConfig, Notice};

/// Build the prompt sent for one chunk of the document
pub fn build_prompt(chunk: &str, question: &str) -> String {
    format!(
        "Answer the following question based on the document's content:\n\n{}\n\nQuestion: {}\nAnswer:",
        chunk, question
    )
}

/// Memoized completions keyed by prompt and sampling settings
pub struct AnswerCache {
    cache: Mutex<LruCache<String, String>>,
}

impl AnswerCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Stable key over every input that influences a completion
    pub fn key(prompt: &str, config: &GenerationConfig) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(config.temperature.to_bits().to_le_bytes());
        hasher.update(config.max_tokens.to_le_bytes());
        hasher.update(config.top_p.to_bits().to_le_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.lock().await.get(key).cloned()
    }

    pub async fn insert(&self, key: String, value: String) {
        self.cache.lock().await.put(key, value);
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

/// Produces answers by running one completion per chunk
pub struct AnswerGenerator {
    client: Arc<dyn CompletionClient>,
    cache: AnswerCache,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, cache_capacity: usize) -> Self {
        Self {
            client,
            cache: AnswerCache::new(cache_capacity),
        }
    }

    /// Complete a single prompt.
    ///
    /// Failures are reported through `notices` and yield an empty string.
    /// Only successful completions are memoized.
    pub async fn generate(&self, prompt: &str, config: &GenerationConfig, notices: &mut Vec<Notice>) -> String {
        let key = AnswerCache::key(prompt, config);
        if let Some(cached) = self.cache.get(&key).await {
            log::debug!("Completion cache hit {}", &key[..12]);
            return cached;
        }

        match self.client.complete(prompt, config).await {
            Ok(text) => {
                let text = text.trim().to_string();
                self.cache.insert(key, text.clone()).await;
                text
            }
            Err(e) => {
                log::error!("Completion request failed: {}", e);
                notices.push(Notice::error(format!(
                    "An error occurred while generating the answer: {}",
                    e
                )));
                String::new()
            }
        }
    }

    /// Answer `question` against `text`, one completion per chunk.
    ///
    /// Chunk answers are concatenated in chunk order; a failed chunk
    /// contributes nothing and the remaining chunks still run.
    pub async fn answer(
        &self,
        text: &str,
        question: &str,
        chunk_size: usize,
        config: &GenerationConfig,
        notices: &mut Vec<Notice>,
    ) -> String {
        let chunks = FixedWidthChunker::new(chunk_size).chunk(text);
        log::info!("Answering question over {} chunks", chunks.len());

        let mut answer = String::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let prompt = build_prompt(chunk, question);
            let chunk_answer = self.generate(&prompt, config, notices).await;
            log::debug!("Chunk {} produced {} chars", idx + 1, chunk_answer.len());
            answer.push_str(&chunk_answer);
        }

        answer
    }

    pub fn cache(&self) -> &AnswerCache {
        &self.cache
    }
}
