use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::export::ExportedFile;
use crate::models::{GenerationConfig, LoadedDocument, Notice, QaEntry};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No {list} item at position {index} (list has {len})")]
    IndexOutOfRange {
        list: &'static str,
        index: usize,
        len: usize,
    },
}

/// The answer currently on screen, with its download when export succeeded
#[derive(Debug, Clone)]
pub struct LatestAnswer {
    pub entry: QaEntry,
    pub export: Option<ExportedFile>,
}

/// Everything one interactive session knows.
///
/// `history` and `favorites` are independent sequences: a favorite is a copy
/// of an entry, so deleting from one list never touches the other.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub history: Vec<QaEntry>,
    pub favorites: Vec<QaEntry>,
    pub document: Option<LoadedDocument>,
    pub latest: Option<LatestAnswer>,
    pub generation: GenerationConfig,
    pub question: String,
    /// Reports waiting to be shown on the next render
    pub notices: Vec<Notice>,
    /// Bumped on every upload so late answers can tell the document changed
    pub document_revision: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current document and drop the answer shown for the old one
    pub fn set_document(&mut self, document: LoadedDocument) {
        self.document = Some(document);
        self.latest = None;
        self.document_revision += 1;
    }

    pub fn add_history(&mut self, entry: QaEntry) {
        self.history.push(entry);
    }

    pub fn delete_history(&mut self, index: usize) -> Result<QaEntry, SessionError> {
        remove_at(&mut self.history, "history", index)
    }

    pub fn add_favorite(&mut self, entry: QaEntry) {
        self.favorites.push(entry);
    }

    pub fn delete_favorite(&mut self, index: usize) -> Result<QaEntry, SessionError> {
        remove_at(&mut self.favorites, "favorites", index)
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

fn remove_at(list: &mut Vec<QaEntry>, name: &'static str, index: usize) -> Result<QaEntry, SessionError> {
    if index >= list.len() {
        return Err(SessionError::IndexOutOfRange {
            list: name,
            index,
            len: list.len(),
        });
    }
    Ok(list.remove(index))
}

pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

/// Sessions by id, shared across request handlers.
///
/// Ids are only ever minted here. Once `capacity` sessions exist the least
/// recently used one is dropped.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<LruCache<String, SessionState>>>,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, SessionState>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` against the session `id` when it is known, otherwise against a
    /// fresh session. Returns the id actually used.
    pub fn open<R>(&self, id: Option<&str>, f: impl FnOnce(&mut SessionState) -> R) -> (String, R) {
        let mut map = self.lock();

        if let Some(id) = id {
            if let Some(session) = map.get_mut(id) {
                return (id.to_string(), f(session));
            }
            log::debug!("Unknown session id, issuing a new one");
        }

        let id = Uuid::new_v4().to_string();
        let mut session = SessionState::new();
        let result = f(&mut session);
        if let Some((evicted, _)) = map.push(id.clone(), session) {
            log::info!("Evicted idle session {}", evicted);
        }
        log::info!("Starting session {} ({} active)", id, map.len());

        (id, result)
    }

    /// Run `f` against an existing session; `None` when it is unknown or evicted
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        self.lock().get_mut(id).map(f)
    }

    /// Read an existing session without marking it as recently used
    pub fn read<R>(&self, id: &str, f: impl FnOnce(&SessionState) -> R) -> Option<R> {
        self.lock().peek(id).map(f)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> QaEntry {
        QaEntry::new(format!("q{n}"), format!("a{n}"))
    }

    fn questions(list: &[QaEntry]) -> Vec<&str> {
        list.iter().map(|e| e.question.as_str()).collect()
    }

    #[test]
    fn test_add_history_appends() {
        let mut state = SessionState::new();
        state.add_history(entry(1));
        state.add_history(entry(2));
        state.add_history(entry(1));
        assert_eq!(questions(&state.history), vec!["q1", "q2", "q1"]);
    }

    #[test]
    fn test_delete_history_preserves_order() {
        let mut state = SessionState::new();
        for n in 0..4 {
            state.add_history(entry(n));
        }

        let removed = state.delete_history(1).unwrap();
        assert_eq!(removed.question, "q1");
        assert_eq!(questions(&state.history), vec!["q0", "q2", "q3"]);
    }

    #[test]
    fn test_delete_out_of_range_is_an_error() {
        let mut state = SessionState::new();
        state.add_history(entry(0));

        let result = state.delete_history(5);
        assert_eq!(
            result,
            Err(SessionError::IndexOutOfRange {
                list: "history",
                index: 5,
                len: 1
            })
        );
        assert_eq!(questions(&state.history), vec!["q0"]);
    }

    #[test]
    fn test_favorites_are_independent_of_history() {
        let mut state = SessionState::new();
        state.add_history(entry(0));
        state.add_favorite(entry(0));

        state.delete_history(0).unwrap();
        assert!(state.history.is_empty());
        assert_eq!(questions(&state.favorites), vec!["q0"]);

        state.add_history(entry(1));
        state.delete_favorite(0).unwrap();
        assert!(state.favorites.is_empty());
        assert_eq!(questions(&state.history), vec!["q1"]);
        assert!(state.delete_favorite(0).is_err());
    }

    #[test]
    fn test_take_notices_drains() {
        let mut state = SessionState::new();
        state.notify(Notice::error("oops"));

        assert_eq!(state.take_notices().len(), 1);
        assert!(state.take_notices().is_empty());
    }

    #[test]
    fn test_set_document_bumps_revision() {
        let mut state = SessionState::new();
        state.latest = Some(LatestAnswer {
            entry: entry(0),
            export: None,
        });

        state.set_document(LoadedDocument {
            file_name: "a.txt".to_string(),
            content: crate::models::DocumentContent::Text("a".to_string()),
        });
        assert_eq!(state.document_revision, 1);
        assert!(state.latest.is_none());
    }

    #[test]
    fn test_registry_isolates_sessions() {
        let registry = SessionRegistry::default();
        let (a, _) = registry.open(None, |s| s.add_history(entry(1)));
        let (b, _) = registry.open(None, |s| s.add_favorite(entry(2)));
        assert_ne!(a, b);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&a));
        assert_eq!(registry.read(&a, |s| s.history.len()), Some(1));
        assert_eq!(registry.read(&a, |s| s.favorites.len()), Some(0));
        assert_eq!(registry.read(&b, |s| s.history.len()), Some(0));
    }

    #[test]
    fn test_known_id_is_reused() {
        let registry = SessionRegistry::default();
        let (id, _) = registry.open(None, |s| s.add_history(entry(1)));

        let (again, len) = registry.open(Some(&id), |s| s.history.len());
        assert_eq!(again, id);
        assert_eq!(len, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_id_gets_a_fresh_session() {
        let registry = SessionRegistry::default();
        let (id, _) = registry.open(Some("forged"), |_| ());

        assert_ne!(id, "forged");
        assert!(!registry.contains("forged"));
        assert!(registry.contains(&id));
        assert_eq!(registry.update("forged", |s| s.history.len()), None);
    }

    #[test]
    fn test_registry_evicts_least_recently_used() {
        let registry = SessionRegistry::new(2);
        let (first, _) = registry.open(None, |_| ());
        let (second, _) = registry.open(None, |_| ());

        // touch `first` so `second` becomes the oldest
        registry.update(&first, |_| ());
        let (third, _) = registry.open(None, |_| ());

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&first));
        assert!(!registry.contains(&second));
        assert!(registry.contains(&third));
    }

    #[test]
    fn test_read_does_not_create() {
        let registry = SessionRegistry::default();
        assert_eq!(registry.read("ghost", |s| s.history.len()), None);
        assert!(registry.is_empty());
    }
}
