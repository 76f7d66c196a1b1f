use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use super::{KeyValueStore, MemoryStore};
use crate::api::TextSpan;
use crate::{Error, Result};

/// Key holding the document as plain text.
pub const DOCUMENT_KEY: &str = "@redgreenblue:document";
/// Key holding the JSON-encoded span sequence.
pub const TEXT_SPANS_KEY: &str = "@redgreenblue:textSpans";

/// Snapshot of everything written on a persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedDocument {
    /// Derived document text.
    pub text: String,
    /// Span sequence the text was derived from.
    pub spans: Vec<TextSpan>,
}

/// Best-effort document persistence on top of a [`KeyValueStore`].
///
/// Every public operation swallows failures after logging them; the
/// fallible variants are kept private. Clones share one persist lock, so the
/// two keys of a persist are never interleaved with another persist.
#[derive(Clone)]
pub struct DocumentRepository {
    store: Arc<dyn KeyValueStore>,
    persist_lock: Arc<Mutex<()>>,
}

impl DocumentRepository {
    /// Wrap a key-value store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            persist_lock: Arc::default(),
        }
    }

    /// Repository backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Persist the plain-text form of the document.
    pub fn save_document(&self, text: &str) {
        if let Err(err) = self.try_set(DOCUMENT_KEY, text) {
            warn!(error = %err, "failed to save document");
        }
    }

    /// Load the plain-text form of the document, if any.
    #[must_use]
    pub fn load_document(&self) -> Option<String> {
        self.try_get(DOCUMENT_KEY).unwrap_or_else(|err| {
            warn!(error = %err, "failed to load document");
            None
        })
    }

    /// Persist the span sequence.
    pub fn save_text_spans(&self, spans: &[TextSpan]) {
        if let Err(err) = self.try_save_text_spans(spans) {
            warn!(error = %err, "failed to save text spans");
        }
    }

    /// Load the span sequence, if any was stored and it decodes.
    #[must_use]
    pub fn load_text_spans(&self) -> Option<Vec<TextSpan>> {
        self.try_load_text_spans().unwrap_or_else(|err| {
            warn!(error = %err, "failed to load text spans");
            None
        })
    }

    /// Persist spans and text together.
    pub fn persist(&self, snapshot: &PersistedDocument) {
        self.persist_if(snapshot, || true);
    }

    /// Persist unless `current` reports, under the persist lock, that the
    /// snapshot has been superseded. Returns whether anything was written.
    pub(crate) fn persist_if(
        &self,
        snapshot: &PersistedDocument,
        current: impl FnOnce() -> bool,
    ) -> bool {
        let _guard = self
            .persist_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !current() {
            debug!("skipping superseded persist");
            return false;
        }

        debug!(
            spans = snapshot.spans.len(),
            bytes = snapshot.text.len(),
            "persisting document"
        );
        self.save_text_spans(&snapshot.spans);
        self.save_document(&snapshot.text);
        true
    }

    fn try_save_text_spans(&self, spans: &[TextSpan]) -> Result<()> {
        let encoded = serde_json::to_string(spans).map_err(|source| Error::Serialization {
            key: TEXT_SPANS_KEY.to_string(),
            source,
        })?;
        self.try_set(TEXT_SPANS_KEY, &encoded)
    }

    fn try_load_text_spans(&self) -> Result<Option<Vec<TextSpan>>> {
        let Some(encoded) = self.try_get(TEXT_SPANS_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&encoded)
            .map(Some)
            .map_err(|source| Error::Serialization {
                key: TEXT_SPANS_KEY.to_string(),
                source,
            })
    }

    fn try_get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key).map_err(|source| Error::Storage {
            key: key.to_string(),
            source,
        })
    }

    fn try_set(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(key, value).map_err(|source| Error::Storage {
            key: key.to_string(),
            source,
        })
    }
}

impl fmt::Debug for DocumentRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRepository").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SpanColor;
    use crate::storage::{StorageError, StorageResult};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::message("disk unavailable"))
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::message("disk unavailable"))
        }
    }

    #[test]
    fn spans_survive_a_round_trip() {
        let repository = DocumentRepository::in_memory();
        let spans = vec![
            TextSpan::new("one", SpanColor::Blue),
            TextSpan::new("two", SpanColor::Yellow),
        ];

        repository.save_text_spans(&spans);
        assert_eq!(repository.load_text_spans(), Some(spans));
    }

    #[test]
    fn missing_values_load_as_none() {
        let repository = DocumentRepository::in_memory();
        assert!(repository.load_document().is_none());
        assert!(repository.load_text_spans().is_none());
    }

    #[test]
    fn failures_are_swallowed() {
        let repository = DocumentRepository::new(Arc::new(BrokenStore));
        repository.save_document("text");
        repository.save_text_spans(&[]);
        assert!(repository.load_document().is_none());
        assert!(repository.load_text_spans().is_none());
    }

    /// Records the order of writes, pausing inside each one.
    #[derive(Default)]
    struct SlowLog {
        keys: Mutex<Vec<String>>,
    }

    impl KeyValueStore for SlowLog {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> StorageResult<()> {
            std::thread::sleep(std::time::Duration::from_millis(2));
            self.keys.lock()?.push(key.to_string());
            Ok(())
        }
    }

    #[test]
    fn concurrent_persists_write_both_keys_back_to_back() {
        let log = Arc::new(SlowLog::default());
        let repository = DocumentRepository::new(log.clone());

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let repository = repository.clone();
                std::thread::spawn(move || {
                    for round in 0..5 {
                        let text = format!("{worker}-{round}");
                        repository.persist(&PersistedDocument {
                            spans: vec![TextSpan::new(text.clone(), SpanColor::Blue)],
                            text,
                        });
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker");
        }

        let keys = log.keys.lock().expect("log lock");
        assert_eq!(keys.len(), 40);
        for pair in keys.chunks(2) {
            assert_eq!(pair[0], TEXT_SPANS_KEY);
            assert_eq!(pair[1], DOCUMENT_KEY);
        }
    }

    #[test]
    fn superseded_persist_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let repository = DocumentRepository::new(store.clone());
        let snapshot = PersistedDocument {
            text: "stale".to_string(),
            spans: Vec::new(),
        };

        assert!(!repository.persist_if(&snapshot, || false));
        assert_eq!(store.write_count(), 0);
        assert!(repository.persist_if(&snapshot, || true));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn corrupt_spans_load_as_none() {
        let store = Arc::new(MemoryStore::new());
        store.set(TEXT_SPANS_KEY, "not json").expect("seed store");

        let repository = DocumentRepository::new(store);
        assert!(repository.load_text_spans().is_none());
    }
}
