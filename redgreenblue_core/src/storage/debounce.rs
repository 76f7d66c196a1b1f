use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{DocumentRepository, PersistedDocument};

/// Coalesces bursts of persists into one write after a quiet period.
///
/// The pending write is an owned task handle: scheduling aborts the previous
/// task before spawning a new one, so only the latest snapshot is ever
/// written. Aborting cannot stop a task already writing, so every schedule,
/// write and cancel also bumps a generation the task rechecks under the
/// repository's persist lock. Outside a Tokio runtime writes happen
/// immediately.
#[derive(Debug)]
pub struct DebouncedWriter {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    generation: Arc<AtomicU64>,
}

impl DebouncedWriter {
    /// Create a writer waiting `delay` after the last schedule before writing.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Quiet period before a scheduled write fires.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending write with a write of `snapshot`.
    pub fn schedule(&mut self, repository: &DocumentRepository, snapshot: PersistedDocument) {
        self.cancel();

        if self.delay.is_zero() {
            repository.persist(&snapshot);
            return;
        }

        match Handle::try_current() {
            Ok(runtime) => {
                let repository = repository.clone();
                let delay = self.delay;
                let latest = Arc::clone(&self.generation);
                let generation = latest.load(Ordering::SeqCst);
                self.pending = Some(runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    repository.persist_if(&snapshot, || {
                        latest.load(Ordering::SeqCst) == generation
                    });
                }));
            }
            Err(_) => {
                debug!("no async runtime, persisting immediately");
                repository.persist(&snapshot);
            }
        }
    }

    /// Write `snapshot` now, discarding any pending write.
    pub fn write_now(&mut self, repository: &DocumentRepository, snapshot: &PersistedDocument) {
        self.cancel();
        repository.persist(snapshot);
    }

    /// Drop the pending write, if any, before it fires.
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    /// Whether a scheduled write has not fired yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::{SpanColor, TextSpan};
    use crate::storage::MemoryStore;

    fn snapshot(text: &str) -> PersistedDocument {
        PersistedDocument {
            text: text.to_string(),
            spans: vec![TextSpan::new(text, SpanColor::Blue)],
        }
    }

    #[test]
    fn writes_immediately_without_runtime() {
        let store = Arc::new(MemoryStore::new());
        let repository = DocumentRepository::new(store.clone());
        let mut writer = DebouncedWriter::new(Duration::from_millis(500));

        writer.schedule(&repository, snapshot("now"));

        assert!(!writer.is_pending());
        assert_eq!(repository.load_document().as_deref(), Some("now"));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn later_schedule_supersedes_pending_write() {
        let store = Arc::new(MemoryStore::new());
        let repository = DocumentRepository::new(store.clone());
        let mut writer = DebouncedWriter::new(Duration::from_millis(500));

        writer.schedule(&repository, snapshot("first"));
        tokio::time::sleep(Duration::from_millis(300)).await;
        writer.schedule(&repository, snapshot("second"));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.write_count(), 0);
        assert!(writer.is_pending());

        tokio::time::sleep(Duration::from_millis(250)).await;
        // One persist writes the spans and the text.
        assert_eq!(store.write_count(), 2);
        assert_eq!(repository.load_document().as_deref(), Some("second"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn write_now_is_never_overtaken_by_an_earlier_schedule() {
        let store = Arc::new(MemoryStore::new());
        let repository = DocumentRepository::new(store.clone());
        let mut writer = DebouncedWriter::new(Duration::from_millis(1));

        for round in 0..50 {
            writer.schedule(&repository, snapshot(&format!("stale {round}")));
            tokio::time::sleep(Duration::from_millis(1)).await;
            writer.write_now(&repository, &snapshot("final"));
            tokio::time::sleep(Duration::from_millis(2)).await;

            assert_eq!(repository.load_document().as_deref(), Some("final"));
            let spans = repository.load_text_spans().expect("spans");
            assert_eq!(spans[0].text, "final");
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn cancel_prevents_the_write() {
        let store = Arc::new(MemoryStore::new());
        let repository = DocumentRepository::new(store.clone());
        let mut writer = DebouncedWriter::new(Duration::from_millis(500));

        writer.schedule(&repository, snapshot("dropped"));
        writer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(store.write_count(), 0);
    }
}
