use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use redgreenblue_core::storage::{DOCUMENT_KEY, TEXT_SPANS_KEY};
use redgreenblue_core::{
    DiffEngine, DocumentRepository, DocumentStore, EditorConfig, FileStore, KeyValueStore,
    MemoryStore, SpanColor,
};
use tempfile::TempDir;
use tokio::time::sleep;

const DEBOUNCE: Duration = Duration::from_millis(500);

fn memory_backed() -> (Arc<MemoryStore>, DocumentRepository) {
    let memory = Arc::new(MemoryStore::new());
    let repository = DocumentRepository::new(memory.clone());
    (memory, repository)
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn edits_within_the_window_collapse_into_one_write() {
    let (memory, repository) = memory_backed();
    let mut store = DocumentStore::new(repository.clone(), DEBOUNCE);

    store.set_text("a");
    sleep(Duration::from_millis(100)).await;
    store.set_text("a\nb");
    sleep(Duration::from_millis(100)).await;
    store.set_text("a\nb\nc");

    assert!(store.has_pending_write());
    assert_eq!(memory.write_count(), 0);

    sleep(Duration::from_millis(600)).await;

    // One persist stores both keys.
    assert_eq!(memory.write_count(), 2);
    assert!(!store.has_pending_write());
    assert_eq!(repository.load_document().as_deref(), Some("a\nb\nc"));
    let spans = repository.load_text_spans().expect("spans stored");
    assert_eq!(spans, store.text_spans());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn nothing_is_written_before_the_quiet_period() {
    let (memory, repository) = memory_backed();
    let mut store = DocumentStore::new(repository, DEBOUNCE);

    store.set_text("draft");
    sleep(Duration::from_millis(499)).await;
    assert_eq!(memory.write_count(), 0);

    sleep(Duration::from_millis(2)).await;
    assert_eq!(memory.write_count(), 2);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn finishing_a_review_persists_immediately() {
    let (memory, repository) = memory_backed();
    let mut store = DocumentStore::new(repository.clone(), DEBOUNCE);
    store.set_text("line1\nline2\nline3");

    let original = store.text_spans().to_vec();
    let diff = DiffEngine::new().compute_change_groups(&original, "line1\nCHANGED\nline3");
    assert!(store.enter_diff_mode(diff, original));
    let group = store.change_groups()[0].id.clone();
    assert!(store.accept_change_group(&group));

    assert!(!store.has_pending_write());
    assert_eq!(memory.write_count(), 2);
    assert_eq!(
        repository.load_document().as_deref(),
        Some("line1\nCHANGED\nline3")
    );

    sleep(Duration::from_secs(1)).await;
    assert_eq!(memory.write_count(), 2);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn flush_writes_without_waiting() {
    let (memory, repository) = memory_backed();
    let mut store = DocumentStore::new(repository.clone(), DEBOUNCE);

    store.set_text("urgent");
    store.flush();

    assert_eq!(repository.load_document().as_deref(), Some("urgent"));
    sleep(Duration::from_secs(1)).await;
    assert_eq!(memory.write_count(), 2);
}

#[test]
fn without_a_runtime_writes_are_synchronous() {
    let (memory, repository) = memory_backed();
    let mut store = DocumentStore::new(repository.clone(), DEBOUNCE);

    store.set_text("sync");

    assert_eq!(memory.write_count(), 2);
    assert_eq!(repository.load_document().as_deref(), Some("sync"));
}

#[test]
fn interrupted_review_reopens_as_editing() {
    let (_memory, repository) = memory_backed();
    let mut store = DocumentStore::new(repository.clone(), Duration::ZERO);
    store.set_text("keep\nold");

    let original = store.text_spans().to_vec();
    let diff = DiffEngine::new().compute_change_groups(&original, "keep\nnew");
    assert!(store.enter_diff_mode(diff, original));
    drop(store);

    let reopened = DocumentStore::open(repository, Duration::ZERO);

    assert!(!reopened.is_diff_mode());
    assert_eq!(reopened.text(), "keep\nold");
    assert!(reopened
        .text_spans()
        .iter()
        .all(|span| !span.color.is_pending_review()));
    assert_eq!(reopened.text_spans()[1].color, SpanColor::Blue);
}

#[test]
fn file_store_survives_reopening() {
    let temp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 tempdir");

    {
        let file_store = FileStore::open(root.clone()).expect("open store");
        let mut store =
            DocumentStore::new(DocumentRepository::new(Arc::new(file_store)), Duration::ZERO);
        store.set_text("persisted\nacross runs");
    }

    let file_store = FileStore::open(root.clone()).expect("reopen store");
    assert_eq!(
        file_store.get(DOCUMENT_KEY).expect("read document").as_deref(),
        Some("persisted\nacross runs")
    );
    assert!(file_store.get(TEXT_SPANS_KEY).expect("read spans").is_some());
    assert!(file_store.get("@redgreenblue:missing").expect("read").is_none());

    let store = DocumentStore::open(DocumentRepository::new(Arc::new(file_store)), Duration::ZERO);
    assert_eq!(store.text(), "persisted\nacross runs");
}

#[test]
fn configured_store_opens_from_disk() {
    let temp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(temp.path().join("documents")).expect("utf8 tempdir");
    let config = EditorConfig::default()
        .with_debounce(Duration::ZERO)
        .with_storage_dir(root);

    let mut store = DocumentStore::from_config(&config).expect("open configured store");
    store.set_text("configured");

    let reopened = DocumentStore::from_config(&config).expect("reopen configured store");
    assert_eq!(reopened.text(), "configured");
}
