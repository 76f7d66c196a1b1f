use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use redgreenblue_core::plugins::{
    MockRewriter, PluginCapabilities, PluginError, PluginRegistry, PluginResult, PluginService,
    RewritePlugin, RewriteRequest,
};
use redgreenblue_core::{
    DocumentRepository, DocumentStore, Error, ProcessingState, ProgressStore, RewriteSession,
    SpanColor, TextSpan,
};

const TICK: Duration = Duration::from_millis(200);

struct ScriptedRewriter {
    reply: PluginResult<String>,
    delay: Duration,
    requests: Arc<Mutex<Vec<RewriteRequest>>>,
}

impl ScriptedRewriter {
    fn replying(reply: &str, delay: Duration) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay,
            requests: Arc::default(),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(PluginError::message(message)),
            delay: Duration::from_millis(500),
            requests: Arc::default(),
        }
    }
}

#[async_trait]
impl RewritePlugin for ScriptedRewriter {
    fn id(&self) -> &'static str {
        "scripted"
    }

    fn label(&self) -> &'static str {
        "Scripted"
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities::new(true, true)
    }

    async fn rewrite(&self, request: RewriteRequest) -> PluginResult<String> {
        self.requests.lock().expect("requests lock").push(request);
        tokio::time::sleep(self.delay).await;
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(err) => Err(PluginError::message(err.to_string())),
        }
    }
}

fn session_with(plugin: impl RewritePlugin + 'static, plugin_id: &str) -> RewriteSession {
    let mut registry = PluginRegistry::new();
    registry.register(plugin);
    RewriteSession::new(PluginService::new(registry), ProgressStore::new(), plugin_id).with_tick(TICK)
}

fn document(lines: &[&str]) -> DocumentStore {
    let mut store = DocumentStore::new(DocumentRepository::in_memory(), Duration::ZERO);
    store.set_text(&lines.join("\n"));
    store
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn suggestion_enters_review_and_completes_progress() {
    let session = session_with(
        ScriptedRewriter::replying("line1\nCHANGED\nline3", Duration::from_secs(1)),
        "scripted",
    );
    let mut store = document(&["line1", "line2", "line3"]);
    let progress = session.progress().subscribe();

    let (outcome, midway) = tokio::join!(session.process_with_ai(&mut store), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        progress.borrow().clone()
    });
    let outcome = outcome.expect("process");

    assert_eq!(midway.state, ProcessingState::Processing);
    assert!(midway.progress > 0 && midway.progress < 90, "{midway:?}");
    assert_eq!(midway.message, "Analyzing text...");

    assert_eq!(outcome.change_groups, 1);
    assert!(outcome.entered_review);
    assert!(store.is_diff_mode());
    assert_eq!(store.text(), "line1\nline2\nCHANGED\nline3");

    let finished = session.progress().current();
    assert_eq!(finished.state, ProcessingState::Complete);
    assert_eq!(finished.progress, 100);
    assert_eq!(finished.message, "Processing complete!");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn progress_never_passes_ninety_while_waiting() {
    let session = session_with(
        ScriptedRewriter::replying("rewritten", Duration::from_secs(10)),
        "scripted",
    );
    let mut store = document(&["draft"]);
    let progress = session.progress().subscribe();

    let (outcome, midway) = tokio::join!(session.process_with_ai(&mut store), async {
        tokio::time::sleep(Duration::from_secs(9)).await;
        progress.borrow().clone()
    });

    outcome.expect("process");
    assert_eq!(midway.progress, 90);
    assert_eq!(midway.message, "Finalizing changes...");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn only_user_authored_lines_are_submitted() {
    let plugin = ScriptedRewriter::replying("Draft, formally.", Duration::ZERO);
    let requests = Arc::clone(&plugin.requests);
    let session = session_with(plugin, "scripted");

    let mut store = DocumentStore::new(DocumentRepository::in_memory(), Duration::ZERO);
    store.set_text_spans(vec![
        TextSpan::new("done", SpanColor::White),
        TextSpan::new("draft", SpanColor::Blue),
        TextSpan::new("make it formal", SpanColor::Yellow),
    ]);

    session.process_with_ai(&mut store).await.expect("process");

    let recorded = requests.lock().expect("requests lock");
    assert_eq!(recorded[0].text, "draft\nmake it formal");
    assert_eq!(recorded[0].prompt_lines, vec!["make it formal".to_string()]);
    assert_eq!(store.state().original_spans().len(), 3);
    drop(recorded);

    assert_eq!(store.text(), "done\ndraft\nmake it formal\nDraft, formally.");
    assert_eq!(store.text_spans()[0].color, SpanColor::White);
    assert!(store.text_spans()[0].change_group_id.is_none());
    assert_eq!(store.accept_all(), 1);
    assert_eq!(store.text(), "done\nDraft, formally.");
}

struct Uppercaser;

#[async_trait]
impl RewritePlugin for Uppercaser {
    fn id(&self) -> &'static str {
        "upper"
    }

    fn label(&self) -> &'static str {
        "Uppercase"
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities::new(true, false)
    }

    async fn rewrite(&self, request: RewriteRequest) -> PluginResult<String> {
        Ok(request.text.to_uppercase())
    }
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn accepted_lines_survive_a_second_rewrite() {
    let session = session_with(Uppercaser, "upper");
    let mut store = document(&["first draft"]);

    session.process_with_ai(&mut store).await.expect("first rewrite");
    assert_eq!(store.accept_all(), 1);
    assert_eq!(store.text(), "FIRST DRAFT");

    store
        .add_text_span("second draft", SpanColor::Blue)
        .expect("append line");
    let outcome = session.process_with_ai(&mut store).await.expect("second rewrite");
    assert_eq!(outcome.change_groups, 1);
    assert_eq!(store.change_groups()[0].start_line_index, 1);
    assert_eq!(store.change_groups()[0].removed_lines, vec!["second draft".to_string()]);

    assert_eq!(store.accept_all(), 1);
    assert_eq!(store.text(), "FIRST DRAFT\nSECOND DRAFT");
    assert!(store
        .text_spans()
        .iter()
        .all(|span| span.color == SpanColor::White));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failure_resets_progress_and_keeps_the_document() {
    let session = session_with(ScriptedRewriter::failing("rate limited"), "scripted");
    let mut store = document(&["keep me"]);
    let before = store.state().clone();

    let err = session
        .process_with_ai(&mut store)
        .await
        .expect_err("plugin fails");

    assert!(matches!(err, Error::Plugin { ref plugin, .. } if plugin == "scripted"));
    assert_eq!(store.state(), &before);
    let progress = session.progress().current();
    assert_eq!(progress.state, ProcessingState::Idle);
    assert_eq!(progress.progress, 0);
    assert_eq!(progress.message, "");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn unknown_plugin_is_reported() {
    let session = session_with(ScriptedRewriter::replying("x", Duration::ZERO), "absent");
    let mut store = document(&["text"]);

    let err = session
        .process_with_ai(&mut store)
        .await
        .expect_err("plugin missing");

    assert!(matches!(err, Error::PluginNotRegistered { ref plugin } if plugin == "absent"));
    assert_eq!(session.progress().current().state, ProcessingState::Idle);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn requests_are_refused_while_reviewing() {
    let session = session_with(ScriptedRewriter::replying("other", Duration::ZERO), "scripted");
    let mut store = document(&["original"]);

    session.process_with_ai(&mut store).await.expect("first request");
    assert!(store.is_diff_mode());

    let err = session
        .process_with_ai(&mut store)
        .await
        .expect_err("review pending");
    assert!(matches!(err, Error::ReviewInProgress));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn blank_documents_are_refused() {
    let session = session_with(ScriptedRewriter::replying("x", Duration::ZERO), "scripted");
    let mut store = DocumentStore::new(DocumentRepository::in_memory(), Duration::ZERO);
    store.set_text_spans(vec![
        TextSpan::new("resolved", SpanColor::White),
        TextSpan::new("  ", SpanColor::Blue),
    ]);

    let err = session
        .process_with_ai(&mut store)
        .await
        .expect_err("nothing to process");

    assert!(matches!(err, Error::NothingToProcess));
    assert_eq!(session.progress().current().state, ProcessingState::Idle);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn identical_suggestion_skips_review() {
    let session = session_with(ScriptedRewriter::replying("same\ntext", Duration::ZERO), "scripted");
    let mut store = document(&["same", "text"]);

    let outcome = session.process_with_ai(&mut store).await.expect("process");

    assert_eq!(outcome.change_groups, 0);
    assert!(!outcome.entered_review);
    assert!(!store.is_diff_mode());
    assert_eq!(session.progress().current().state, ProcessingState::Complete);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn mock_rewriter_end_to_end() {
    let session = session_with(MockRewriter::new(), "mock");
    let mut store = document(&["the cat sat"]);

    let outcome = session.process_with_ai(&mut store).await.expect("process");
    assert_eq!(outcome.change_groups, 1);

    let group = store.change_groups()[0].clone();
    assert_eq!(group.removed_lines, vec!["the cat sat"]);
    assert_eq!(group.added_lines, vec!["The cat sat."]);

    assert!(store.accept_change_group(&group.id));
    assert_eq!(store.text(), "The cat sat.");
    assert!(store
        .text_spans()
        .iter()
        .all(|span| span.color == SpanColor::White));
}
