#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end invocations against in-memory collaborators.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    sharebridge_common::keys,
    sharebridge_config::ShareConfig,
    sharebridge_pipeline::{
        ContainerResolver, ExtensionContext, HostWaker, InvocationController, InvocationError,
        JsonRequest, RequestAttachment, ShareRequest, SharedStore, StoreError, StoreOpener,
    },
    url::Url,
};

// ── Test doubles ─────────────────────────────────────────────────────

/// Values only become visible in `published` on synchronize.
#[derive(Default)]
struct MemoryStore {
    staged: Mutex<BTreeMap<String, Value>>,
    published: Mutex<Option<BTreeMap<String, Value>>>,
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.staged.lock().unwrap().insert(key.into(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.staged.lock().unwrap().remove(key);
        Ok(())
    }

    async fn synchronize(&self) -> Result<(), StoreError> {
        *self.published.lock().unwrap() = Some(self.staged.lock().unwrap().clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryOpener {
    store: Arc<MemoryStore>,
    opened_at: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl StoreOpener for MemoryOpener {
    async fn open(&self, storage_root: &Path) -> Result<Arc<dyn SharedStore>, StoreError> {
        self.opened_at.lock().unwrap().push(storage_root.into());
        Ok(self.store.clone())
    }
}

impl MemoryOpener {
    fn published(&self) -> BTreeMap<String, Value> {
        self.store
            .published
            .lock()
            .unwrap()
            .clone()
            .expect("store was never synchronized")
    }

    fn items(&self) -> Value {
        self.published()[keys::DEFAULT_ITEMS_KEY].clone()
    }
}

#[derive(Default)]
struct RecordingWaker {
    uris: Mutex<Vec<String>>,
}

#[async_trait]
impl HostWaker for RecordingWaker {
    async fn wake(&self, uri: &Url) -> bool {
        self.uris.lock().unwrap().push(uri.to_string());
        true
    }
}

#[derive(Default)]
struct RecordingContext {
    outcomes: Mutex<Vec<String>>,
}

impl ExtensionContext for RecordingContext {
    fn complete_request(&self) {
        self.outcomes.lock().unwrap().push("completed".into());
    }

    fn cancel_request(&self, domain: &'static str, _error: &InvocationError) {
        self.outcomes.lock().unwrap().push(domain.into());
    }
}

struct Unavailable;

impl ContainerResolver for Unavailable {
    fn container_for(&self, _group_id: &str) -> Option<PathBuf> {
        None
    }
}

struct Harness {
    root: tempfile::TempDir,
    opener: Arc<MemoryOpener>,
    waker: Arc<RecordingWaker>,
    context: RecordingContext,
    controller: InvocationController,
}

fn config(containers: &Path) -> ShareConfig {
    let mut config = ShareConfig::default();
    config.host.app_id = Some("com.example.notes".into());
    config.host.url_scheme = Some("notes".into());
    config.storage.containers_dir = Some(containers.into());
    config
}

fn harness_with(edit: impl FnOnce(&mut ShareConfig)) -> Harness {
    let root = tempfile::tempdir().unwrap();
    let mut config = config(root.path());
    edit(&mut config);
    let opener = Arc::new(MemoryOpener::default());
    let waker = Arc::new(RecordingWaker::default());
    let controller = InvocationController::new(config)
        .with_store_opener(opener.clone())
        .with_waker(waker.clone());
    Harness {
        root,
        opener,
        waker,
        context: RecordingContext::default(),
        controller,
    }
}

fn harness() -> Harness {
    harness_with(|_| {})
}

impl Harness {
    fn container(&self) -> PathBuf {
        self.root.path().join("group.com.example.notes")
    }

    fn outcomes(&self) -> Vec<String> {
        self.context.outcomes.lock().unwrap().clone()
    }

    fn wake_calls(&self) -> Vec<String> {
        self.waker.uris.lock().unwrap().clone()
    }
}

// ── Scenarios ────────────────────────────────────────────────────────

#[tokio::test]
async fn single_text_item() {
    let h = harness();
    let request = ShareRequest::new().with(RequestAttachment::text("hello"));

    h.controller.execute(&request, &h.context).await.unwrap();

    assert_eq!(h.opener.items(), json!([{ "data": "hello", "mimeType": "text/plain" }]));
    assert!(!h.opener.published().contains_key(keys::DEFAULT_EXTRA_KEY));
    assert_eq!(h.outcomes(), ["completed"]);
    assert_eq!(h.wake_calls(), ["notes://"]);
}

#[tokio::test]
async fn single_link_item() {
    let h = harness();
    let request = ShareRequest::new().with(RequestAttachment::url("https://example.com"));

    h.controller.execute(&request, &h.context).await.unwrap();

    assert_eq!(
        h.opener.items(),
        json!([{ "data": "https://example.com", "mimeType": "text/plain" }])
    );
}

#[tokio::test]
async fn file_item_is_copied_byte_for_byte() {
    let h = harness();
    let source_dir = tempfile::tempdir().unwrap();
    let photo = source_dir.path().join("photo.jpg");
    let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    std::fs::write(&photo, &bytes).unwrap();

    let report = h
        .controller
        .execute(&ShareRequest::new().with(RequestAttachment::file(&photo)), &h.context)
        .await
        .unwrap();
    assert_eq!(report.items, 1);

    let items = h.opener.items();
    let item = &items[0];
    assert_eq!(item["mimeType"], "image/jpeg");
    assert_eq!(item["fileName"], "photo.jpg");

    let location = PathBuf::from(item["data"].as_str().unwrap());
    assert_eq!(location.parent().unwrap(), h.container());
    assert_eq!(location.extension().unwrap(), "jpg");
    assert_ne!(location.file_stem().unwrap(), "photo");
    assert_eq!(std::fs::read(&location).unwrap(), bytes);
    assert_eq!(std::fs::read(&photo).unwrap(), bytes);
}

#[tokio::test]
async fn same_file_twice_gets_distinct_destinations() {
    let h = harness();
    let source_dir = tempfile::tempdir().unwrap();
    let photo = source_dir.path().join("photo.jpg");
    std::fs::write(&photo, b"jpeg").unwrap();

    let request = ShareRequest::new()
        .with(RequestAttachment::file(&photo))
        .with(RequestAttachment::file(&photo));
    h.controller.execute(&request, &h.context).await.unwrap();

    let items = h.opener.items();
    assert_ne!(items[0]["data"], items[1]["data"]);
}

#[tokio::test]
async fn unavailable_storage_cancels_without_waking() {
    let mut h = harness();
    h.controller = h.controller.with_containers(Arc::new(Unavailable));

    let err = h
        .controller
        .execute(&ShareRequest::new().with(RequestAttachment::text("x")), &h.context)
        .await
        .unwrap_err();

    assert_eq!(err.domain(), "NoAppGroupError");
    assert_eq!(h.outcomes(), ["NoAppGroupError"]);
    assert!(h.wake_calls().is_empty());
    assert!(h.opener.opened_at.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_item_is_omitted_and_order_kept() {
    let h = harness();
    let request = ShareRequest::new()
        .with(RequestAttachment::text("one"))
        .with(RequestAttachment::file("/definitely/missing/two.png"))
        .with(RequestAttachment::url("https://three.example"));

    let report = h.controller.execute(&request, &h.context).await.unwrap();

    assert_eq!(report.items, 2);
    assert_eq!(
        h.opener.items(),
        json!([
            { "data": "one", "mimeType": "text/plain" },
            { "data": "https://three.example", "mimeType": "text/plain" }
        ])
    );
    assert_eq!(h.outcomes(), ["completed"]);
}

#[tokio::test]
async fn missing_scheme_cancels_with_config_error() {
    let h = harness_with(|config| config.host.url_scheme = None);

    let err = h
        .controller
        .execute(&ShareRequest::new().with(RequestAttachment::text("x")), &h.context)
        .await
        .unwrap_err();

    assert_eq!(err.domain(), "ConfigError");
    assert_eq!(h.outcomes(), ["ConfigError"]);
    assert!(h.wake_calls().is_empty());
}

#[tokio::test]
async fn malformed_request_cancels_with_no_attachments() {
    let h = harness();
    let request = JsonRequest::new(json!({ "attachments": "nope" }));

    let err = h.controller.execute(&request, &h.context).await.unwrap_err();

    assert_eq!(err.domain(), "NoAttachmentsError");
    assert_eq!(h.outcomes(), ["NoAttachmentsError"]);
    assert!(h.opener.opened_at.lock().unwrap().is_empty());
}

#[tokio::test]
async fn auxiliary_text_is_written_then_cleared() {
    let h = harness();

    let with_aux = ShareRequest::new()
        .with(RequestAttachment::text("a"))
        .with_auxiliary_text("from the composer");
    h.controller.execute(&with_aux, &h.context).await.unwrap();
    assert_eq!(
        h.opener.published()[keys::DEFAULT_EXTRA_KEY],
        json!({ "text": "from the composer" })
    );

    h.controller
        .execute(&ShareRequest::new().with(RequestAttachment::text("b")), &h.context)
        .await
        .unwrap();
    assert!(!h.opener.published().contains_key(keys::DEFAULT_EXTRA_KEY));
    assert_eq!(h.outcomes(), ["completed", "completed"]);
}

#[tokio::test]
async fn json_request_end_to_end() {
    let h = harness();
    let request = JsonRequest::parse(
        r#"{
            "groups": [
                { "attachments": [ { "text": "caption", "url": "https://ignored" } ] },
                { "attachments": [ { "data": "aGVsbG8=", "name": "note.txt" } ] }
            ],
            "auxiliary_text": "   "
        }"#,
    );

    h.controller.execute(&request, &h.context).await.unwrap();

    let items = h.opener.items();
    assert_eq!(items.as_array().unwrap().len(), 2);
    assert_eq!(items[0]["data"], "caption");
    assert_eq!(items[1]["mimeType"], "text/plain");
    assert_eq!(items[1]["fileName"], "note.txt");
    let written = std::fs::read(items[1]["data"].as_str().unwrap()).unwrap();
    assert_eq!(written, b"hello");
    assert!(!h.opener.published().contains_key(keys::DEFAULT_EXTRA_KEY));
}
