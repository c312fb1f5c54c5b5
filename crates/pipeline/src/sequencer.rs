//! Ordered, one-at-a-time loading of attachment groups.
//!
//! Every provider load is dispatched as its own task, but the next one is not
//! issued until the previous completion has been received through a
//! single-slot channel. The completion sender is dropped on every exit path
//! of the task (including a panic), so the gate always opens.

use std::sync::Arc;

use {
    sharebridge_common::{InvocationResult, SharedItem},
    sharebridge_media::Materializer,
    tokio::sync::oneshot,
    tracing::{debug, info, warn},
};

use crate::{
    error::ItemError,
    provider::{AttachmentGroup, Capability, ContentProvider, LoadedContent, select_capability},
};

pub struct AttachmentSequencer {
    materializer: Materializer,
}

impl AttachmentSequencer {
    pub fn new(materializer: Materializer) -> Self {
        Self { materializer }
    }

    /// Load every provider of every group, in order, into one result.
    ///
    /// Individual failures are logged and skipped; they never fail the
    /// sequence.
    pub async fn sequence(&self, groups: Vec<AttachmentGroup>) -> InvocationResult {
        let mut result = InvocationResult::new();
        let mut skipped = 0usize;

        for (group_index, group) in groups.iter().enumerate() {
            for (provider_index, provider) in group.providers().iter().enumerate() {
                let Some(capability) = select_capability(&**provider) else {
                    debug!(group_index, provider_index, "provider offers no usable representation");
                    continue;
                };

                match self.load_one(Arc::clone(provider), capability).await {
                    Ok(item) => result.push(item),
                    Err(error) => {
                        skipped += 1;
                        warn!(
                            group_index,
                            provider_index,
                            %capability,
                            %error,
                            "skipping attachment"
                        );
                    },
                }
            }
        }

        info!(items = result.len(), skipped, "sequenced attachments");
        result
    }

    /// Dispatch one load and wait for its completion before returning.
    async fn load_one(
        &self,
        provider: Arc<dyn ContentProvider>,
        capability: Capability,
    ) -> Result<SharedItem, ItemError> {
        let (done, completion) = oneshot::channel();
        let materializer = self.materializer.clone();

        tokio::spawn(async move {
            let outcome = match provider.load(capability).await {
                Ok(content) => materialize(&materializer, content).await,
                Err(e) => Err(e),
            };
            // The receiver only disappears if the invocation was discarded.
            let _ = done.send(outcome);
        });

        completion.await.unwrap_or(Err(ItemError::Abandoned))
    }
}

async fn materialize(
    materializer: &Materializer,
    content: LoadedContent,
) -> Result<SharedItem, ItemError> {
    let item = match content {
        LoadedContent::Text(text) => materializer.materialize_text(text),
        LoadedContent::Link(link) => materializer.materialize_link(&link).await?,
        LoadedContent::File(path) => materializer.materialize_file(&path).await?,
        LoadedContent::Data {
            bytes,
            name,
            mime_type,
        } => {
            materializer
                .materialize_data(&bytes, name.as_deref(), mime_type.as_deref())
                .await?
        },
    };
    Ok(item)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use {super::*, async_trait::async_trait};

    use crate::request::RequestAttachment;

    /// Completes after a delay that shrinks with `index`, so any overlap
    /// between loads would reorder results.
    struct SlowText {
        index: usize,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ContentProvider for SlowText {
        fn has_capability(&self, capability: Capability) -> bool {
            capability == Capability::PlainText
        }

        async fn load(&self, _capability: Capability) -> Result<LoadedContent, ItemError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20 - 4 * self.index as u64)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(LoadedContent::Text(format!("item-{}", self.index)))
        }
    }

    struct Failing;

    #[async_trait]
    impl ContentProvider for Failing {
        fn has_capability(&self, capability: Capability) -> bool {
            capability == Capability::Link
        }

        async fn load(&self, _capability: Capability) -> Result<LoadedContent, ItemError> {
            Err(ItemError::load("provider refused"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl ContentProvider for Panicking {
        fn has_capability(&self, _capability: Capability) -> bool {
            true
        }

        async fn load(&self, _capability: Capability) -> Result<LoadedContent, ItemError> {
            panic!("completion handler blew up");
        }
    }

    fn sequencer() -> AttachmentSequencer {
        AttachmentSequencer::new(Materializer::new("/nonexistent-root"))
    }

    fn texts(result: &InvocationResult) -> Vec<&str> {
        result.items().iter().map(|i| i.data.as_str()).collect()
    }

    #[tokio::test]
    async fn loads_are_serialized_and_ordered() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let groups = (0..4)
            .map(|index| {
                AttachmentGroup::single(SlowText {
                    index,
                    in_flight: Arc::clone(&in_flight),
                    max_in_flight: Arc::clone(&max_in_flight),
                })
            })
            .collect();

        let result = sequencer().sequence(groups).await;

        assert_eq!(texts(&result), ["item-0", "item-1", "item-2", "item-3"]);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_item_is_dropped_and_order_kept() {
        let groups = vec![
            AttachmentGroup::single(RequestAttachment::text("first")),
            AttachmentGroup::single(Failing),
            AttachmentGroup::single(RequestAttachment::text("third")),
        ];

        let result = sequencer().sequence(groups).await;
        assert_eq!(texts(&result), ["first", "third"]);
    }

    #[tokio::test]
    async fn file_failure_is_contained() {
        let groups = vec![
            AttachmentGroup::single(RequestAttachment::file("/no/such/photo.jpg")),
            AttachmentGroup::single(RequestAttachment::url("https://example.com")),
        ];

        let result = sequencer().sequence(groups).await;
        assert_eq!(texts(&result), ["https://example.com"]);
    }

    #[tokio::test]
    async fn panicking_provider_still_releases_the_gate() {
        let groups = vec![
            AttachmentGroup::single(Panicking),
            AttachmentGroup::single(RequestAttachment::text("after")),
        ];

        let result = tokio::time::timeout(Duration::from_secs(5), sequencer().sequence(groups))
            .await
            .expect("sequencer must not hang");
        assert_eq!(texts(&result), ["after"]);
    }

    #[tokio::test]
    async fn providers_within_a_group_keep_their_order() {
        let providers: Vec<Arc<dyn ContentProvider>> = vec![
            Arc::new(RequestAttachment::text("a")),
            Arc::new(RequestAttachment::default()),
            Arc::new(RequestAttachment::url("https://b")),
        ];
        let group = AttachmentGroup::new(providers);

        let result = sequencer().sequence(vec![group]).await;
        assert_eq!(texts(&result), ["a", "https://b"]);
    }

    #[tokio::test]
    async fn text_wins_over_other_representations() {
        let attachment = RequestAttachment {
            text: Some("caption".into()),
            url: Some("https://example.com".into()),
            file: Some("/tmp/x.jpg".into()),
            ..RequestAttachment::default()
        };

        let result = sequencer()
            .sequence(vec![AttachmentGroup::single(attachment)])
            .await;
        assert_eq!(texts(&result), ["caption"]);
    }
}
