//! Handoff: write the ordered items to the shared store, then wake the host.

use std::{path::Path, sync::Arc};

use {
    async_trait::async_trait,
    sharebridge_common::{InvocationResult, keys},
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{
    error::{InvocationError, StoreError},
    store::StoreOpener,
};

/// Asks the OS to open the host application.
#[async_trait]
pub trait HostWaker: Send + Sync {
    /// Resolves once the open call has completed. The return value is the
    /// call's reported success; the handoff does not depend on it.
    async fn wake(&self, uri: &Url) -> bool;
}

/// Opens the URI with the platform handler (`open`, `xdg-open`, `start`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

#[async_trait]
impl HostWaker for SystemOpener {
    async fn wake(&self, uri: &Url) -> bool {
        let target = uri.to_string();
        match tokio::task::spawn_blocking(move || open::that(&target)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(uri = %uri, error = %e, "host wake-up failed");
                false
            },
            Err(e) => {
                warn!(uri = %uri, error = %e, "host wake-up task failed");
                false
            },
        }
    }
}

/// Skips the open call entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledWaker;

#[async_trait]
impl HostWaker for DisabledWaker {
    async fn wake(&self, uri: &Url) -> bool {
        debug!(uri = %uri, "host wake-up disabled");
        false
    }
}

pub struct HandoffPublisher {
    opener: Arc<dyn StoreOpener>,
    waker: Arc<dyn HostWaker>,
    items_key: String,
    extra_key: String,
}

impl HandoffPublisher {
    pub fn new(opener: Arc<dyn StoreOpener>, waker: Arc<dyn HostWaker>) -> Self {
        Self {
            opener,
            waker,
            items_key: keys::DEFAULT_ITEMS_KEY.into(),
            extra_key: keys::DEFAULT_EXTRA_KEY.into(),
        }
    }

    #[must_use]
    pub fn with_keys(mut self, items_key: impl Into<String>, extra_key: impl Into<String>) -> Self {
        self.items_key = items_key.into();
        self.extra_key = extra_key.into();
        self
    }

    /// Write `result` into the shared store under `storage_root`.
    ///
    /// The auxiliary key is cleared when there is no auxiliary text, so a
    /// previous invocation's text is never picked up again.
    pub async fn publish(
        &self,
        result: InvocationResult,
        storage_root: &Path,
    ) -> Result<usize, InvocationError> {
        let store = self.opener.open(storage_root).await?;
        let (items, auxiliary_text) = result.into_parts();
        let count = items.len();

        store
            .set(&self.items_key, serde_json::to_value(&items).map_err(StoreError::from)?)
            .await?;
        match auxiliary_text {
            Some(aux) => {
                store
                    .set(&self.extra_key, serde_json::to_value(&aux).map_err(StoreError::from)?)
                    .await?;
            },
            None => store.remove(&self.extra_key).await?,
        }
        store.synchronize().await?;

        debug!(
            root = %storage_root.display(),
            items = count,
            key = %self.items_key,
            "published shared items"
        );
        Ok(count)
    }

    /// Issue the wake-up call and wait for it to complete.
    pub async fn wake(&self, uri: &Url) -> bool {
        let opened = self.waker.wake(uri).await;
        info!(uri = %uri, opened, "host wake-up issued");
        opened
    }
}
