//! Top-level invocation driver.
//!
//! ```text
//! Idle → ConfigLoaded → ItemsRead → Sequencing → Published → Completed
//!   └──────────┴────────────┴───────────┴────────────┴──→ Cancelled
//! ```
//!
//! The first error is terminal; nothing is retried.

use std::{fmt, path::PathBuf, sync::Arc};

use {
    sharebridge_config::{ShareConfig, data_dir, wake_uri},
    sharebridge_media::{Materializer, SecurityScope, Unscoped},
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{
    container::{ContainerResolver, DirectoryContainers},
    error::{ConfigError, InvocationError},
    publisher::{DisabledWaker, HandoffPublisher, HostWaker, SystemOpener},
    request::IncomingRequest,
    sequencer::AttachmentSequencer,
    store::{JsonStoreOpener, StoreOpener},
};

/// Supplies the two host values read at the start of every invocation.
pub trait ConfigSource: Send + Sync {
    fn host_app_id(&self) -> Option<String>;
    fn host_url_scheme(&self) -> Option<String>;
}

impl ConfigSource for ShareConfig {
    fn host_app_id(&self) -> Option<String> {
        self.host.app_id.clone()
    }

    fn host_url_scheme(&self) -> Option<String> {
        self.host.url_scheme.clone()
    }
}

/// The OS side of an invocation. Exactly one of the two methods is called.
pub trait ExtensionContext: Send + Sync {
    fn complete_request(&self);
    fn cancel_request(&self, domain: &'static str, error: &InvocationError);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Idle,
    ConfigLoaded,
    ItemsRead,
    Sequencing,
    Published,
    Completed,
    Cancelled,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of a completed invocation.
#[derive(Debug, Clone)]
pub struct InvocationReport {
    pub items: usize,
    pub storage_root: PathBuf,
    /// Whether the open call reported success. Completion does not depend on it.
    pub woke: bool,
    pub history: Vec<InvocationState>,
}

/// Containers are unavailable when no base directory could be determined.
struct NoContainers;

impl ContainerResolver for NoContainers {
    fn container_for(&self, group_id: &str) -> Option<PathBuf> {
        warn!(group_id, "no containers directory configured");
        None
    }
}

pub struct InvocationController {
    config: ShareConfig,
    source: Arc<dyn ConfigSource>,
    containers: Arc<dyn ContainerResolver>,
    store_opener: Option<Arc<dyn StoreOpener>>,
    waker: Arc<dyn HostWaker>,
    scope: Arc<dyn SecurityScope>,
}

impl InvocationController {
    /// Build a controller with the local collaborators implied by `config`.
    pub fn new(config: ShareConfig) -> Self {
        let containers: Arc<dyn ContainerResolver> = match config
            .storage
            .containers_dir
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("containers")))
        {
            Some(base) => Arc::new(DirectoryContainers::new(base)),
            None => Arc::new(NoContainers),
        };
        let waker: Arc<dyn HostWaker> = if config.handoff.wake {
            Arc::new(SystemOpener)
        } else {
            Arc::new(DisabledWaker)
        };

        Self {
            source: Arc::new(config.clone()),
            config,
            containers,
            store_opener: None,
            waker,
            scope: Arc::new(Unscoped),
        }
    }

    #[must_use]
    pub fn with_config_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_containers(mut self, containers: Arc<dyn ContainerResolver>) -> Self {
        self.containers = containers;
        self
    }

    #[must_use]
    pub fn with_store_opener(mut self, opener: Arc<dyn StoreOpener>) -> Self {
        self.store_opener = Some(opener);
        self
    }

    #[must_use]
    pub fn with_waker(mut self, waker: Arc<dyn HostWaker>) -> Self {
        self.waker = waker;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Arc<dyn SecurityScope>) -> Self {
        self.scope = scope;
        self
    }

    /// Run one invocation and report the outcome to `context`.
    pub async fn execute(
        &self,
        request: &dyn IncomingRequest,
        context: &dyn ExtensionContext,
    ) -> Result<InvocationReport, InvocationError> {
        let outcome = self.run(request).await;
        match &outcome {
            Ok(_) => context.complete_request(),
            Err(error) => context.cancel_request(error.domain(), error),
        }
        outcome
    }

    /// Drive one invocation through every state.
    pub async fn run(
        &self,
        request: &dyn IncomingRequest,
    ) -> Result<InvocationReport, InvocationError> {
        self.run_with_history(request).await.0
    }

    /// Like [`run`](Self::run), but also returns the states visited. A
    /// cancelled invocation ends its history with `Cancelled`.
    pub async fn run_with_history(
        &self,
        request: &dyn IncomingRequest,
    ) -> (
        Result<InvocationReport, InvocationError>,
        Vec<InvocationState>,
    ) {
        let mut history = vec![InvocationState::Idle];
        let outcome = self.drive(request, &mut history).await;
        match outcome {
            Ok(report) => {
                let history = report.history.clone();
                (Ok(report), history)
            },
            Err(error) => {
                let from = history.last().copied().unwrap_or(InvocationState::Idle);
                advance(&mut history, InvocationState::Cancelled);
                warn!(state = %from, domain = error.domain(), %error, "invocation cancelled");
                (Err(error), history)
            },
        }
    }

    async fn drive(
        &self,
        request: &dyn IncomingRequest,
        history: &mut Vec<InvocationState>,
    ) -> Result<InvocationReport, InvocationError> {
        let (app_id, uri) = self.read_config()?;
        advance(history, InvocationState::ConfigLoaded);

        let groups = request.attachment_groups()?;
        advance(history, InvocationState::ItemsRead);

        let group_id = self.config.storage.group_id(&app_id);
        let storage_root = self
            .containers
            .container_for(&group_id)
            .ok_or_else(|| InvocationError::NoAppGroup {
                group_id: group_id.clone(),
            })?;

        advance(history, InvocationState::Sequencing);
        let materializer = Materializer::new(&storage_root)
            .with_location_style(self.config.storage.location_style)
            .with_scope(Arc::clone(&self.scope));
        let mut result = AttachmentSequencer::new(materializer)
            .sequence(groups)
            .await;
        result.set_auxiliary_text(request.auxiliary_text());

        let opener: Arc<dyn StoreOpener> = match &self.store_opener {
            Some(opener) => Arc::clone(opener),
            None => {
                let stem = self.config.storage.store_name.clone().unwrap_or(group_id);
                Arc::new(JsonStoreOpener::new(stem))
            },
        };
        let publisher = HandoffPublisher::new(opener, Arc::clone(&self.waker))
            .with_keys(&self.config.handoff.items_key, &self.config.handoff.extra_key);
        let items = publisher.publish(result, &storage_root).await?;
        advance(history, InvocationState::Published);

        let woke = publisher.wake(&uri).await;
        advance(history, InvocationState::Completed);

        info!(items, root = %storage_root.display(), woke, "handoff complete");
        Ok(InvocationReport {
            items,
            storage_root,
            woke,
            history: std::mem::take(history),
        })
    }

    /// Read both host values. The wake-up URI is parsed and the store keys
    /// are checked here so a bad config cancels before anything is written.
    fn read_config(&self) -> Result<(String, Url), ConfigError> {
        let handoff = &self.config.handoff;
        if handoff.items_key == handoff.extra_key {
            return Err(ConfigError::CollidingKeys {
                key: handoff.items_key.clone(),
            });
        }

        let app_id = self
            .source
            .host_app_id()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingHostAppId)?;
        let scheme = self
            .source
            .host_url_scheme()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingUrlScheme)?;
        let uri = wake_uri(&scheme)?;
        Ok((app_id, uri))
    }
}

fn advance(history: &mut Vec<InvocationState>, next: InvocationState) {
    if let Some(from) = history.last() {
        debug!(from = %from, to = %next, "invocation state");
    }
    history.push(next);
}
