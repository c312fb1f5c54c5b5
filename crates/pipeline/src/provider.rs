//! Content providers and attachment groups.
//!
//! A provider may offer the same content in several representations. Exactly
//! one is used, chosen by [`Capability::PRIORITY`].

use std::{fmt, path::PathBuf, sync::Arc};

use async_trait::async_trait;

use crate::error::ItemError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    PlainText,
    Link,
    FileReference,
    GenericData,
}

impl Capability {
    /// Selection order, highest first.
    pub const PRIORITY: [Capability; 4] = [
        Self::PlainText,
        Self::Link,
        Self::FileReference,
        Self::GenericData,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PlainText => "plain-text",
            Self::Link => "link",
            Self::FileReference => "file-reference",
            Self::GenericData => "generic-data",
        };
        f.write_str(name)
    }
}

/// What a provider hands back once its load completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedContent {
    Text(String),
    Link(String),
    File(PathBuf),
    Data {
        bytes: Vec<u8>,
        name: Option<String>,
        mime_type: Option<String>,
    },
}

#[async_trait]
pub trait ContentProvider: Send + Sync {
    fn has_capability(&self, capability: Capability) -> bool;

    /// Load the representation for `capability`. Only called with a
    /// capability the provider reported.
    async fn load(&self, capability: Capability) -> Result<LoadedContent, ItemError>;
}

/// The highest-priority capability `provider` offers, if any.
pub fn select_capability(provider: &dyn ContentProvider) -> Option<Capability> {
    Capability::PRIORITY
        .into_iter()
        .find(|c| provider.has_capability(*c))
}

/// One shared thing from the share sheet: an ordered list of providers.
#[derive(Clone, Default)]
pub struct AttachmentGroup {
    providers: Vec<Arc<dyn ContentProvider>>,
}

impl AttachmentGroup {
    pub fn new(providers: Vec<Arc<dyn ContentProvider>>) -> Self {
        Self { providers }
    }

    /// A group holding a single provider.
    pub fn single(provider: impl ContentProvider + 'static) -> Self {
        Self {
            providers: vec![Arc::new(provider)],
        }
    }

    pub fn providers(&self) -> &[Arc<dyn ContentProvider>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for AttachmentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentGroup")
            .field("providers", &self.providers.len())
            .finish()
    }
}
