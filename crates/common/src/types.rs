//! The records handed from the share pipeline to the host application.

use serde::{Deserialize, Serialize};

/// Persisted-key names shared with the host application.
pub mod keys {
    /// Store key holding the ordered list of [`SharedItem`](super::SharedItem)s.
    pub const DEFAULT_ITEMS_KEY: &str = "ShareMenuUserDefaults";
    /// Store key holding the optional [`AuxiliaryText`](super::AuxiliaryText).
    pub const DEFAULT_EXTRA_KEY: &str = "ShareMenuUserDefaultsExtraData";
    pub const DATA_KEY: &str = "data";
    pub const MIME_TYPE_KEY: &str = "mimeType";
    pub const FILE_NAME_KEY: &str = "fileName";
}

pub const TEXT_PLAIN: &str = "text/plain";

/// How a materialized file's location is written into [`SharedItem::data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStyle {
    /// Plain absolute filesystem path.
    #[default]
    Path,
    /// `file://` URL.
    FileUrl,
}

/// One normalized unit of shared content.
///
/// `data` is either inline text or the absolute location of a file the
/// pipeline materialized inside shared storage. `file_name` is only set for
/// file-backed items and carries the source's original base name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedItem {
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(
        default,
        rename = "fileName",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_name: Option<String>,
}

impl SharedItem {
    /// Inline text content with a `text/plain` mime type.
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: TEXT_PLAIN.to_owned(),
            file_name: None,
        }
    }

    /// A file materialized into shared storage.
    pub fn file(
        location: impl Into<String>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            data: location.into(),
            mime_type: mime_type.into(),
            file_name: Some(file_name.into()),
        }
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }
}

/// Free-form text the user typed alongside the shared content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryText {
    pub text: String,
}

/// The aggregated output of one share invocation.
///
/// Items are appended in completion order, which the sequencer guarantees is
/// source order. Handed by value to the publisher once sequencing ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationResult {
    items: Vec<SharedItem>,
    auxiliary_text: Option<AuxiliaryText>,
}

impl InvocationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: SharedItem) {
        self.items.push(item);
    }

    /// Attach composer text. Blank text is treated as absent.
    pub fn set_auxiliary_text(&mut self, text: Option<String>) {
        self.auxiliary_text = text
            .filter(|t| !t.trim().is_empty())
            .map(|text| AuxiliaryText { text });
    }

    pub fn items(&self) -> &[SharedItem] {
        &self.items
    }

    pub fn auxiliary_text(&self) -> Option<&AuxiliaryText> {
        self.auxiliary_text.as_ref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_parts(self) -> (Vec<SharedItem>, Option<AuxiliaryText>) {
        (self.items, self.auxiliary_text)
    }
}
