//! Incoming share requests.
//!
//! The JSON form is what the CLI and the native bridge receive:
//!
//! ```json
//! {
//!   "groups": [ { "attachments": [ { "text": "hello" }, { "file": "/tmp/a.jpg" } ] } ],
//!   "auxiliary_text": "optional"
//! }
//! ```

use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    base64::{Engine as _, engine::general_purpose::STANDARD},
    serde::Deserialize,
    serde_json::Value,
};

use crate::{
    error::{InvocationError, ItemError},
    provider::{AttachmentGroup, Capability, ContentProvider, LoadedContent},
};

/// The request handed to an invocation by the OS share action.
pub trait IncomingRequest: Send + Sync {
    /// The ordered attachment groups. Fails when the payload is malformed.
    fn attachment_groups(&self) -> Result<Vec<AttachmentGroup>, InvocationError>;

    fn auxiliary_text(&self) -> Option<String>;
}

/// One attachment of a JSON request. Every populated field is a separate
/// representation of the same content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestAttachment {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Base64-encoded bytes.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl RequestAttachment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ContentProvider for RequestAttachment {
    fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::PlainText => self.text.is_some(),
            Capability::Link => self.url.is_some(),
            Capability::FileReference => self.file.is_some(),
            Capability::GenericData => self.data.is_some(),
        }
    }

    async fn load(&self, capability: Capability) -> Result<LoadedContent, ItemError> {
        let missing = || ItemError::load(format!("no {capability} representation"));
        match capability {
            Capability::PlainText => self.text.clone().map(LoadedContent::Text).ok_or_else(missing),
            Capability::Link => self.url.clone().map(LoadedContent::Link).ok_or_else(missing),
            Capability::FileReference => {
                self.file.clone().map(LoadedContent::File).ok_or_else(missing)
            },
            Capability::GenericData => {
                let encoded = self.data.as_deref().ok_or_else(missing)?;
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| ItemError::load(format!("invalid base64 data: {e}")))?;
                Ok(LoadedContent::Data {
                    bytes,
                    name: self.name.clone(),
                    mime_type: self.mime_type.clone(),
                })
            },
        }
    }
}

/// An already-structured request.
#[derive(Debug, Clone, Default)]
pub struct ShareRequest {
    pub groups: Vec<AttachmentGroup>,
    pub auxiliary_text: Option<String>,
}

impl ShareRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `provider` as its own attachment group.
    #[must_use]
    pub fn with(mut self, provider: impl ContentProvider + 'static) -> Self {
        self.groups.push(AttachmentGroup::single(provider));
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: AttachmentGroup) -> Self {
        self.groups.push(group);
        self
    }

    #[must_use]
    pub fn with_auxiliary_text(mut self, text: impl Into<String>) -> Self {
        self.auxiliary_text = Some(text.into());
        self
    }
}

impl IncomingRequest for ShareRequest {
    fn attachment_groups(&self) -> Result<Vec<AttachmentGroup>, InvocationError> {
        Ok(self.groups.clone())
    }

    fn auxiliary_text(&self) -> Option<String> {
        self.auxiliary_text.clone()
    }
}

/// A raw JSON request. Neither the syntax nor the shape is checked until the
/// groups are read, so a broken payload fails at `ItemsRead`.
#[derive(Debug, Clone)]
pub struct JsonRequest(Result<Value, String>);

impl JsonRequest {
    pub fn new(value: Value) -> Self {
        Self(Ok(value))
    }

    /// Keep `raw` as given. A syntax error is reported by
    /// [`IncomingRequest::attachment_groups`].
    pub fn parse(raw: &str) -> Self {
        Self(serde_json::from_str(raw).map_err(|e| e.to_string()))
    }

    /// The parsed payload, if `raw` was JSON.
    pub fn value(&self) -> Option<&Value> {
        self.0.as_ref().ok()
    }
}

impl IncomingRequest for JsonRequest {
    fn attachment_groups(&self) -> Result<Vec<AttachmentGroup>, InvocationError> {
        let value = self.0.as_ref().map_err(|e| {
            InvocationError::no_attachments(format!("request is not JSON: {e}"))
        })?;
        let groups = value
            .get("groups")
            .and_then(Value::as_array)
            .ok_or_else(|| InvocationError::no_attachments("missing `groups` array"))?;

        groups
            .iter()
            .enumerate()
            .map(|(index, group)| -> Result<AttachmentGroup, InvocationError> {
                let attachments = group
                    .get("attachments")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        InvocationError::no_attachments(format!(
                            "group {index} has no `attachments` array"
                        ))
                    })?;
                let providers = attachments
                    .iter()
                    .map(|raw| {
                        serde_json::from_value::<RequestAttachment>(raw.clone())
                            .map(|a| Arc::new(a) as Arc<dyn ContentProvider>)
                            .map_err(|e| {
                                InvocationError::no_attachments(format!(
                                    "group {index} has a malformed attachment: {e}"
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AttachmentGroup::new(providers))
            })
            .collect()
    }

    fn auxiliary_text(&self) -> Option<String> {
        self.value()?
            .get("auxiliary_text")
            .and_then(Value::as_str)
            .map(str::to_owned)
    }
}
