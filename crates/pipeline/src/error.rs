use std::path::PathBuf;

/// One of the two host configuration values is missing or unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("host application identifier is not configured")]
    MissingHostAppId,
    #[error("host wake-up address is not configured")]
    MissingUrlScheme,
    #[error(transparent)]
    InvalidUrlScheme(#[from] sharebridge_config::Error),
    #[error("items and auxiliary text share the store key `{key}`")]
    CollidingKeys { key: String },
}

/// Failures that end an invocation. Each maps to the error domain reported
/// to the OS when the request is cancelled.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("incoming request has no readable attachments: {reason}")]
    NoAttachments { reason: String },
    #[error("shared storage for `{group_id}` is unavailable")]
    NoAppGroup { group_id: String },
    #[error("failed to publish to the shared store: {source}")]
    Publish {
        #[source]
        source: StoreError,
    },
}

impl InvocationError {
    #[must_use]
    pub fn no_attachments(reason: impl Into<String>) -> Self {
        Self::NoAttachments {
            reason: reason.into(),
        }
    }

    /// Stable error-domain name reported when the request is cancelled.
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::NoAttachments { .. } => "NoAttachmentsError",
            Self::NoAppGroup { .. } => "NoAppGroupError",
            Self::Publish { .. } => "PublishError",
        }
    }
}

impl From<StoreError> for InvocationError {
    fn from(source: StoreError) -> Self {
        Self::Publish { source }
    }
}

/// A single provider could not be turned into a shared item. Contained by
/// the sequencer: logged, and the item is left out.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("content load failed: {reason}")]
    Load { reason: String },
    #[error("content load completed without a result")]
    Abandoned,
    #[error(transparent)]
    Materialize(#[from] sharebridge_media::Error),
}

impl ItemError {
    #[must_use]
    pub fn load(reason: impl Into<String>) -> Self {
        Self::Load {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_follow_taxonomy() {
        assert_eq!(
            InvocationError::from(ConfigError::MissingHostAppId).domain(),
            "ConfigError"
        );
        assert_eq!(
            InvocationError::no_attachments("x").domain(),
            "NoAttachmentsError"
        );
        assert_eq!(
            InvocationError::NoAppGroup {
                group_id: "group.a".into()
            }
            .domain(),
            "NoAppGroupError"
        );
        let store = StoreError::io("/x", std::io::Error::other("denied"));
        assert_eq!(InvocationError::from(store).domain(), "PublishError");
    }
}
