//! Config schema types (host identity, shared storage, handoff keys).
use std::path::PathBuf;

use {
    serde::{Deserialize, Serialize},
    sharebridge_common::{LocationStyle, keys},
    url::Url,
};

use crate::error::{Error, Result};

/// Default prefix joined to the host application identifier to name the
/// shared group container.
pub const DEFAULT_GROUP_PREFIX: &str = "group.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    pub host: HostConfig,
    pub storage: StorageConfig,
    pub handoff: HandoffConfig,
}

/// Identity of the application that consumes shared items.
///
/// Both values are optional here; their absence is an invocation-time error,
/// not a load-time one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Host application identifier, e.g. `com.example.notes`.
    pub app_id: Option<String>,
    /// Wake-up address, either a full URI (`notes://`) or a bare scheme.
    pub url_scheme: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory under which group containers are provisioned.
    /// Defaults to `<data_dir>/containers`.
    pub containers_dir: Option<PathBuf>,
    pub group_prefix: String,
    /// File stem of the shared key/value store inside the container.
    /// Defaults to the group identifier.
    pub store_name: Option<String>,
    pub location_style: LocationStyle,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            containers_dir: None,
            group_prefix: DEFAULT_GROUP_PREFIX.into(),
            store_name: None,
            location_style: LocationStyle::default(),
        }
    }
}

impl StorageConfig {
    /// Group identifier for the given host application, e.g. `group.com.example.notes`.
    pub fn group_id(&self, app_id: &str) -> String {
        format!("{}{app_id}", self.group_prefix)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    pub items_key: String,
    pub extra_key: String,
    /// Whether to invoke the OS open facility after publishing.
    pub wake: bool,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            items_key: keys::DEFAULT_ITEMS_KEY.into(),
            extra_key: keys::DEFAULT_EXTRA_KEY.into(),
            wake: true,
        }
    }
}

/// Build the wake-up URI from a configured address.
///
/// A bare scheme (`notes`) is normalised to `notes://`.
pub fn wake_uri(address: &str) -> Result<Url> {
    let address = address.trim();
    let candidate = if !address.is_empty() && !address.contains(':') {
        format!("{address}://")
    } else {
        address.to_owned()
    };
    Url::parse(&candidate).map_err(|source| Error::InvalidWakeUri {
        address: address.to_owned(),
        source,
    })
}
