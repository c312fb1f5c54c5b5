//! Group-container lookup: maps a group identifier to the shared storage
//! root both this process and the host application can reach.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub trait ContainerResolver: Send + Sync {
    /// The shared storage root for `group_id`, or `None` when the group
    /// container is not available to this process.
    fn container_for(&self, group_id: &str) -> Option<PathBuf>;
}

/// Provisions containers as `<base>/<group_id>` directories.
#[derive(Debug, Clone)]
pub struct DirectoryContainers {
    base: PathBuf,
}

impl DirectoryContainers {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl ContainerResolver for DirectoryContainers {
    fn container_for(&self, group_id: &str) -> Option<PathBuf> {
        if group_id.is_empty() || group_id.contains(['/', '\\']) || group_id == ".." {
            warn!(group_id, "refusing group identifier that is not a single path segment");
            return None;
        }
        let root = self.base.join(group_id);
        match std::fs::create_dir_all(&root) {
            Ok(()) => {
                debug!(root = %root.display(), "resolved group container");
                Some(root)
            },
            Err(e) => {
                warn!(root = %root.display(), error = %e, "group container unavailable");
                None
            },
        }
    }
}
