//! Scoped access to user-selected source files.
//!
//! Some platforms hand a share extension file references that can only be
//! read between an explicit start/stop access pair. [`ScopedAccess`] ties the
//! stop call to a guard so it runs on every exit path.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::trace;

use crate::error::{Error, Result};

/// Outcome of asking the platform for access to a source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeGrant {
    /// Access was granted and must be released afterwards.
    Granted,
    /// The location is readable without a grant.
    NotRequired,
    /// Access was refused; the source must not be read.
    Denied,
}

pub trait SecurityScope: Send + Sync {
    fn start_accessing(&self, path: &Path) -> ScopeGrant;
    fn stop_accessing(&self, path: &Path);
}

/// Plain filesystem access; nothing to acquire or release.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unscoped;

impl SecurityScope for Unscoped {
    fn start_accessing(&self, _path: &Path) -> ScopeGrant {
        ScopeGrant::NotRequired
    }

    fn stop_accessing(&self, _path: &Path) {}
}

/// Held while a source is being read. Releases a granted scope on drop.
#[must_use = "access is released as soon as the guard is dropped"]
pub struct ScopedAccess {
    scope: Arc<dyn SecurityScope>,
    path: PathBuf,
    granted: bool,
}

impl ScopedAccess {
    pub fn acquire(scope: Arc<dyn SecurityScope>, path: &Path) -> Result<Self> {
        let granted = match scope.start_accessing(path) {
            ScopeGrant::Granted => true,
            ScopeGrant::NotRequired => false,
            ScopeGrant::Denied => {
                return Err(Error::AccessDenied {
                    path: path.to_path_buf(),
                });
            },
        };
        trace!(path = %path.display(), granted, "acquired source access");
        Ok(Self {
            scope,
            path: path.to_path_buf(),
            granted,
        })
    }
}

impl Drop for ScopedAccess {
    fn drop(&mut self) {
        if self.granted {
            self.scope.stop_accessing(&self.path);
            trace!(path = %self.path.display(), "released source access");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Counts start/stop calls and answers with a fixed grant.
    pub struct CountingScope {
        pub grant: ScopeGrant,
        pub started: AtomicUsize,
        pub stopped: AtomicUsize,
    }

    impl CountingScope {
        pub fn new(grant: ScopeGrant) -> Arc<Self> {
            Arc::new(Self {
                grant,
                started: AtomicUsize::new(0),
                stopped: AtomicUsize::new(0),
            })
        }

        pub fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }

        pub fn stopped(&self) -> usize {
            self.stopped.load(Ordering::SeqCst)
        }
    }

    impl SecurityScope for CountingScope {
        fn start_accessing(&self, _path: &Path) -> ScopeGrant {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.grant
        }

        fn stop_accessing(&self, _path: &Path) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}
