//! Media pipeline: MIME classification and materialization of shared content
//! into the host's shared storage root.

pub mod error;
pub mod mime;
pub mod scope;
pub mod store;

pub use {
    error::{Error, MaterializationError, Result},
    mime::{DEFAULT_MIME, classify, extension_for_mime},
    scope::{ScopeGrant, ScopedAccess, SecurityScope, Unscoped},
    store::Materializer,
};
