//! The share-extension pipeline.
//!
//! One invocation reads the host configuration, reads the incoming
//! attachment groups, loads every content provider one at a time into an
//! ordered [`InvocationResult`], publishes it to the host's shared store and
//! wakes the host application.
//!
//! [`InvocationResult`]: sharebridge_common::InvocationResult

pub mod container;
pub mod controller;
pub mod error;
pub mod provider;
pub mod publisher;
pub mod request;
pub mod sequencer;
pub mod store;

pub use {
    container::{ContainerResolver, DirectoryContainers},
    controller::{
        ConfigSource, ExtensionContext, InvocationController, InvocationReport, InvocationState,
    },
    error::{ConfigError, InvocationError, ItemError, StoreError},
    provider::{AttachmentGroup, Capability, ContentProvider, LoadedContent},
    publisher::{DisabledWaker, HandoffPublisher, HostWaker, SystemOpener},
    request::{IncomingRequest, JsonRequest, RequestAttachment, ShareRequest},
    sequencer::AttachmentSequencer,
    store::{JsonFileStore, JsonStoreOpener, SharedStore, StoreOpener},
};
