//! # gcpctl-core
//!
//! Provisioning and teardown of Compute Engine resources (instances,
//! networks, images, firewall rules, disks) with the asynchronous
//! operation lifecycle handled for the caller.
//!
//! Every mutating compute call returns a long-running operation. This crate
//! submits the call, polls the operation to a terminal state under a bounded
//! discipline, turns the outcome into success or a structured [`CoreError`],
//! and records which remote object belongs to which logical name so a later
//! delete hits the right target.
//!
//! ## Layers
//!
//! - [`compute`]: REST client bound to one [`Session`] and one project
//! - [`resource`]: descriptors and request bodies per resource kind
//! - [`progress`]: the operation poller
//! - [`lifecycle`]: create/delete orchestration and IP resolution
//! - [`state`]: logical name to remote id correlation
//! - [`config`], [`session`]: profiles and credentials
//!
//! ## Example
//!
//! ```rust,no_run
//! use gcpctl_core::{
//!     ComputeClient, FileStateStore, InstanceConfig, Lifecycle, PollConfig,
//!     ResourceDescriptor, Session,
//! };
//! use std::time::Duration;
//!
//! # async fn run() -> gcpctl_core::Result<()> {
//! let client = ComputeClient::new(Session::new("ya29.token"), "my-project")?;
//! let lifecycle = Lifecycle::new(
//!     client,
//!     "us-central1-a",
//!     FileStateStore::new("state.json"),
//!     PollConfig::new(Duration::from_secs(300)),
//! );
//!
//! let mut web = ResourceDescriptor::instance(
//!     "web-1",
//!     InstanceConfig::new("projects/debian-cloud/global/images/family/debian-12"),
//! );
//! let id = lifecycle.create(&mut web).await?;
//! println!("created {id}");
//!
//! lifecycle.delete(&mut web).await?;
//! # Ok(())
//! # }
//! ```

pub mod compute;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod progress;
pub mod resource;
pub mod session;
pub mod state;

pub use compute::{
    ComputeClient, Operation, OperationHandle, OperationScope, OperationStatus, DEFAULT_API_URL,
};
pub use config::{Config, ConfigError, CredentialStore, Profile, ProfileCredentials};
pub use error::{CoreError, Result};
pub use lifecycle::{InterfaceSelector, Lifecycle};
pub use progress::{
    OperationSource, PollConfig, ProgressCallback, ProgressEvent, poll_operation,
};
pub use resource::{
    DiskConfig, FirewallAllow, FirewallRuleConfig, ImageConfig, InstanceConfig, NetworkConfig,
    ResourceConfig, ResourceDescriptor, ResourceKind, validate_name,
};
pub use session::{Authenticator, ProfileAuthenticator, Session};
pub use state::{FileStateStore, MemoryStateStore, StateRecord, StateStore};
