//! gcp-teardown
//!
//! Deletes every Google Cloud resource belonging to one cluster, given only
//! its infra ID, project and region. Ownership is inferred from naming and
//! structural references, deletions are retried with stable request IDs,
//! and passes repeat until the project is clean.
//!
//! # Architecture
//!
//! - [`gcp`] - Credentials, HTTP and endpoint URLs
//! - [`resource`] - Resource model, pending items, quota and request IDs
//! - [`driver`] - Per-type list/delete adapters behind one trait
//! - [`destroy`] - Ownership, discovery, step graph and convergence loop
//! - [`config`] - Persistent defaults and run settings
//! - [`error`] - Provider and run-level error types

pub mod config;
pub mod destroy;
pub mod driver;
pub mod error;
pub mod gcp;
pub mod resource;

pub use config::{Config, TeardownSettings};
pub use destroy::{Reconciler, TeardownSummary};
pub use driver::DriverSet;
pub use error::{ProviderError, TeardownError};
