//! GCP API interaction module
//!
//! This module provides the plumbing for talking to Google Cloud Platform
//! REST APIs: authentication, the HTTP client, and URL construction.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication and gcloud configuration defaults
//! - [`client`] - Main GCP client for making API requests
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use crate::gcp::client::GcpClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new("my-project", "us-central1", Duration::from_secs(120)).await?;
//!     let networks = client.get(&client.compute_global_url("networks")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
