//! Configuration Management
//!
//! Persistent defaults for gcp-teardown plus the validated settings of a run.

use crate::error::TeardownError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PASS_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Last used project ID
    #[serde(default)]
    pub project_id: Option<String>,
    /// Last used region
    #[serde(default)]
    pub region: Option<String>,
    /// Delay between convergence passes
    #[serde(default)]
    pub pass_interval_secs: Option<u64>,
    /// Bound on a single provider call
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcp-teardown").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective project (config > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Get effective region (config > gcloud default)
    pub fn effective_region(&self) -> Option<String> {
        self.region
            .clone()
            .or_else(crate::gcp::auth::get_default_region)
    }

    pub fn pass_interval(&self) -> Duration {
        self.pass_interval_secs
            .map_or(DEFAULT_PASS_INTERVAL, Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs)
    }

    /// Remember project and region for the next run
    pub fn remember(&mut self, project_id: &str, region: &str) -> Result<()> {
        self.project_id = Some(project_id.to_string());
        self.region = Some(region.to_string());
        self.save()
    }
}

/// Everything a teardown run is given. The rest is discovered.
#[derive(Debug, Clone)]
pub struct TeardownSettings {
    pub infra_id: String,
    pub project_id: String,
    pub region: String,
    pub pass_interval: Duration,
    pub request_timeout: Duration,
}

impl TeardownSettings {
    pub fn new(infra_id: &str, project_id: &str, region: &str) -> Self {
        Self {
            infra_id: infra_id.to_string(),
            project_id: project_id.to_string(),
            region: region.to_string(),
            pass_interval: DEFAULT_PASS_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_pass_interval(mut self, interval: Duration) -> Self {
        self.pass_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), TeardownError> {
        validate_infra_id(&self.infra_id)?;

        if !crate::gcp::auth::validate_project_id(&self.project_id) {
            return Err(TeardownError::Config(format!(
                "invalid project ID {:?}",
                self.project_id
            )));
        }

        if self.region.trim().is_empty() {
            return Err(TeardownError::Config("region must not be empty".into()));
        }

        if self.request_timeout.is_zero() {
            return Err(TeardownError::Config(
                "request timeout must be positive".into(),
            ));
        }

        Ok(())
    }
}

/// Infra IDs are resource-name prefixes: lowercase letters, digits and
/// hyphens, starting with a letter.
pub fn validate_infra_id(infra_id: &str) -> Result<(), TeardownError> {
    let starts_with_letter = infra_id
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase());
    let valid_chars = infra_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if !starts_with_letter || !valid_chars || infra_id.len() > 63 {
        return Err(TeardownError::Config(format!(
            "invalid infra ID {:?}: expected lowercase letters, digits and hyphens, starting with a letter",
            infra_id
        )));
    }
    Ok(())
}
