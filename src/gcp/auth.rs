//! GCP Authentication
//!
//! Handles authentication using Application Default Credentials (ADC),
//! service account keys, or gcloud CLI credentials, and reads project and
//! region defaults from the gcloud configuration.

use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Environment variable holding a pre-minted access token
pub const ACCESS_TOKEN_ENV: &str = "GCP_TEARDOWN_ACCESS_TOKEN";

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
enum TokenSource {
    Provider(Arc<dyn TokenProvider>),
    Static(String),
}

/// GCP credentials holder with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    source: TokenSource,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    /// Check if this cached token is still valid
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    /// Create new GCP credentials.
    ///
    /// Uses `GCP_TEARDOWN_ACCESS_TOKEN` when set, Application Default
    /// Credentials otherwise.
    pub async fn new() -> Result<Self> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                tracing::info!("Using access token from {}", ACCESS_TOKEN_ENV);
                return Ok(Self::from_static_token(token.trim()));
            }
        }

        let provider = gcp_auth::provider().await.context(
            "Failed to initialize GCP authentication. Run 'gcloud auth application-default login'",
        )?;
        tracing::info!("Using Application Default Credentials");

        Ok(Self {
            source: TokenSource::Provider(provider),
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Credentials that always hand out the same bearer token
    pub fn from_static_token(token: &str) -> Self {
        Self {
            source: TokenSource::Static(token.to_string()),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for API calls
    /// Security: Checks token expiry before returning cached token
    pub async fn get_token(&self) -> Result<String> {
        let provider = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Provider(provider) => provider,
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = provider
            .token(DEFAULT_SCOPES)
            .await
            .context("Failed to get access token")?;

        let token_str = token.as_str().to_string();
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    // Check CLOUDSDK_CONFIG environment variable first
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }

    // Default to ~/.config/gcloud on Linux/macOS
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
pub fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }

    match project.chars().next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }

    if project.ends_with('-') {
        return false;
    }

    project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Read `key` from `[section]` of an INI-style gcloud file
fn read_ini_value(content: &str, section: &str, key: &str) -> Option<String> {
    let header = format!("[{}]", section);
    let mut in_section = false;

    for line in content.lines() {
        let line = line.trim();
        // Security: Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_section = line == header;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                return Some(v.trim().to_string());
            }
        }
    }

    None
}

/// Read a value from the active gcloud configuration
fn read_active_config_value(section: &str, key: &str) -> Option<String> {
    let config_dir = get_gcloud_config_dir()?;

    if let Ok(content) = std::fs::read_to_string(config_dir.join("properties")) {
        if let Some(value) = read_ini_value(&content, section, key) {
            return Some(value);
        }
    }

    let active_config = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let config_name = active_config.trim();

    // Security: Validate config name to prevent path traversal
    if !config_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        tracing::warn!("Invalid characters in active_config name");
        return None;
    }

    let config_path = config_dir
        .join("configurations")
        .join(format!("config_{}", config_name));

    let content = std::fs::read_to_string(config_path).ok()?;
    read_ini_value(&content, section, key)
}

/// Read the default project from environment or gcloud configuration
/// Security: Validates project ID format before returning
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    read_active_config_value("core", "project").filter(|p| validate_project_id(p))
}

/// Get the default region from environment or gcloud configuration
pub fn get_default_region() -> Option<String> {
    if let Ok(region) = std::env::var("CLOUDSDK_COMPUTE_REGION") {
        if !region.is_empty() {
            return Some(region);
        }
    }

    read_active_config_value("compute", "region")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_id() {
        assert!(validate_project_id("my-project-123"));
        assert!(!validate_project_id("short"));
        assert!(!validate_project_id("1starts-with-digit"));
        assert!(!validate_project_id("ends-with-hyphen-"));
        assert!(!validate_project_id("Upper-Case-Project"));
    }

    #[test]
    fn test_read_ini_value_respects_sections() {
        let content = "[core]\nproject = my-project\n\n[compute]\nregion = us-east1\nzone=us-east1-b\n";
        assert_eq!(read_ini_value(content, "core", "project").as_deref(), Some("my-project"));
        assert_eq!(read_ini_value(content, "compute", "region").as_deref(), Some("us-east1"));
        assert_eq!(read_ini_value(content, "compute", "zone").as_deref(), Some("us-east1-b"));
        assert_eq!(read_ini_value(content, "core", "region"), None);
    }

    #[test]
    fn test_read_ini_value_skips_comments() {
        let content = "[core]\n# project = commented\n; project = also\nproject=real-project\n";
        assert_eq!(read_ini_value(content, "core", "project").as_deref(), Some("real-project"));
    }

    #[tokio::test]
    async fn test_static_token() {
        let creds = GcpCredentials::from_static_token("abc");
        assert_eq!(creds.get_token().await.unwrap(), "abc");
    }
}
