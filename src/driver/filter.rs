//! List filters
//!
//! A [`ListFilter`] is the ownership predicate handed to a driver's `list`.
//! Drivers render it into the provider's filter syntax where the API has
//! one, and always re-check it locally with [`ListFilter::matches`].

use crate::error::TeardownError;
use crate::resource::{normalize_resource_url, CloudResource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    /// Every resource of the type.
    All,
    /// Name starts with the given prefix.
    NamePrefix(String),
    /// Name equals the given value.
    NameEquals(String),
    /// Resource belongs to the network with this self link.
    Network(String),
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

impl ListFilter {
    pub fn name_prefix(prefix: &str) -> Result<Self, TeardownError> {
        if prefix.is_empty() || !prefix.chars().all(is_name_char) {
            return Err(TeardownError::MalformedFilter(format!(
                "invalid name prefix {:?}",
                prefix
            )));
        }
        Ok(Self::NamePrefix(prefix.to_string()))
    }

    pub fn name_equals(name: &str) -> Result<Self, TeardownError> {
        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(TeardownError::MalformedFilter(format!(
                "invalid resource name {:?}",
                name
            )));
        }
        Ok(Self::NameEquals(name.to_string()))
    }

    pub fn network(url: &str) -> Result<Self, TeardownError> {
        if url.is_empty() || url.contains('"') || url.chars().any(char::is_whitespace) {
            return Err(TeardownError::MalformedFilter(format!(
                "invalid network URL {:?}",
                url
            )));
        }
        Ok(Self::Network(url.to_string()))
    }

    /// Compute Engine filter expression, `None` for [`ListFilter::All`].
    ///
    /// `eq` takes an RE2 expression that must match the whole field.
    pub fn compute_expression(&self) -> Option<String> {
        match self {
            Self::All => None,
            Self::NamePrefix(prefix) => Some(format!("name eq \"{}.*\"", prefix)),
            Self::NameEquals(name) => Some(format!("name eq \"{}\"", name)),
            Self::Network(url) => Some(format!("network eq \"{}\"", url)),
        }
    }

    /// Name prefix usable as a server-side `prefix` parameter.
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::NamePrefix(prefix) | Self::NameEquals(prefix) => Some(prefix),
            _ => None,
        }
    }

    pub fn matches(&self, resource: &CloudResource) -> bool {
        match self {
            Self::All => true,
            Self::NamePrefix(prefix) => resource.name.starts_with(prefix.as_str()),
            Self::NameEquals(name) => resource.name == *name,
            Self::Network(url) => resource
                .network
                .as_deref()
                .is_some_and(|n| normalize_resource_url(n) == normalize_resource_url(url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;

    #[test]
    fn test_malformed_filters_are_rejected() {
        assert!(ListFilter::name_prefix("").is_err());
        assert!(ListFilter::name_prefix("abc\" OR name eq \".*").is_err());
        assert!(ListFilter::name_equals("Upper").is_err());
        assert!(ListFilter::network("a b").is_err());
    }

    #[test]
    fn test_compute_expression() {
        let filter = ListFilter::name_prefix("abc123-").unwrap();
        assert_eq!(filter.compute_expression().unwrap(), "name eq \"abc123-.*\"");
        assert_eq!(ListFilter::All.compute_expression(), None);
    }

    #[test]
    fn test_matches() {
        let fw = CloudResource::new(ResourceType::Firewall, "abc123-api");
        assert!(ListFilter::name_prefix("abc123-").unwrap().matches(&fw));
        assert!(!ListFilter::name_prefix("xyz-").unwrap().matches(&fw));
        assert!(ListFilter::name_equals("abc123-api").unwrap().matches(&fw));

        let route = CloudResource::new(ResourceType::Route, "r")
            .with_network("https://www.googleapis.com/compute/v1/projects/p/global/networks/n");
        let filter = ListFilter::network(
            "https://compute.googleapis.com/compute/v1/projects/p/global/networks/n",
        )
        .unwrap();
        assert!(filter.matches(&route));
        assert!(!filter.matches(&fw));
    }
}
