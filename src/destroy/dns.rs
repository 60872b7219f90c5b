//! DNS parent/child reconciliation
//!
//! The installer publishes a copy of some private-zone records (API
//! endpoints) into the public zone for the base domain. Teardown removes
//! exactly those copies from the parent, never records unique to it, then
//! empties and deletes the private zone.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsZone {
    pub name: String,
    /// Fully qualified domain with trailing dot, e.g. `example.com.`
    pub domain: String,
    pub visibility: Visibility,
}

impl DnsZone {
    pub fn new(name: &str, domain: &str, visibility: Visibility) -> Self {
        Self {
            name: name.to_string(),
            domain: domain.to_string(),
            visibility,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

impl RecordSet {
    pub fn new(name: &str, record_type: &str) -> Self {
        Self {
            name: name.to_string(),
            record_type: record_type.to_string(),
            ttl: None,
            rrdatas: Vec::new(),
        }
    }
}

/// Candidate parent domains, most specific first.
///
/// `api.c.example.com.` yields itself, `c.example.com.`, `example.com.`,
/// `com.`.
pub fn domain_suffixes(domain: &str) -> Vec<&str> {
    let mut suffixes = Vec::new();
    let mut rest = domain;

    while !rest.is_empty() && rest != "." {
        suffixes.push(rest);
        match rest.find('.') {
            Some(idx) => rest = &rest[idx + 1..],
            None => break,
        }
    }

    suffixes
}

/// Pick the public zone whose domain is the longest suffix of `domain`.
pub fn select_parent_zone<'a>(domain: &str, public_zones: &'a [DnsZone]) -> Option<&'a DnsZone> {
    domain_suffixes(domain).into_iter().find_map(|suffix| {
        public_zones
            .iter()
            .find(|zone| zone.visibility == Visibility::Public && zone.domain == suffix)
    })
}

/// Records in the parent whose (type, name) also exists in the child.
pub fn records_shared_with_child<'a>(
    parent_records: &'a [RecordSet],
    child_records: &[RecordSet],
) -> Vec<&'a RecordSet> {
    let child: HashSet<(&str, &str)> = child_records
        .iter()
        .map(|r| (r.record_type.as_str(), r.name.as_str()))
        .collect();

    parent_records
        .iter()
        .filter(|r| child.contains(&(r.record_type.as_str(), r.name.as_str())))
        .collect()
}

/// Records of `zone` that may be deleted: everything except its own apex
/// NS and SOA records, which go away with the zone.
pub fn deletable_records<'a>(zone: &DnsZone, records: &'a [RecordSet]) -> Vec<&'a RecordSet> {
    records
        .iter()
        .filter(|r| {
            let apex = r.name == zone.domain;
            !(apex && (r.record_type == "NS" || r.record_type == "SOA"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public(name: &str, domain: &str) -> DnsZone {
        DnsZone::new(name, domain, Visibility::Public)
    }

    #[test]
    fn test_domain_suffixes() {
        assert_eq!(
            domain_suffixes("api.c.example.com."),
            vec!["api.c.example.com.", "c.example.com.", "example.com.", "com."]
        );
        assert!(domain_suffixes(".").is_empty());
    }

    #[test]
    fn test_selects_longest_suffix() {
        let zones = vec![
            public("base", "base-domain."),
            public("cluster", "cluster-name.base-domain."),
        ];
        let parent = select_parent_zone("api.cluster-name.base-domain.", &zones).unwrap();
        assert_eq!(parent.domain, "cluster-name.base-domain.");
    }

    #[test]
    fn test_select_ignores_private_zones_and_partial_labels() {
        let zones = vec![
            DnsZone::new("priv", "cluster-name.base-domain.", Visibility::Private),
            public("tricky", "name.base-domain."),
            public("base", "base-domain."),
        ];
        let parent = select_parent_zone("cluster-name.base-domain.", &zones).unwrap();
        assert_eq!(parent.name, "base");
        assert!(select_parent_zone("other.org.", &zones).is_none());
    }

    #[test]
    fn test_shared_records_only() {
        let parent = vec![
            RecordSet::new("api.c.example.com.", "A"),
            RecordSet::new("www.example.com.", "A"),
            RecordSet::new("api.c.example.com.", "TXT"),
        ];
        let child = vec![
            RecordSet::new("api.c.example.com.", "A"),
            RecordSet::new("api-int.c.example.com.", "A"),
        ];
        let shared = records_shared_with_child(&parent, &child);
        assert_eq!(shared, vec![&parent[0]]);
    }

    #[test]
    fn test_apex_ns_and_soa_are_kept() {
        let zone = DnsZone::new("abc123-private-zone", "c.example.com.", Visibility::Private);
        let records = vec![
            RecordSet::new("c.example.com.", "NS"),
            RecordSet::new("c.example.com.", "SOA"),
            RecordSet::new("c.example.com.", "TXT"),
            RecordSet::new("sub.c.example.com.", "NS"),
            RecordSet::new("api.c.example.com.", "A"),
        ];
        let names: Vec<_> = deletable_records(&zone, &records)
            .into_iter()
            .map(|r| (r.name.as_str(), r.record_type.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("c.example.com.", "TXT"),
                ("sub.c.example.com.", "NS"),
                ("api.c.example.com.", "A")
            ]
        );
    }
}
