//! IAM policy-binding scrubbing
//!
//! Deleting a service account leaves its bindings behind as
//! `deleted:serviceAccount:<email>?uid=<n>` members. Both the live and the
//! deleted form of every cluster-owned account are removed from the project
//! policy; nothing else is touched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const DELETED_PREFIX: &str = "deleted:";
const SERVICE_ACCOUNT_PREFIX: &str = "serviceAccount:";

/// Project IAM policy. Unknown fields round-trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
    /// `condition` and anything else the API adds.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Binding {
    pub fn new(role: &str, members: &[&str]) -> Self {
        Self {
            role: role.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            extra: Map::new(),
        }
    }
}

/// The service-account email a member denotes, if any.
///
/// `serviceAccount:a@p` and `deleted:serviceAccount:a@p?uid=1` both yield
/// `a@p`; users, groups and domains yield `None`.
pub fn service_account_identity(member: &str) -> Option<&str> {
    let member = member.strip_prefix(DELETED_PREFIX).unwrap_or(member);
    let identity = member.strip_prefix(SERVICE_ACCOUNT_PREFIX)?;
    let identity = identity.split_once('?').map_or(identity, |(email, _)| email);
    Some(identity)
}

/// A member removed from a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedMember {
    pub role: String,
    pub member: String,
}

/// Remove every member whose service-account identity is in `owned`.
///
/// Bindings emptied by the removal are dropped. Returns what was removed;
/// an empty result means the policy is unchanged and need not be written.
pub fn scrub_policy(policy: &mut Policy, owned: &BTreeSet<String>) -> Vec<RemovedMember> {
    let mut removed = Vec::new();

    for binding in &mut policy.bindings {
        let role = binding.role.clone();
        binding.members.retain(|member| {
            let owned_member =
                service_account_identity(member).is_some_and(|id| owned.contains(id));
            if owned_member {
                removed.push(RemovedMember {
                    role: role.clone(),
                    member: member.clone(),
                });
            }
            !owned_member
        });
    }

    if !removed.is_empty() {
        let emptied: BTreeSet<&str> = removed.iter().map(|r| r.role.as_str()).collect();
        policy
            .bindings
            .retain(|b| !(b.members.is_empty() && emptied.contains(b.role.as_str())));
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(emails: &[&str]) -> BTreeSet<String> {
        emails.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_service_account_identity() {
        assert_eq!(service_account_identity("serviceAccount:op@proj"), Some("op@proj"));
        assert_eq!(
            service_account_identity("deleted:serviceAccount:op@proj?uid=123"),
            Some("op@proj")
        );
        assert_eq!(service_account_identity("user:u@proj"), None);
        assert_eq!(service_account_identity("deleted:user:u@proj?uid=1"), None);
    }

    #[test]
    fn test_scrub_removes_both_forms_only() {
        let mut policy = Policy {
            bindings: vec![Binding::new(
                "roles/compute.admin",
                &[
                    "serviceAccount:op@proj",
                    "deleted:serviceAccount:op@proj?uid=123",
                    "user:u@proj",
                ],
            )],
            ..Default::default()
        };

        let removed = scrub_policy(&mut policy, &owned(&["op@proj"]));
        assert_eq!(removed.len(), 2);
        assert_eq!(policy.bindings[0].members, vec!["user:u@proj"]);
    }

    #[test]
    fn test_scrub_leaves_other_accounts_and_bindings() {
        let mut policy = Policy {
            bindings: vec![
                Binding::new("roles/viewer", &["serviceAccount:other@proj"]),
                Binding::new("roles/storage.admin", &["serviceAccount:op@proj"]),
            ],
            ..Default::default()
        };
        let original_viewer = policy.bindings[0].clone();

        let removed = scrub_policy(&mut policy, &owned(&["op@proj"]));
        assert_eq!(removed.len(), 1);
        assert_eq!(policy.bindings, vec![original_viewer]);
    }

    #[test]
    fn test_scrub_without_match_is_noop() {
        let mut policy = Policy {
            bindings: vec![Binding::new("roles/viewer", &["user:u@proj"])],
            ..Default::default()
        };
        let before = policy.clone();
        assert!(scrub_policy(&mut policy, &owned(&["op@proj"])).is_empty());
        assert_eq!(policy, before);
    }

    #[test]
    fn test_policy_round_trips_unknown_fields() {
        let raw = serde_json::json!({
            "version": 3,
            "etag": "BwX=",
            "auditConfigs": [{"service": "allServices"}],
            "bindings": [{
                "role": "roles/viewer",
                "members": ["user:u@proj"],
                "condition": {"title": "t", "expression": "true"}
            }]
        });
        let policy: Policy = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&policy).unwrap(), raw);
    }
}
