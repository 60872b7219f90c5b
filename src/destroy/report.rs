//! Step, pass and run reports

use super::graph::StepId;
use crate::error::ProviderError;
use crate::resource::{QuotaUsage, ResourceType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// One failed provider call. The affected item stays pending.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    /// What the call was about, e.g. `instance us-central1-a/abc123-m-0`.
    pub subject: String,
    pub error: ProviderError,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: StepId,
    pub deleted: usize,
    /// Items of the step's type still pending when it finished.
    pub pending: usize,
    pub failures: Vec<ItemFailure>,
    pub skipped: bool,
}

impl StepReport {
    pub fn new(step: StepId) -> Self {
        Self {
            step,
            deleted: 0,
            pending: 0,
            failures: Vec::new(),
            skipped: false,
        }
    }

    pub fn skipped(step: StepId) -> Self {
        Self {
            skipped: true,
            ..Self::new(step)
        }
    }

    pub fn record_failure(&mut self, subject: impl Into<String>, error: ProviderError) {
        self.failures.push(ItemFailure {
            subject: subject.into(),
            error,
        });
    }

    pub fn permission_denied(&self) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f.error, ProviderError::PermissionDenied(_)))
    }

    pub fn is_clean(&self) -> bool {
        self.skipped || (self.failures.is_empty() && self.pending == 0)
    }
}

#[derive(Debug, Clone)]
pub struct PassReport {
    pub number: usize,
    pub steps: Vec<StepReport>,
    /// Pending items across every type after the pass.
    pub remaining: Vec<(ResourceType, usize)>,
}

impl PassReport {
    pub fn failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.steps.iter().flat_map(|s| s.failures.iter())
    }

    pub fn deleted(&self) -> usize {
        self.steps.iter().map(|s| s.deleted).sum()
    }

    pub fn pending(&self) -> usize {
        self.remaining.iter().map(|(_, n)| n).sum()
    }

    /// Every step clean and nothing left pending.
    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(StepReport::is_clean) && self.pending() == 0
    }

    pub fn log(&self) {
        let failures = self.failures().count();
        if self.is_clean() {
            info!(
                pass = self.number,
                deleted = self.deleted(),
                "Pass complete, nothing left to delete"
            );
            return;
        }

        info!(
            pass = self.number,
            deleted = self.deleted(),
            pending = self.pending(),
            failures,
            "Pass incomplete"
        );
        for (resource_type, count) in &self.remaining {
            debug!("  {} pending: {}", resource_type, count);
        }
        for failure in self.failures() {
            warn!("  {}: {}", failure.subject, failure.error);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// Final output of a run.
#[derive(Debug, Clone, Serialize)]
pub struct TeardownSummary {
    pub infra_id: String,
    pub project_id: String,
    pub region: String,
    pub outcome: Outcome,
    pub passes: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub freed_quota: Vec<QuotaUsage>,
    pub skipped_steps: Vec<StepId>,
}

impl TeardownSummary {
    pub fn is_complete(&self) -> bool {
        self.outcome == Outcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_cleanliness() {
        let mut report = StepReport::new(StepId::Firewalls);
        assert!(report.is_clean());

        report.pending = 1;
        assert!(!report.is_clean());

        report.pending = 0;
        report.record_failure("firewall rule abc123-fw", ProviderError::Transient("503".into()));
        assert!(!report.is_clean());
        assert!(!report.permission_denied());

        assert!(StepReport::skipped(StepId::Dns).is_clean());
    }

    #[test]
    fn test_pass_with_leftovers_is_not_clean() {
        let pass = PassReport {
            number: 1,
            steps: vec![StepReport::new(StepId::Firewalls)],
            remaining: vec![(ResourceType::Firewall, 2)],
        };
        assert!(!pass.is_clean());
        assert_eq!(pass.pending(), 2);
    }

    #[test]
    fn test_summary_serializes_outcome_and_steps() {
        let now = Utc::now();
        let summary = TeardownSummary {
            infra_id: "abc123".into(),
            project_id: "my-project".into(),
            region: "us-central1".into(),
            outcome: Outcome::Completed,
            passes: 2,
            started_at: now,
            finished_at: now,
            freed_quota: Vec::new(),
            skipped_steps: vec![StepId::Dns],
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["outcome"], "completed");
        assert_eq!(value["skipped_steps"][0], "dns");
    }
}
