//! Convergence loop
//!
//! A [`Reconciler`] owns all run-scoped state: the pending items, the
//! idempotency tokens and the confirmed-ownership set. It repeats the full
//! step sequence until one pass is clean or the run is cancelled.

use super::graph::{StepGraph, StepId, StepNode};
use super::ownership::OwnershipClassifier;
use super::report::{Outcome, PassReport, StepReport, TeardownSummary};
use crate::config::TeardownSettings;
use crate::driver::DriverSet;
use crate::error::{ProviderError, TeardownError};
use crate::resource::{IdempotencyCache, PendingItemTracker};
use chrono::Utc;
use std::collections::BTreeSet;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Reconciler {
    pub(super) settings: TeardownSettings,
    pub(super) drivers: DriverSet,
    pub(super) ownership: OwnershipClassifier,
    pub(super) tracker: PendingItemTracker,
    pub(super) idempotency: IdempotencyCache,
    /// Emails of every cluster service account seen during the run.
    pub(super) owned_service_accounts: BTreeSet<String>,
    graph: StepGraph,
    skipped: BTreeSet<StepId>,
    passes: usize,
    pub(super) cancel: CancellationToken,
}

impl Reconciler {
    pub fn new(settings: TeardownSettings, drivers: DriverSet) -> Result<Self, TeardownError> {
        Self::with_graph(settings, drivers, StepGraph::standard()?)
    }

    /// Run a custom step graph, e.g. a subset of the standard steps.
    pub fn with_graph(
        settings: TeardownSettings,
        drivers: DriverSet,
        graph: StepGraph,
    ) -> Result<Self, TeardownError> {
        settings.validate()?;
        let ownership = OwnershipClassifier::new(&settings.infra_id)?;

        Ok(Self {
            settings,
            drivers,
            ownership,
            tracker: PendingItemTracker::new(),
            idempotency: IdempotencyCache::new(),
            owned_service_accounts: BTreeSet::new(),
            graph,
            skipped: BTreeSet::new(),
            passes: 0,
            cancel: CancellationToken::new(),
        })
    }

    /// Cancelling stops further provider calls and prevents a new pass.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn tracker(&self) -> &PendingItemTracker {
        &self.tracker
    }

    pub fn idempotency(&self) -> &IdempotencyCache {
        &self.idempotency
    }

    pub fn ownership(&self) -> &OwnershipClassifier {
        &self.ownership
    }

    pub fn skipped_steps(&self) -> Vec<StepId> {
        self.skipped.iter().copied().collect()
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Bound a provider call by the request timeout and the cancellation token.
    pub(super) async fn call<T, F>(&self, request: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let timeout = self.settings.request_timeout;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProviderError::Cancelled),
            result = tokio::time::timeout(timeout, request) => match result {
                Ok(response) => response,
                Err(_) => Err(ProviderError::Transient(format!(
                    "no response within {}s",
                    timeout.as_secs()
                ))),
            },
        }
    }

    /// Record a failed call against the step, unless it must end the pass.
    pub(super) fn record_failure(
        &self,
        report: &mut StepReport,
        subject: String,
        err: ProviderError,
    ) -> Result<(), TeardownError> {
        match err {
            ProviderError::Cancelled => Err(TeardownError::Cancelled),
            err if err.is_fatal() => Err(TeardownError::provider(subject, err)),
            err => {
                warn!("Failed on {}: {}", subject, err);
                report.record_failure(subject, err);
                Ok(())
            }
        }
    }

    /// Execute one full pass over the step graph.
    pub async fn run_pass(&mut self) -> Result<PassReport, TeardownError> {
        self.passes += 1;
        let number = self.passes;
        debug!(pass = number, "Starting pass");

        let nodes: Vec<StepNode> = self.graph.order().to_vec();
        let mut steps = Vec::with_capacity(nodes.len());

        for node in nodes {
            if self.cancel.is_cancelled() {
                return Err(TeardownError::Cancelled);
            }
            steps.push(self.run_step(node).await?);
        }

        debug!(
            pass = number,
            confirmed = self.ownership.confirmed_count(),
            in_flight = self.idempotency.in_flight(),
            "Finished pass"
        );

        Ok(PassReport {
            number,
            steps,
            remaining: self.tracker.summary(),
        })
    }

    async fn run_step(&mut self, node: StepNode) -> Result<StepReport, TeardownError> {
        if self.skipped.contains(&node.id) {
            return Ok(StepReport::skipped(node.id));
        }

        debug!(step = %node.id, "Running step");
        let report = match node.id {
            StepId::Dns => self.run_dns_step().await?,
            StepId::PolicyBindings => self.run_policy_step().await?,
            StepId::InternalLoadBalancers => self.run_internal_lb_step().await?,
            StepId::ExternalLoadBalancers => self.run_external_lb_step().await?,
            StepId::Networks => self.run_networks_step().await?,
            id => match id.resource_type() {
                Some(resource_type) => self.run_standard_step(id, resource_type).await?,
                None => StepReport::new(id),
            },
        };

        if node.optional && report.permission_denied() {
            warn!(
                "Skipping {} for the rest of the run: permission denied",
                node.id
            );
            self.skipped.insert(node.id);
            if let Some(resource_type) = node.id.resource_type() {
                let abandoned = self.tracker.abandon(resource_type);
                if abandoned > 0 {
                    warn!("Leaving {} {} item(s) in place", abandoned, resource_type);
                }
            }
            return Ok(StepReport::skipped(node.id));
        }

        Ok(report)
    }

    /// Repeat passes until one is clean or the run is cancelled.
    ///
    /// Only fatal errors are returned; cancellation yields a summary with
    /// a cancelled outcome.
    pub async fn run(&mut self) -> Result<TeardownSummary, TeardownError> {
        let started_at = Utc::now();
        info!(
            infra_id = %self.settings.infra_id,
            project = %self.settings.project_id,
            region = %self.settings.region,
            controller_uid = %self.ownership.controller_uid(),
            "Destroying cluster resources"
        );

        let outcome = loop {
            if self.cancel.is_cancelled() {
                break Outcome::Cancelled;
            }

            let pass = match self.run_pass().await {
                Ok(pass) => pass,
                Err(TeardownError::Cancelled) => break Outcome::Cancelled,
                Err(err) => {
                    error!("Teardown aborted: {}", err);
                    return Err(err);
                }
            };

            pass.log();
            if pass.is_clean() {
                break Outcome::Completed;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break Outcome::Cancelled,
                _ = tokio::time::sleep(self.settings.pass_interval) => {}
            }
        };

        match outcome {
            Outcome::Completed => info!(passes = self.passes, "All cluster resources deleted"),
            Outcome::Cancelled => warn!(
                passes = self.passes,
                pending = self.tracker.total(),
                in_flight = self.idempotency.in_flight(),
                "Teardown cancelled"
            ),
        }

        Ok(TeardownSummary {
            infra_id: self.settings.infra_id.clone(),
            project_id: self.settings.project_id.clone(),
            region: self.settings.region.clone(),
            outcome,
            passes: self.passes,
            started_at,
            finished_at: Utc::now(),
            freed_quota: self.tracker.freed_quota().to_vec(),
            skipped_steps: self.skipped_steps(),
        })
    }
}
