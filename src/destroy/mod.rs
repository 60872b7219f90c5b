//! Teardown engine
//!
//! Discovers every resource belonging to one cluster and deletes it,
//! repeating passes until nothing is left.
//!
//! # Module Structure
//!
//! - [`ownership`] - Direct (name prefix) and indirect (reference) ownership
//! - [`graph`] - Destroy steps and their computed order
//! - [`step`] - The discover, track and delete cycle of a step
//! - [`discovery`] - Controller load balancers, DNS and IAM steps
//! - [`dns`] - Parent zone selection and shared record matching
//! - [`iam`] - Policy member scrubbing
//! - [`report`] - Step, pass and run results
//! - [`reconciler`] - The convergence loop

pub mod discovery;
pub mod dns;
pub mod graph;
pub mod iam;
pub mod ownership;
pub mod reconciler;
pub mod report;
pub mod step;

pub use graph::{StepGraph, StepId, StepNode, STEPS};
pub use ownership::OwnershipClassifier;
pub use reconciler::Reconciler;
pub use report::{Outcome, PassReport, StepReport, TeardownSummary};
