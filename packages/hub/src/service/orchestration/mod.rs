//! Hub-local composite operations.
//!
//! Every pattern is a function of its payload that issues synthetic requests
//! back through the [`Dispatcher`] and builds one final envelope:
//!
//! - [`chain`]: sequential steps, each seeing the previous result
//! - [`gate`]: run one operation only if its conditions hold
//! - [`route`]: pick a target by rules, then run the embedded request
//! - [`parallel`]: concurrent fan-out, results in input order
//! - [`task`]: worker-assigned steps sorted by step number
//! - [`evaluate`]: fixed six-phase evaluation with guaranteed cleanup
//!
//! Sub-requests are dispatched one nesting level deeper than the composite
//! that issued them, so runaway recursion ends in `DepthExceeded`.

mod chain;
mod evaluate;
mod gate;
mod parallel;
pub mod policy;
mod route;
mod task;

use std::sync::Arc;

use mcp_core::{workflow, Correlation, Envelope, Payload};
use serde::de::DeserializeOwned;
use tracing::debug;

use self::policy::{
    ConditionEvaluator, CriteriaMatcher, LiteralConditions, OptimizationStrategy, RuleMatcher,
    StaticSuggestions,
};
use super::dispatcher::Dispatcher;
use super::operation::{CompositeOperation, HubError};

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs composite operations with a set of pluggable policies.
#[derive(Clone)]
pub struct Orchestrator {
    conditions: Arc<dyn ConditionEvaluator>,
    rules: Arc<dyn RuleMatcher>,
    optimizer: Arc<dyn OptimizationStrategy>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self {
            conditions: Arc::new(LiteralConditions),
            rules: Arc::new(CriteriaMatcher::default()),
            optimizer: Arc::new(StaticSuggestions),
        }
    }
}

impl Orchestrator {
    #[must_use]
    pub fn with_conditions(mut self, conditions: Arc<dyn ConditionEvaluator>) -> Self {
        self.conditions = conditions;
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: Arc<dyn RuleMatcher>) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_optimizer(mut self, optimizer: Arc<dyn OptimizationStrategy>) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Runs `composite` for `request`.
    ///
    /// # Errors
    ///
    /// Returns the workflow's own failures (bad payload, failed gate, missing
    /// worker, failed step). Errors of nested dispatches are relayed as
    /// envelopes instead.
    pub(crate) async fn handle(
        &self,
        dispatcher: &Dispatcher,
        composite: CompositeOperation,
        request: Envelope,
        depth: usize,
    ) -> Result<Envelope, HubError> {
        let ctx = WorkflowContext {
            dispatcher,
            policies: self,
            request: request.correlation(),
            depth,
        };
        let payload = request.payload;
        match composite {
            CompositeOperation::ChainOperations => chain::run(&ctx, &payload).await,
            CompositeOperation::ValidateAndExecute => gate::run(&ctx, &payload).await,
            CompositeOperation::RouteRequest => route::run(&ctx, &payload).await,
            CompositeOperation::ParallelExecute => parallel::run(&ctx, &payload).await,
            CompositeOperation::OrchestrateTask => task::run(&ctx, &payload).await,
            CompositeOperation::EvaluateAndOptimize => evaluate::run(&ctx, &payload).await,
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowContext
// ---------------------------------------------------------------------------

/// State shared by the steps of one composite operation.
pub(crate) struct WorkflowContext<'a> {
    dispatcher: &'a Dispatcher,
    policies: &'a Orchestrator,
    request: Correlation,
    depth: usize,
}

impl WorkflowContext<'_> {
    /// Builds a synthetic request from the hub and dispatches it.
    async fn call(&self, operation: &str, payload: Payload) -> Envelope {
        let sender = self.dispatcher.responses().sender().clone();
        match Envelope::request(sender, operation, payload) {
            Ok(envelope) => {
                debug!(
                    parent = %self.request.operation,
                    operation,
                    depth = self.depth,
                    "dispatching sub-request"
                );
                self.dispatcher.dispatch_at(envelope, self.depth).await
            }
            Err(e) => HubError::InvalidMessage {
                reason: e.to_string(),
            }
            .to_envelope(self.dispatcher.responses(), &self.request),
        }
    }

    /// Success response answering the composite request.
    fn success(&self, payload: Payload) -> Envelope {
        self.dispatcher.responses().success(&self.request, payload)
    }

    /// Passes a nested error through, correlated to the composite request.
    fn relay(&self, nested: &Envelope) -> Envelope {
        self.dispatcher.responses().relay(&self.request, nested)
    }

    fn error_envelope(&self, err: &HubError) -> Envelope {
        err.to_envelope(self.dispatcher.responses(), &self.request)
    }
}

fn decode_payload<T: DeserializeOwned>(payload: &Payload) -> Result<T, HubError> {
    workflow::decode(payload)
        .map_err(|e| HubError::InvalidPayload(format!("malformed payload: {e}")))
}
