//! Pluggable decisions inside the gate, route, and evaluation workflows.
//!
//! The workflows fix the control flow; what a condition means, when a
//! routing rule applies, and what to suggest after an evaluation are left to
//! the deployment. The defaults here are literal.

use std::sync::Arc;

use mcp_core::workflow::{OperationSpec, RoutingRule};
use mcp_core::Payload;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Decides a single gate condition.
pub trait ConditionEvaluator: Send + Sync {
    /// `context` is the payload of the operation that carries the condition.
    fn evaluate(&self, condition: &Value, context: &Payload) -> bool;
}

/// Booleans are their own value, `null` fails, anything else passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralConditions;

impl ConditionEvaluator for LiteralConditions {
    fn evaluate(&self, condition: &Value, _context: &Payload) -> bool {
        match condition {
            Value::Bool(b) => *b,
            Value::Null => false,
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Routing rules
// ---------------------------------------------------------------------------

/// Decides whether a routing rule applies to the embedded request.
pub trait RuleMatcher: Send + Sync {
    fn matches(&self, rule: &RoutingRule, request: &OperationSpec) -> bool;
}

/// Matches on a rule's `condition` criterion when present, otherwise on its
/// `operation` criterion. A rule with neither never matches.
#[derive(Clone)]
pub struct CriteriaMatcher {
    conditions: Arc<dyn ConditionEvaluator>,
}

impl CriteriaMatcher {
    #[must_use]
    pub fn new(conditions: Arc<dyn ConditionEvaluator>) -> Self {
        Self { conditions }
    }
}

impl Default for CriteriaMatcher {
    fn default() -> Self {
        Self::new(Arc::new(LiteralConditions))
    }
}

impl RuleMatcher for CriteriaMatcher {
    fn matches(&self, rule: &RoutingRule, request: &OperationSpec) -> bool {
        if let Some(condition) = rule.criteria.get("condition") {
            return self.conditions.evaluate(condition, &request.payload);
        }
        rule.criteria
            .get("operation")
            .and_then(Value::as_str)
            .is_some_and(|operation| operation == request.operation)
    }
}

// ---------------------------------------------------------------------------
// Optimization
// ---------------------------------------------------------------------------

/// Everything known once an evaluation run finished.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationOutcome<'a> {
    pub model_id: &'a str,
    pub dataset_id: &'a str,
    pub metrics: &'a [Value],
    pub optimization_params: &'a Payload,
    pub results: &'a Value,
}

/// Produces the `optimization_suggestions` of an evaluation.
pub trait OptimizationStrategy: Send + Sync {
    fn suggest(&self, outcome: &EvaluationOutcome<'_>) -> Value;
}

/// Fixed hyperparameter suggestion, independent of the results.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSuggestions;

impl OptimizationStrategy for StaticSuggestions {
    fn suggest(&self, _outcome: &EvaluationOutcome<'_>) -> Value {
        json!({
            "suggested_params": {
                "learning_rate": 0.001,
                "batch_size": 64,
                "epochs": 10
            },
            "estimated_improvement": "+5.2%"
        })
    }
}
