//! Payload schemas of the hub-local composite operations.
//!
//! Every field is defaulted so that an incomplete payload still decodes;
//! the orchestration handlers decide which omissions are fatal and report
//! them with a message naming what is missing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::envelope::Payload;

fn null_as_empty<'de, D>(deserializer: D) -> Result<Payload, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Payload>::deserialize(deserializer)?.unwrap_or_default())
}

/// Step numbers arrive as `1` or `1.0` depending on the client's JSON encoder.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
fn integral_step<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(0);
    };
    if let Some(step) = number.as_i64() {
        return Ok(step);
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(serde::de::Error::custom(format!(
            "step must be a whole number, got {number}"
        ))),
    }
}

/// Decodes a composite operation's payload into its schema.
///
/// # Errors
///
/// Returns the `serde_json` error when a present field has the wrong shape.
pub fn decode<T: DeserializeOwned>(payload: &Payload) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(payload.clone()))
}

/// One operation to dispatch: the building block of every composite.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationSpec {
    #[serde(default)]
    pub operation: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payload: Payload,
}

// ---------------------------------------------------------------------------
// chain_operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChainRequest {
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

// ---------------------------------------------------------------------------
// validate_and_execute
// ---------------------------------------------------------------------------

/// How the gate combines its conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateLogic {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationSpec {
    #[serde(default)]
    pub conditions: Vec<Value>,
    #[serde(default)]
    pub logic: GateLogic,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GateRequest {
    #[serde(default)]
    pub validation: Option<ValidationSpec>,
    #[serde(default)]
    pub execution: Option<OperationSpec>,
}

// ---------------------------------------------------------------------------
// route_request
// ---------------------------------------------------------------------------

/// A rule mapping request criteria to a target name.
///
/// Criteria are kept open; the deployment's rule matcher interprets them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoutingRule {
    #[serde(default)]
    pub target: String,
    #[serde(flatten)]
    pub criteria: Payload,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub routing_rules: Vec<RoutingRule>,
    #[serde(default)]
    pub default_target: Option<String>,
    #[serde(default)]
    pub request: Option<OperationSpec>,
}

// ---------------------------------------------------------------------------
// parallel_execute
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParallelRequest {
    #[serde(default)]
    pub executions: Vec<OperationSpec>,
    /// Accepted for compatibility; results are always returned in input order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Value>,
}

// ---------------------------------------------------------------------------
// orchestrate_task
// ---------------------------------------------------------------------------

/// A worker available to a task. Attributes besides `role` are opaque and
/// forwarded to every step the worker performs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Worker {
    #[serde(default)]
    pub role: String,
    #[serde(flatten)]
    pub attributes: Payload,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(default, deserialize_with = "integral_step")]
    pub step: i64,
    #[serde(default)]
    pub worker_role: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub workers: Vec<Worker>,
    #[serde(default)]
    pub workflow: Vec<WorkflowStep>,
}

// ---------------------------------------------------------------------------
// evaluate_and_optimize
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub dataset_id: String,
    #[serde(default)]
    pub metrics: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub optimization_params: Payload,
}
