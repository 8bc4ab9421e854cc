//! `evaluate_and_optimize`: a fixed six-phase composite.
//!
//! 1. fetch the model
//! 2. fetch the dataset
//! 3. create a temporary `evaluation` deployment of the model
//! 4. create an execution against it
//! 5. fetch the execution results
//! 6. delete the temporary deployment
//!
//! Phase 6 runs whenever phase 3 succeeded, whatever happens in phases 4
//! and 5. Its outcome is reported under `metadata.cleanup` and never replaces
//! the operation's own result.

use mcp_core::operations as ops;
use mcp_core::workflow::EvaluationRequest;
use mcp_core::{Envelope, Payload};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::policy::EvaluationOutcome;
use super::{decode_payload, WorkflowContext};
use crate::service::operation::HubError;

const DEFAULT_MODEL_NAME: &str = "Unknown Model";

pub(super) async fn run(
    ctx: &WorkflowContext<'_>,
    payload: &Payload,
) -> Result<Envelope, HubError> {
    let request: EvaluationRequest = decode_payload(payload)?;
    if request.model_id.is_empty() || request.dataset_id.is_empty() || request.metrics.is_empty()
    {
        return Err(HubError::InvalidPayload(
            "Model ID, dataset ID, and metrics required".to_string(),
        ));
    }

    let model = ctx
        .call(ops::GET_MODEL, object(json!({"model_id": request.model_id})))
        .await;
    if model.is_error() {
        return Ok(ctx.relay(&model));
    }

    let dataset = ctx
        .call(ops::GET_DATASET, object(json!({"dataset_id": request.dataset_id})))
        .await;
    if dataset.is_error() {
        return Ok(ctx.relay(&dataset));
    }

    let model_name = model
        .payload
        .get("model")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_MODEL_NAME);
    let prefix: String = request.model_id.chars().take(8).collect();
    let deployment = ctx
        .call(
            ops::CREATE_DEPLOYMENT,
            object(json!({"deployment": {
                "name": format!("Evaluation-{prefix}"),
                "description": "Temporary deployment for model evaluation",
                "model_id": request.model_id,
                "model_name": model_name,
                "environment": "evaluation",
                "status": "active"
            }})),
        )
        .await;
    if deployment.is_error() {
        return Ok(ctx.relay(&deployment));
    }
    let Some(deployment_id) = nested_id(&deployment, "deployment") else {
        return Err(HubError::Internal(anyhow::anyhow!(
            "create_deployment answered without a deployment id"
        )));
    };
    info!(%deployment_id, model_id = %request.model_id, "evaluation deployment created");

    let evaluation = evaluate(ctx, &request, &deployment_id).await;
    let cleanup = cleanup(ctx, &deployment_id).await;

    let mut response = match evaluation {
        Ok(results) => {
            let suggestions = ctx.policies.optimizer.suggest(&EvaluationOutcome {
                model_id: &request.model_id,
                dataset_id: &request.dataset_id,
                metrics: &request.metrics,
                optimization_params: &request.optimization_params,
                results: &results,
            });
            let mut result = Payload::new();
            result.insert("model_id".to_string(), Value::String(request.model_id));
            result.insert("dataset_id".to_string(), Value::String(request.dataset_id));
            result.insert("evaluation_results".to_string(), results);
            result.insert("optimization_suggestions".to_string(), suggestions);
            ctx.success(result)
        }
        Err(failed) => ctx.relay(&failed),
    };
    response.metadata.insert("cleanup".to_string(), cleanup);
    Ok(response)
}

/// Phases 4 and 5. Yields the `results` of the execution, or the error
/// envelope of the phase that failed.
async fn evaluate(
    ctx: &WorkflowContext<'_>,
    request: &EvaluationRequest,
    deployment_id: &str,
) -> Result<Value, Envelope> {
    let execution = ctx
        .call(
            ops::CREATE_EXECUTION,
            object(json!({"execution": {
                "deployment_id": deployment_id,
                "dataset_id": request.dataset_id,
                "parameters": {
                    "metrics": request.metrics,
                    "optimization_params": request.optimization_params
                }
            }})),
        )
        .await;
    if execution.is_error() {
        return Err(execution);
    }
    let Some(execution_id) = nested_id(&execution, "execution") else {
        let err = HubError::Internal(anyhow::anyhow!(
            "create_execution answered without an execution id"
        ));
        return Err(ctx.error_envelope(&err));
    };

    let results = ctx
        .call(
            ops::GET_EXECUTION_RESULTS,
            object(json!({"execution_id": execution_id})),
        )
        .await;
    if results.is_error() {
        return Err(results);
    }
    Ok(results
        .payload
        .get("results")
        .cloned()
        .unwrap_or_else(|| Value::Object(Payload::new())))
}

/// Phase 6. Failures are logged and reported, never raised.
async fn cleanup(ctx: &WorkflowContext<'_>, deployment_id: &str) -> Value {
    let response = ctx
        .call(
            ops::DELETE_DEPLOYMENT,
            object(json!({"deployment_id": deployment_id})),
        )
        .await;
    if response.is_error() {
        let error = response.error_message().unwrap_or("unknown error");
        warn!(%deployment_id, %error, "failed to delete evaluation deployment");
        json!({"deployment_id": deployment_id, "outcome": "failed", "error": error})
    } else {
        json!({"deployment_id": deployment_id, "outcome": "deleted"})
    }
}

fn nested_id(response: &Envelope, key: &str) -> Option<String> {
    response
        .payload
        .get(key)
        .and_then(|record| record.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn object(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}
