use mcp_core::workflow::{TaskRequest, Worker, WorkflowStep};
use mcp_core::{Envelope, Payload};
use serde_json::Value;
use tracing::debug;

use super::{decode_payload, WorkflowContext};
use crate::service::operation::HubError;

/// `orchestrate_task`: runs workflow steps sorted by step number, each by
/// the worker holding its role.
///
/// Every step sees the whole history so far under `previous_steps`, keyed
/// by step number. All roles are resolved before the first dispatch.
pub(super) async fn run(
    ctx: &WorkflowContext<'_>,
    payload: &Payload,
) -> Result<Envelope, HubError> {
    let TaskRequest {
        task_id,
        workers,
        mut workflow,
    } = decode_payload::<TaskRequest>(payload)?;
    if task_id.is_empty() || workers.is_empty() || workflow.is_empty() {
        return Err(HubError::InvalidPayload(
            "Task ID, workers, and workflow required".to_string(),
        ));
    }

    // Stable: steps sharing a number keep their input order.
    workflow.sort_by_key(|step| step.step);
    let assignments = assign(&workflow, &workers)?;

    let mut step_results = Payload::new();
    let mut final_result = Payload::new();
    for (step, worker) in assignments {
        let worker = serde_json::to_value(worker).map_err(|e| HubError::Internal(e.into()))?;
        let mut step_payload = step.payload.clone();
        step_payload.insert("worker".to_string(), worker);
        step_payload.insert("task_id".to_string(), Value::String(task_id.clone()));
        step_payload.insert("step".to_string(), Value::from(step.step));
        step_payload.insert(
            "previous_steps".to_string(),
            Value::Object(step_results.clone()),
        );

        debug!(%task_id, step = step.step, role = %step.worker_role, "running task step");
        let response = ctx.call(&step.operation, step_payload).await;
        if response.is_error() {
            return Err(HubError::StepFailed {
                step: step.step,
                message: response
                    .error_message()
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }
        step_results.insert(step.step.to_string(), Value::Object(response.payload.clone()));
        final_result = response.payload;
    }

    let mut result = Payload::new();
    result.insert("task_id".to_string(), Value::String(task_id));
    result.insert("workflow_completed".to_string(), Value::Bool(true));
    result.insert("step_results".to_string(), Value::Object(step_results));
    result.insert("final_result".to_string(), Value::Object(final_result));
    Ok(ctx.success(result))
}

fn assign<'a>(
    workflow: &'a [WorkflowStep],
    workers: &'a [Worker],
) -> Result<Vec<(&'a WorkflowStep, &'a Worker)>, HubError> {
    workflow
        .iter()
        .map(|step| {
            workers
                .iter()
                .find(|worker| worker.role == step.worker_role)
                .map(|worker| (step, worker))
                .ok_or_else(|| HubError::WorkerNotFound {
                    role: step.worker_role.clone(),
                })
        })
        .collect()
}
