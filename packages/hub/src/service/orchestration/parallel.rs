use futures_util::future::join_all;
use mcp_core::workflow::ParallelRequest;
use mcp_core::{Envelope, Payload, ResponseStatus};
use serde_json::Value;

use super::{decode_payload, WorkflowContext};
use crate::service::operation::HubError;

/// `parallel_execute`: dispatches every execution concurrently and waits for
/// all of them. Failures do not abort the batch; `results[i]` and
/// `statuses[i]` always describe `executions[i]`.
pub(super) async fn run(
    ctx: &WorkflowContext<'_>,
    payload: &Payload,
) -> Result<Envelope, HubError> {
    let request: ParallelRequest = decode_payload(payload)?;
    if request.executions.is_empty() {
        return Err(HubError::InvalidPayload(
            "No executions provided for parallel processing".to_string(),
        ));
    }

    let responses = join_all(
        request
            .executions
            .iter()
            .map(|execution| ctx.call(&execution.operation, execution.payload.clone())),
    )
    .await;

    let statuses = responses
        .iter()
        .map(|response| {
            Value::from(
                response
                    .status
                    .unwrap_or(ResponseStatus::Success)
                    .as_str(),
            )
        })
        .collect();
    let results = responses
        .into_iter()
        .map(|response| Value::Object(response.payload))
        .collect();

    let mut result = Payload::new();
    result.insert("results".to_string(), Value::Array(results));
    result.insert("statuses".to_string(), Value::Array(statuses));
    Ok(ctx.success(result))
}
