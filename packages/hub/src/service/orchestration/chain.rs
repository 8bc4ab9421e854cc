use mcp_core::workflow::ChainRequest;
use mcp_core::{Envelope, Payload};
use serde_json::Value;

use super::{decode_payload, WorkflowContext};
use crate::service::operation::HubError;

/// `chain_operations`: runs steps in order, handing each step the previous
/// step's payload under `previous_result`. Stops at the first error.
pub(super) async fn run(
    ctx: &WorkflowContext<'_>,
    payload: &Payload,
) -> Result<Envelope, HubError> {
    let chain: ChainRequest = decode_payload(payload)?;
    if chain.operations.is_empty() {
        return Err(HubError::InvalidPayload(
            "No operations provided for chaining".to_string(),
        ));
    }

    let mut previous: Option<Payload> = None;
    for step in chain.operations {
        let mut step_payload = step.payload;
        if let Some(result) = previous.take() {
            step_payload.insert("previous_result".to_string(), Value::Object(result));
        }

        let response = ctx.call(&step.operation, step_payload).await;
        if response.is_error() {
            return Ok(ctx.relay(&response));
        }
        previous = Some(response.payload);
    }

    let mut result = Payload::new();
    result.insert(
        "final_result".to_string(),
        Value::Object(previous.unwrap_or_default()),
    );
    Ok(ctx.success(result))
}
