use mcp_core::workflow::{GateLogic, GateRequest, ValidationSpec};
use mcp_core::{Envelope, Payload};
use serde_json::Value;
use tracing::info;

use super::policy::ConditionEvaluator;
use super::{decode_payload, WorkflowContext};
use crate::service::operation::HubError;

/// `validate_and_execute`: dispatches the execution step only when the
/// validation conditions hold.
pub(super) async fn run(
    ctx: &WorkflowContext<'_>,
    payload: &Payload,
) -> Result<Envelope, HubError> {
    let GateRequest {
        validation: Some(validation),
        execution: Some(execution),
    } = decode_payload::<GateRequest>(payload)?
    else {
        return Err(HubError::InvalidPayload(
            "Validation and execution details required".to_string(),
        ));
    };

    if !passes(ctx.policies.conditions.as_ref(), &validation, payload) {
        info!(operation = %execution.operation, "gate closed, execution skipped");
        return Err(HubError::ValidationFailed);
    }

    let response = ctx.call(&execution.operation, execution.payload).await;
    if response.is_error() {
        return Ok(ctx.relay(&response));
    }

    let mut result = Payload::new();
    result.insert("validation".to_string(), Value::from("passed"));
    result.insert(
        "execution_result".to_string(),
        Value::Object(response.payload),
    );
    Ok(ctx.success(result))
}

/// An empty condition list passes under either logic.
fn passes(
    evaluator: &dyn ConditionEvaluator,
    validation: &ValidationSpec,
    context: &Payload,
) -> bool {
    if validation.conditions.is_empty() {
        return true;
    }
    let mut outcomes = validation
        .conditions
        .iter()
        .map(|condition| evaluator.evaluate(condition, context));
    match validation.logic {
        GateLogic::And => outcomes.all(|ok| ok),
        GateLogic::Or => outcomes.any(|ok| ok),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::service::orchestration::Orchestrator;
    use crate::service::testing::{dispatcher, dispatcher_with, request, ScriptedTransport};

    fn gate(conditions: Value, logic: &str) -> Value {
        json!({
            "validation": {"conditions": conditions, "logic": logic},
            "execution": {"operation": "create_model", "payload": {"model": {"name": "x"}}}
        })
    }

    #[tokio::test]
    async fn and_with_false_conditions_never_executes() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        let req = request("validate_and_execute", gate(json!([false, false]), "and"));
        let resp = hub.dispatch(req.clone()).await;

        assert!(resp.is_error());
        assert_eq!(resp.payload["kind"], "ValidationFailed");
        assert_eq!(resp.payload["status_code"], 422);
        assert_eq!(resp.request_id(), Some(req.message_id.as_str()));
        assert_eq!(transport.count("create_model"), 0);
    }

    #[tokio::test]
    async fn or_passes_with_one_true_condition() {
        let transport =
            ScriptedTransport::new().respond("create_model", json!({"model": {"id": "m9"}}));
        let hub = dispatcher(&transport);

        let resp = hub
            .dispatch(request(
                "validate_and_execute",
                gate(json!([false, true]), "or"),
            ))
            .await;

        assert!(!resp.is_error());
        assert_eq!(resp.payload["validation"], "passed");
        assert_eq!(resp.payload["execution_result"]["model"]["id"], "m9");
        assert_eq!(transport.count("create_model"), 1);
    }

    #[tokio::test]
    async fn and_with_one_false_fails() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        let resp = hub
            .dispatch(request("validate_and_execute", gate(json!([true, null]), "and")))
            .await;
        assert_eq!(resp.payload["status_code"], 422);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_conditions_pass() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        let resp = hub
            .dispatch(request("validate_and_execute", gate(json!([]), "or")))
            .await;
        assert!(!resp.is_error());
        assert_eq!(transport.count("create_model"), 1);
    }

    #[tokio::test]
    async fn missing_execution_is_invalid_payload() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        let resp = hub
            .dispatch(request(
                "validate_and_execute",
                json!({"validation": {"conditions": [true]}}),
            ))
            .await;
        assert_eq!(resp.payload["kind"], "InvalidPayload");
        assert_eq!(
            resp.error_message(),
            Some("Validation and execution details required")
        );
    }

    struct FieldPresent;

    impl ConditionEvaluator for FieldPresent {
        fn evaluate(&self, condition: &Value, context: &Payload) -> bool {
            condition
                .get("field")
                .and_then(Value::as_str)
                .is_some_and(|field| context.contains_key(field))
        }
    }

    #[tokio::test]
    async fn evaluator_is_pluggable() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher_with(
            &transport,
            Orchestrator::default().with_conditions(Arc::new(FieldPresent)),
        );

        let mut payload = gate(json!([{"field": "approved_by"}]), "and");
        let resp = hub
            .dispatch(request("validate_and_execute", payload.clone()))
            .await;
        assert_eq!(resp.payload["kind"], "ValidationFailed");

        payload["approved_by"] = json!("ops");
        let resp = hub.dispatch(request("validate_and_execute", payload)).await;
        assert!(!resp.is_error());
    }
}
