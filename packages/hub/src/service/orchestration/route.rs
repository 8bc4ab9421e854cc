use mcp_core::workflow::RouteRequest;
use mcp_core::{Envelope, Payload};
use serde_json::Value;
use tracing::info;

use super::{decode_payload, WorkflowContext};
use crate::service::operation::HubError;

/// `route_request`: the first matching rule names the target, falling back
/// to `default_target`. The target is reported, not used for dispatch.
pub(super) async fn run(
    ctx: &WorkflowContext<'_>,
    payload: &Payload,
) -> Result<Envelope, HubError> {
    let RouteRequest {
        routing_rules,
        default_target: Some(default_target),
        request: Some(request),
    } = decode_payload::<RouteRequest>(payload)?
    else {
        return Err(missing());
    };
    if routing_rules.is_empty() {
        return Err(missing());
    }

    let target = routing_rules
        .iter()
        .find(|rule| ctx.policies.rules.matches(rule, &request))
        .map_or(default_target, |rule| rule.target.clone());
    info!(operation = %request.operation, %target, "routing request");

    let response = ctx.call(&request.operation, request.payload).await;
    if response.is_error() {
        return Ok(ctx.relay(&response));
    }

    let mut result = Payload::new();
    result.insert("routed_to".to_string(), Value::String(target));
    result.insert("result".to_string(), Value::Object(response.payload));
    Ok(ctx.success(result))
}

fn missing() -> HubError {
    HubError::InvalidPayload("Routing rules, default target, and request required".to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::service::testing::{dispatcher, request, ScriptedTransport};

    fn route(rules: serde_json::Value) -> serde_json::Value {
        json!({
            "routing_rules": rules,
            "default_target": "general-pool",
            "request": {"operation": "get_model", "payload": {"model_id": "m1"}}
        })
    }

    #[tokio::test]
    async fn first_matching_rule_wins() {
        let transport =
            ScriptedTransport::new().respond("get_model", json!({"model": {"id": "m1"}}));
        let hub = dispatcher(&transport);

        let resp = hub
            .dispatch(request(
                "route_request",
                route(json!([
                    {"target": "list-pool", "operation": "list_models"},
                    {"target": "model-pool", "operation": "get_model"},
                    {"target": "catch-all", "condition": true}
                ])),
            ))
            .await;

        assert!(!resp.is_error());
        assert_eq!(resp.payload["routed_to"], "model-pool");
        assert_eq!(resp.payload["result"]["model"]["id"], "m1");
        assert_eq!(transport.requests("get_model")[0].payload["model_id"], "m1");
    }

    #[tokio::test]
    async fn falls_back_to_default_target() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        let resp = hub
            .dispatch(request(
                "route_request",
                route(json!([{"target": "never", "condition": false}])),
            ))
            .await;
        assert_eq!(resp.payload["routed_to"], "general-pool");
        assert_eq!(transport.count("get_model"), 1);
    }

    #[tokio::test]
    async fn nested_error_is_relayed() {
        let transport = ScriptedTransport::new().fail("get_model", "Model not found", 404);
        let hub = dispatcher(&transport);

        let req = request(
            "route_request",
            route(json!([{"target": "model-pool", "operation": "get_model"}])),
        );
        let resp = hub.dispatch(req.clone()).await;
        assert!(resp.is_error());
        assert_eq!(resp.payload["status_code"], 404);
        assert_eq!(resp.request_id(), Some(req.message_id.as_str()));
    }

    #[tokio::test]
    async fn missing_parts_are_invalid_payload() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        for payload in [
            json!({"routing_rules": [], "default_target": "x", "request": {"operation": "list_models"}}),
            json!({"routing_rules": [{"target": "a"}], "request": {"operation": "list_models"}}),
            json!({"routing_rules": [{"target": "a"}], "default_target": "x"}),
        ] {
            let resp = hub.dispatch(request("route_request", payload)).await;
            assert_eq!(resp.payload["kind"], "InvalidPayload");
        }
        assert!(transport.calls().is_empty());
    }
}
