//! Request and response envelopes.
//!
//! A request carries the claimed client id, a signature, and the body the
//! signature covers. The body is a JSON array of actions. The signature is
//! checked over the body string exactly as received, so the body is never
//! re-serialized before verification.

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionType};
use crate::error::{CoreError, Result};
use crate::result::ActionResult;
use crate::types::ClientId;

/// A signed request to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub client_id: ClientId,
    pub signature: String,
    pub body: String,
}

/// The service's answer: one result per action, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub results: Vec<ActionResult>,
}

impl Response {
    /// Whether every action in the batch succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }
}

/// Serialize an ordered list of actions into a request body.
pub fn encode_actions(actions: &[Action]) -> Result<String> {
    Ok(serde_json::to_string(actions)?)
}

/// Split a request body into its raw actions.
///
/// Only the outer array is validated here. Each element is decoded on its
/// own with [`decode_action`] so that one malformed action cannot take the
/// rest of the batch down with it.
pub fn decode_actions(body: &str) -> Result<Vec<serde_json::Value>> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| CoreError::MalformedBody(e.to_string()))?;

    match value {
        serde_json::Value::Array(actions) => Ok(actions),
        other => Err(CoreError::MalformedBody(format!(
            "expected an array of actions, got {}",
            json_kind(&other)
        ))),
    }
}

/// Decode one raw action.
pub fn decode_action(index: usize, raw: serde_json::Value) -> Result<Action> {
    serde_json::from_value(raw).map_err(|e| CoreError::MalformedAction {
        index,
        message: e.to_string(),
    })
}

/// Best-effort action type of a raw action, for reporting decode failures.
pub fn raw_action_type(raw: &serde_json::Value) -> ActionType {
    raw.get("type")
        .cloned()
        .and_then(|t| serde_json::from_value(t).ok())
        .unwrap_or(ActionType::Unknown)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::LoginPayload;
    use serde_json::json;

    #[test]
    fn test_body_encodes_in_order() {
        let actions = vec![
            Action::Login(LoginPayload {
                crypt_pub_key: "a".into(),
            }),
            Action::Login(LoginPayload {
                crypt_pub_key: "b".into(),
            }),
        ];
        let body = encode_actions(&actions).unwrap();
        let raw = decode_actions(&body).unwrap();

        assert_eq!(raw.len(), 2);
        assert_eq!(raw[1]["payload"]["cryptPubKey"], "b");
        assert_eq!(decode_action(0, raw[0].clone()).unwrap(), actions[0]);
    }

    #[test]
    fn test_body_must_be_array() {
        let err = decode_actions("{\"type\":\"Login\"}").unwrap_err();
        assert!(matches!(err, CoreError::MalformedBody(_)));

        let err = decode_actions("not json").unwrap_err();
        assert!(matches!(err, CoreError::MalformedBody(_)));
    }

    #[test]
    fn test_raw_action_type() {
        assert_eq!(
            raw_action_type(&json!({"type": "GrantAccess", "payload": 5})),
            ActionType::GrantAccess
        );
        assert_eq!(raw_action_type(&json!(42)), ActionType::Unknown);
    }

    #[test]
    fn test_request_wire_names() {
        let request = Request {
            client_id: ClientId::from("c1"),
            signature: "sig".into(),
            body: "[]".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"clientId": "c1", "signature": "sig", "body": "[]"}));
    }
}
