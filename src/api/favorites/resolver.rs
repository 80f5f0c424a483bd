use serde::Serialize;
use serde_json::{Map, Value};

use super::ApiFavorite;

/// Arguments for one `send` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendArgs {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

/// Turn a stored favorite into the action and arguments to send.
///
/// Custom payloads holding a JSON object with a string `action` field split
/// into that action plus the remaining fields. Any other payload is sent
/// verbatim as the action id. Returns `None` only for a blank custom payload.
pub fn resolve_favorite(favorite: &ApiFavorite) -> Option<SendArgs> {
    match favorite {
        ApiFavorite::Action {
            action_id, data, ..
        } => Some(SendArgs {
            action: action_id.clone(),
            data: data.clone(),
        }),
        ApiFavorite::Custom { payload, .. } => resolve_custom_payload(payload),
    }
}

fn resolve_custom_payload(payload: &str) -> Option<SendArgs> {
    if let Ok(Value::Object(mut fields)) = serde_json::from_str::<Value>(payload)
        && let Some(Value::String(action)) = fields.remove("action")
        && !action.is_empty()
    {
        return Some(SendArgs {
            action,
            data: Some(fields),
        });
    }

    if payload.trim().is_empty() {
        return None;
    }
    Some(SendArgs {
        action: payload.to_string(),
        data: None,
    })
}
