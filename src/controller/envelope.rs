//! Response envelope
//!
//! Every controller reply is `{return: bool, reason: string, results: any}`.
//! `results` is only meaningful when `return` is true and its shape depends
//! on the action (string, object, array or absent).

use crate::error::ControllerError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Maximum number of body bytes kept in a decode error
pub const MAX_ERROR_BODY_LENGTH: usize = 512;

/// Decoded controller reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "return")]
    pub ok: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reason: String,
    #[serde(default)]
    pub results: Value,
}

/// Some controller versions send `"reason": null` on failures
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ResponseEnvelope {
    /// Decode a raw response body
    pub fn parse(action: &str, body: &str) -> Result<Self, ControllerError> {
        serde_json::from_str(body).map_err(|e| ControllerError::Decode {
            action: action.to_string(),
            what: "response envelope".to_string(),
            message: e.to_string(),
            body: body_excerpt(body, MAX_ERROR_BODY_LENGTH),
        })
    }

    /// `results` as a string, if it is one
    pub fn results_str(&self) -> Option<&str> {
        self.results.as_str()
    }
}

/// Truncate a body to at most `max` bytes without splitting a character
pub fn body_excerpt(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
}

/// Untyped view of a successful `results` payload handed to hooks.
///
/// Built defensively: anything that is not a JSON object yields an empty
/// payload instead of an error, and every accessor returns `Option`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookPayload {
    fields: Map<String, Value>,
}

impl HookPayload {
    /// Build from `results`; non-object shapes give an empty payload
    pub fn from_results(results: &Value) -> Self {
        match results {
            Value::Object(map) => Self { fields: map.clone() },
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String field, ignoring empty strings and non-string values
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Partial decode into a narrow structural type.
    /// Missing fields are fine as long as `T` defaults them.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_success_envelope() {
        let env = ResponseEnvelope::parse(
            "create_multicloud_ha_gateway",
            r#"{"return": true, "reason": "", "results": {"ha_gw_name": "aws-vpc-1-gw-1-1"}}"#,
        )
        .unwrap();
        assert!(env.ok);
        assert_eq!(env.results["ha_gw_name"], "aws-vpc-1-gw-1-1");
    }

    #[test]
    fn test_parse_tolerates_missing_reason_and_results() {
        let env = ResponseEnvelope::parse("delete_container", r#"{"return": true}"#).unwrap();
        assert!(env.ok);
        assert_eq!(env.reason, "");
        assert!(env.results.is_null());
    }

    #[test]
    fn test_parse_null_reason_is_empty() {
        let env = ResponseEnvelope::parse("delete_container", r#"{"return": false, "reason": null}"#).unwrap();
        assert!(!env.ok);
        assert_eq!(env.reason, "");
    }

    #[test]
    fn test_parse_accepts_heterogeneous_results() {
        for body in [
            r#"{"return": true, "results": "done"}"#,
            r#"{"return": true, "results": [1, 2, 3]}"#,
            r#"{"return": true, "results": {"a": 1}}"#,
            r#"{"return": true, "results": null}"#,
        ] {
            assert!(ResponseEnvelope::parse("x", body).is_ok(), "{body}");
        }
    }

    #[test]
    fn test_parse_failure_bounds_body() {
        let body = format!("<html>{}</html>", "x".repeat(4096));
        let err = ResponseEnvelope::parse("get_gateway_info", &body).unwrap_err();
        match err {
            ControllerError::Decode { action, body: excerpt, .. } => {
                assert_eq!(action, "get_gateway_info");
                assert!(excerpt.len() < 600);
                assert!(excerpt.contains("truncated"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_body_excerpt_respects_char_boundaries() {
        let body = "é".repeat(10);
        let excerpt = body_excerpt(&body, 5);
        assert!(excerpt.starts_with("éé"));
    }

    #[test]
    fn test_hook_payload_from_non_object_is_empty() {
        assert!(HookPayload::from_results(&json!("aGVsbG8=")).is_empty());
        assert!(HookPayload::from_results(&json!([1, 2])).is_empty());
        assert!(HookPayload::from_results(&Value::Null).is_empty());
    }

    #[test]
    fn test_hook_payload_str_field() {
        let payload = HookPayload::from_results(&json!({
            "ha_gw_name": "gw-hagw",
            "empty": "",
            "count": 3
        }));
        assert_eq!(payload.str_field("ha_gw_name"), Some("gw-hagw"));
        assert_eq!(payload.str_field("empty"), None);
        assert_eq!(payload.str_field("count"), None);
        assert_eq!(payload.str_field("missing"), None);
    }

    #[test]
    fn test_hook_payload_partial_decode() {
        #[derive(Deserialize, Default)]
        struct Names {
            #[serde(default)]
            gw_name: Option<String>,
        }

        let payload = HookPayload::from_results(&json!({ "gw_name": "edge-1", "other": true }));
        let names: Names = payload.decode().unwrap();
        assert_eq!(names.gw_name.as_deref(), Some("edge-1"));

        let names: Names = HookPayload::default().decode().unwrap();
        assert!(names.gw_name.is_none());
    }
}
