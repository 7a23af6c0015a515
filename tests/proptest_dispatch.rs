//! Property-based tests using proptest
//!
//! These tests verify the dispatcher's request invariants, reason
//! classification and artifact decoding using randomized inputs.

use async_trait::async_trait;
use base64::Engine;
use netctrl::artifact::extract;
use netctrl::{
    resolve_name, ArtifactKind, AsyncOperation, BasicCheck, CallOptions, ControllerError, Dispatcher,
    NotFoundCheck, RequestEnvelope, ResultChecker, Transport, TransportError,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Transport that records requests and always reports success
#[derive(Default)]
struct RecordingTransport {
    seen: Mutex<Vec<RequestEnvelope>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: &RequestEnvelope, _: &CancellationToken) -> Result<String, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(json!({ "return": true }).to_string())
    }

    async fn run_async(&self, request: &RequestEnvelope, _: &CancellationToken) -> Result<String, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(json!({ "return": true }).to_string())
    }
}

/// Arbitrary caller-supplied value for the async flag (or none at all)
fn arb_async_flag() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        any::<bool>().prop_map(|b| Some(Value::Bool(b))),
        "[a-z]{0,8}".prop_map(|s| Some(Value::String(s))),
        any::<i64>().prop_map(|n| Some(json!(n))),
    ]
}

/// Arbitrary request fields
fn arb_fields() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z_]{1,12}", "[a-zA-Z0-9./-]{0,20}", 0..8).prop_map(|m| {
        m.into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()
    })
}

proptest! {
    /// The async flag on the wire is always true, whatever the caller sent
    #[test]
    fn submitted_async_flag_is_always_true(
        mut fields in arb_fields(),
        flag in arb_async_flag(),
    ) {
        if let Some(flag) = flag {
            fields.insert("async".to_string(), flag);
        }
        let op = AsyncOperation::new("create_multicloud_ha_gateway", &Value::Object(fields.clone())).unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = Dispatcher::new(transport.clone(), "cid");
        tokio_test::block_on(dispatcher.submit(&op, &CallOptions::new())).unwrap();

        let seen = transport.seen.lock().unwrap();
        prop_assert_eq!(seen.len(), 1);
        prop_assert_eq!(seen[0].get("async"), Some(&Value::Bool(true)));
        // Caller fields are left as they were
        prop_assert_eq!(op.payload(), &fields);
    }

    /// Non-injected caller fields reach the wire unchanged
    #[test]
    fn caller_fields_are_forwarded(fields in arb_fields()) {
        let request = RequestEnvelope::build("delete_container", &fields, "cid", true);
        for (key, value) in &fields {
            if key == "action" || key == "async" {
                continue;
            }
            prop_assert_eq!(request.get(key), Some(value));
        }
        prop_assert_eq!(request.session(), Some("cid"));
    }

    /// Reasons containing "does not exist" classify as not found
    #[test]
    fn does_not_exist_is_not_found(prefix in "[a-zA-Z0-9 -]{0,20}", suffix in "[a-zA-Z0-9 .]{0,20}") {
        let reason = format!("{prefix}does not exist{suffix}");
        let err = NotFoundCheck::does_not_exist()
            .check("get_gateway_info", "Post", &reason, false)
            .unwrap_err();
        prop_assert!(err.is_not_found());
    }

    /// Any other reason is a generic rejection carrying the reason verbatim
    #[test]
    fn other_reasons_are_rejections(reason in "[a-zA-Z0-9 .]{0,40}") {
        prop_assume!(!reason.contains("does not exist"));
        let err = NotFoundCheck::does_not_exist()
            .check("get_gateway_info", "Post", &reason, false)
            .unwrap_err();
        match err {
            ControllerError::ApiRejected { reason: got, .. } => prop_assert_eq!(got, reason),
            other => prop_assert!(false, "unexpected error: {:?}", other),
        }
    }

    /// Success never produces an error, whatever the reason text
    #[test]
    fn success_is_never_an_error(reason in ".*") {
        prop_assert!(BasicCheck.check("a", "Post", &reason, true).is_ok());
        prop_assert!(NotFoundCheck::does_not_exist().check("a", "Post", &reason, true).is_ok());
    }

    /// Valid base64 decodes to exactly the encoded bytes
    #[test]
    fn iso_extraction_returns_exact_bytes(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let decoded = extract("create_edge_gateway", &encoded, ArtifactKind::Iso).unwrap();
        prop_assert_eq!(decoded, bytes);
    }

    /// Artifact file names follow the fixed patterns
    #[test]
    fn artifact_file_names_are_deterministic(gw in "[a-z][a-z0-9-]{0,20}", site in "[a-z0-9-]{1,12}") {
        prop_assert_eq!(ArtifactKind::Iso.file_name(&gw, &site), format!("{gw}-{site}.iso"));
        prop_assert_eq!(
            ArtifactKind::CloudInit.file_name(&gw, &site),
            format!("{gw}-{site}-cloud-init.txt")
        );
    }

    /// Hook result > caller value > failure
    #[test]
    fn name_resolution_priority(
        hook in proptest::option::of("[a-z0-9-]{0,10}"),
        fallback in proptest::option::of("[a-z0-9-]{0,10}"),
    ) {
        let result = resolve_name("create_multicloud_ha_gateway", "ha_gw_name", hook.as_deref(), fallback.as_deref());
        let expected = hook
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| fallback.clone().filter(|s| !s.is_empty()));

        match expected {
            Some(name) => prop_assert_eq!(result.unwrap(), name),
            None => {
                let is_missing = matches!(result, Err(ControllerError::MissingResult { .. }));
                prop_assert!(is_missing);
            }
        }
    }
}
