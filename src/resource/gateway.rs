//! Gateways
//!
//! HA gateway creation, gateway lookup and gateway deletion.

use crate::controller::checker::NotFoundCheck;
use crate::controller::client::ControllerClient;
use crate::controller::dispatch::{resolve_name, AsyncOperation, CallOptions};
use crate::controller::hooks::ResponseHook;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const CREATE_HA_GATEWAY: &str = "create_multicloud_ha_gateway";
pub const GET_GATEWAY: &str = "get_gateway_info";
pub const DELETE_GATEWAY: &str = "delete_container";

/// Results field carrying the generated HA gateway name
pub const HA_GW_NAME_FIELD: &str = "ha_gw_name";

/// Parameters for creating the standby peer of an existing gateway
#[derive(Debug, Clone, Default, Serialize)]
pub struct HaGatewayRequest {
    /// Primary gateway the HA peer is attached to
    pub gw_name: String,
    /// Subnet CIDR for the HA peer
    pub gw_subnet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gw_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insane_mode: Option<bool>,
    /// Desired name; the controller generates one when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ha_gw_name: Option<String>,
}

/// Gateway details as reported by the controller
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Gateway {
    pub gw_name: String,
    pub vpc_id: String,
    pub vpc_reg: String,
    pub cloud_type: i64,
    pub gw_size: String,
    pub public_ip: String,
    pub private_ip: String,
    pub ha_gw_name: Option<String>,
}

/// Create an HA gateway and return its name.
///
/// The name reported by the controller wins over the requested one; if
/// neither is available the call fails.
pub async fn create_ha_gateway(client: &ControllerClient, request: &HaGatewayRequest) -> Result<String> {
    let op = AsyncOperation::new(CREATE_HA_GATEWAY, request)?;
    let opts = CallOptions::new().with_hook(ResponseHook::field(HA_GW_NAME_FIELD));

    let completion = client.post_async(&op, &opts).await?;
    let name = resolve_name(
        CREATE_HA_GATEWAY,
        HA_GW_NAME_FIELD,
        completion.extracted(),
        request.ha_gw_name.as_deref(),
    )?;

    tracing::info!("HA gateway {} created for {}", name, request.gw_name);
    Ok(name)
}

/// Look up a gateway; [`crate::ControllerError::NotFound`] when it is gone
pub async fn get_gateway(client: &ControllerClient, gw_name: &str) -> Result<Gateway> {
    let op = AsyncOperation::new(GET_GATEWAY, &json!({ "gateway_name": gw_name }))?;
    let opts = CallOptions::new().with_checker(NotFoundCheck::does_not_exist());

    client.post(&op, &opts).await?.decode_results()
}

/// Delete a gateway; [`crate::ControllerError::NotFound`] when already gone
pub async fn delete_gateway(client: &ControllerClient, cloud_type: i64, gw_name: &str) -> Result<()> {
    let op = AsyncOperation::new(
        DELETE_GATEWAY,
        &json!({ "cloud_type": cloud_type, "gw_name": gw_name }),
    )?;
    let opts = CallOptions::new().with_checker(NotFoundCheck::does_not_exist());

    client.post_async(&op, &opts).await?;
    tracing::info!("Gateway {} deleted", gw_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::ScriptedTransport;
    use crate::error::{ignore_not_found, ControllerError};
    use std::sync::Arc;

    fn client(transport: Arc<ScriptedTransport>) -> ControllerClient {
        ControllerClient::with_session(transport, "cid")
    }

    fn ha_request() -> HaGatewayRequest {
        HaGatewayRequest {
            gw_name: "aws-vpc-1-gw-1".to_string(),
            gw_subnet: "10.0.1.0/24".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_ha_gateway_uses_generated_name() {
        let transport = Arc::new(ScriptedTransport::json(json!({
            "return": true,
            "reason": "",
            "results": { "ha_gw_name": "aws-vpc-1-gw-1-1" }
        })));

        let name = create_ha_gateway(&client(transport.clone()), &ha_request()).await.unwrap();
        assert_eq!(name, "aws-vpc-1-gw-1-1");

        let sent = transport.recorded().await;
        assert_eq!(sent[0].action(), CREATE_HA_GATEWAY);
        assert!(sent[0].is_async());
        assert!(sent[0].get(HA_GW_NAME_FIELD).is_none());
    }

    #[tokio::test]
    async fn test_create_ha_gateway_generated_name_beats_requested() {
        let transport = Arc::new(ScriptedTransport::json(json!({
            "return": true,
            "results": { "ha_gw_name": "from-controller" }
        })));
        let request = HaGatewayRequest {
            ha_gw_name: Some("requested".to_string()),
            ..ha_request()
        };

        let name = create_ha_gateway(&client(transport), &request).await.unwrap();
        assert_eq!(name, "from-controller");
    }

    #[tokio::test]
    async fn test_create_ha_gateway_falls_back_to_requested_name() {
        let transport = Arc::new(ScriptedTransport::json(json!({ "return": true, "results": "success" })));
        let request = HaGatewayRequest {
            ha_gw_name: Some("requested".to_string()),
            ..ha_request()
        };

        let name = create_ha_gateway(&client(transport), &request).await.unwrap();
        assert_eq!(name, "requested");
    }

    #[tokio::test]
    async fn test_create_ha_gateway_without_any_name_fails() {
        let transport = Arc::new(ScriptedTransport::json(json!({ "return": true, "results": {} })));

        let err = create_ha_gateway(&client(transport), &ha_request()).await.unwrap_err();
        assert!(matches!(err, ControllerError::MissingResult { .. }));
    }

    #[tokio::test]
    async fn test_get_gateway_decodes_details() {
        let transport = Arc::new(ScriptedTransport::json(json!({
            "return": true,
            "results": {
                "gw_name": "spoke-1",
                "vpc_id": "vpc-123",
                "cloud_type": 1,
                "public_ip": "3.3.3.3",
                "unknown_field": [1, 2]
            }
        })));

        let gw = get_gateway(&client(transport.clone()), "spoke-1").await.unwrap();
        assert_eq!(gw.gw_name, "spoke-1");
        assert_eq!(gw.cloud_type, 1);
        assert_eq!(gw.ha_gw_name, None);
        assert!(!transport.recorded().await[0].is_async());
    }

    #[tokio::test]
    async fn test_get_missing_gateway_is_not_found() {
        let transport = Arc::new(ScriptedTransport::json(json!({
            "return": false,
            "reason": "Gateway spoke-1 does not exist."
        })));

        let err = get_gateway(&client(transport), "spoke-1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_with_ignore_not_found() {
        let transport = Arc::new(ScriptedTransport::json(json!({
            "return": false,
            "reason": "object spoke-1 does not exist"
        })));

        let outcome = ignore_not_found(delete_gateway(&client(transport), 1, "spoke-1").await).unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_delete_other_failures_propagate() {
        let transport = Arc::new(ScriptedTransport::json(json!({
            "return": false,
            "reason": "Gateway spoke-1 has attachments"
        })));

        let err = delete_gateway(&client(transport), 1, "spoke-1").await.unwrap_err();
        assert!(matches!(err, ControllerError::ApiRejected { .. }));
    }
}
