//! Edge gateways
//!
//! Creating an edge gateway yields a ZTP artifact once the job finishes.

use crate::artifact::{Artifact, ArtifactKind, ArtifactSink};
use crate::controller::checker::NotFoundCheck;
use crate::controller::client::ControllerClient;
use crate::controller::dispatch::{AsyncOperation, CallOptions};
use crate::error::Result;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

pub const CREATE_EDGE_GATEWAY: &str = "create_edge_gateway";
pub const DELETE_EDGE_GATEWAY: &str = "delete_edge_gateway";

#[derive(Debug, Clone, Serialize)]
pub struct EdgeGatewayRequest {
    pub gw_name: String,
    pub site_id: String,
    pub ztp_file_type: ArtifactKind,
    /// "DHCP" or "Static"
    pub management_interface_config: String,
    pub wan_interface_ip_prefix: String,
    pub wan_default_gateway_ip: String,
    pub lan_interface_ip_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_interface_ip_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_default_gateway_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_server_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_dns_server_ip: Option<String>,
}

/// Create an edge gateway and persist its ZTP artifact.
///
/// Returns where the artifact was written, or `None` when the controller
/// sent no payload.
pub async fn create_edge_gateway(
    client: &ControllerClient,
    request: &EdgeGatewayRequest,
    sink: &dyn ArtifactSink,
) -> Result<Option<PathBuf>> {
    let op = AsyncOperation::new(CREATE_EDGE_GATEWAY, request)?;
    let completion = client.post_async(&op, &CallOptions::new()).await?;

    let artifact = Artifact::from_completion(
        &completion,
        request.ztp_file_type,
        &request.gw_name,
        &request.site_id,
    )?;

    match artifact {
        Some(artifact) => sink.persist(&artifact).map(Some),
        None => {
            tracing::warn!("{}: no ZTP payload returned for {}", CREATE_EDGE_GATEWAY, request.gw_name);
            Ok(None)
        }
    }
}

/// Delete an edge gateway; [`crate::ControllerError::NotFound`] when already gone
pub async fn delete_edge_gateway(client: &ControllerClient, gw_name: &str) -> Result<()> {
    let op = AsyncOperation::new(DELETE_EDGE_GATEWAY, &json!({ "gw_name": gw_name }))?;
    let opts = CallOptions::new().with_checker(NotFoundCheck::does_not_exist());

    client.post_async(&op, &opts).await?;
    tracing::info!("Edge gateway {} deleted", gw_name);
    Ok(())
}
