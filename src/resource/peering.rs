//! Transit gateway peerings

use crate::controller::checker::NotFoundCheck;
use crate::controller::client::ControllerClient;
use crate::controller::dispatch::{AsyncOperation, CallOptions};
use crate::error::{ControllerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const CREATE_TRANSIT_PEERING: &str = "create_inter_transit_gateway_peering";
pub const LIST_TRANSIT_PEERINGS: &str = "list_inter_transit_gateway_peering";
pub const DELETE_TRANSIT_PEERING: &str = "delete_inter_transit_gateway_peering";

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransitPeeringRequest {
    pub gateway1: String,
    pub gateway2: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_filter_cidrs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_filter_cidrs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_network_peering: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransitPeering {
    pub gateway1: String,
    pub gateway2: String,
    pub private_network_peering: bool,
}

impl TransitPeering {
    /// True when this peering joins `a` and `b`, in either order
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.gateway1 == a && self.gateway2 == b) || (self.gateway1 == b && self.gateway2 == a)
    }
}

pub async fn create_transit_peering(client: &ControllerClient, request: &TransitPeeringRequest) -> Result<()> {
    let op = AsyncOperation::new(CREATE_TRANSIT_PEERING, request)?;
    client.post_async(&op, &CallOptions::new()).await?;
    tracing::info!("Transit peering {} <-> {} created", request.gateway1, request.gateway2);
    Ok(())
}

/// Find the peering between two transit gateways
pub async fn get_transit_peering(client: &ControllerClient, gateway1: &str, gateway2: &str) -> Result<TransitPeering> {
    let op = AsyncOperation::bare(LIST_TRANSIT_PEERINGS)?;
    let completion = client.post(&op, &CallOptions::new()).await?;

    // An empty list comes back as null on some controller versions
    let peerings: Vec<TransitPeering> = if completion.results().is_null() {
        Vec::new()
    } else {
        completion.decode_results()?
    };

    peerings
        .into_iter()
        .find(|p| p.connects(gateway1, gateway2))
        .ok_or(ControllerError::NotFound)
}

pub async fn delete_transit_peering(client: &ControllerClient, gateway1: &str, gateway2: &str) -> Result<()> {
    let op = AsyncOperation::new(
        DELETE_TRANSIT_PEERING,
        &json!({ "gateway1": gateway1, "gateway2": gateway2 }),
    )?;
    let opts = CallOptions::new().with_checker(NotFoundCheck::does_not_exist());

    client.post_async(&op, &opts).await?;
    tracing::info!("Transit peering {} <-> {} deleted", gateway1, gateway2);
    Ok(())
}
