//! Resource operations
//!
//! One module per resource kind, each built on the controller dispatcher.
//! Reads and deletes classify "does not exist" replies as
//! [`crate::ControllerError::NotFound`] so callers can treat absence as a
//! normal outcome.
//!
//! # Example
//!
//! ```ignore
//! use netctrl::resource::gateway::{create_ha_gateway, HaGatewayRequest};
//!
//! async fn example(client: &netctrl::ControllerClient) -> netctrl::Result<()> {
//!     let request = HaGatewayRequest {
//!         gw_name: "aws-vpc-1-gw-1".to_string(),
//!         gw_subnet: "10.0.1.0/24".to_string(),
//!         ..Default::default()
//!     };
//!     let ha_name = create_ha_gateway(client, &request).await?;
//!     Ok(())
//! }
//! ```

pub mod edge;
pub mod gateway;
pub mod peering;
