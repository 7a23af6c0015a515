//! Controller API interaction module
//!
//! # Module Structure
//!
//! - [`envelope`] - The `{return, reason, results}` reply and the untyped hook payload
//! - [`checker`] - Result checkers classifying failed replies
//! - [`hooks`] - Callbacks extracting values from completion payloads
//! - [`dispatch`] - Submits operations and runs decode, classify and hooks
//! - [`transport`] - The seam between the dispatcher and the wire
//! - [`http`] - reqwest transport with task status polling
//! - [`client`] - Login and the session-bound client
//!
//! # Example
//!
//! ```ignore
//! use netctrl::controller::client::ControllerClient;
//! use netctrl::config::ClientConfig;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = ControllerClient::connect(&ClientConfig::load()).await?;
//!     let done = client
//!         .post_async_fields("enable_segmentation", serde_json::json!({ "transit_gateway_name": "transit-1" }))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod checker;
pub mod client;
pub mod dispatch;
pub mod envelope;
pub mod hooks;
pub mod http;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
