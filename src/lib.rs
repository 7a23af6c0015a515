//! netctrl
//!
//! Client library for a cloud network controller's HTTP API. Long-running
//! mutations are submitted as background jobs, tracked to completion and
//! their results extracted, including values that only exist in the final
//! payload and ZTP artifacts produced by gateway creation.

pub mod artifact;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod resource;

pub use artifact::{Artifact, ArtifactKind, ArtifactSink, FsArtifactSink};
pub use controller::checker::{BasicCheck, NotFoundCheck, ResultChecker};
pub use controller::client::ControllerClient;
pub use controller::dispatch::{resolve_name, AsyncOperation, CallOptions, Completion, Dispatcher};
pub use controller::hooks::{HookRegistry, ResponseHook};
pub use controller::transport::{RequestEnvelope, Transport, TransportError};
pub use error::{ignore_not_found, ControllerError, Result};
