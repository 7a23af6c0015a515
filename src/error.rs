//! Error taxonomy for controller calls
//!
//! Every failure a dispatcher call can produce is a [`ControllerError`].
//! [`ControllerError::NotFound`] is the one recoverable outcome: resource
//! reads and deletes test for it with [`ControllerError::is_not_found`]
//! instead of re-parsing reason text.

use crate::controller::transport::TransportError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Stage of a call at which a transport failure happened.
/// Decode failures are reported as [`ControllerError::Decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submit,
    Poll,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Poll => "poll",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by controller operations
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Network or transport failure; never retried here.
    #[error("{action}: {stage} failed: {source}")]
    Transport {
        action: String,
        stage: Stage,
        #[source]
        source: TransportError,
    },

    /// The caller's cancellation token fired while the job was in flight.
    #[error("{action}: cancelled")]
    Cancelled { action: String },

    /// The caller-supplied timeout elapsed before the job finished.
    #[error("{action}: timed out after {after:?}")]
    Timeout { action: String, after: Duration },

    /// The envelope or an artifact could not be decoded.
    /// `body` is a bounded excerpt of the offending payload.
    #[error("{action}: failed to decode {what}: {message} (body: {body})")]
    Decode {
        action: String,
        what: String,
        message: String,
        body: String,
    },

    /// The controller answered `return=false`.
    #[error("rest API {action} {method} failed: {reason}")]
    ApiRejected {
        action: String,
        method: String,
        reason: String,
    },

    /// The controller reports that the object does not exist.
    #[error("object not found")]
    NotFound,

    /// The call succeeded but produced no value for a required field.
    #[error("{action}: controller did not return {field} and none was supplied")]
    MissingResult { action: String, field: String },

    /// The operation was rejected before anything was sent.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// An artifact could not be written in full.
    #[error("failed to write artifact {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ControllerError {
    /// True for the "object does not exist" sentinel
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// True when the call never got a verdict from the controller
    /// (network failure, cancellation or timeout)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Cancelled { .. } | Self::Timeout { .. }
        )
    }

    /// Map a transport error to its place in the taxonomy.
    /// Cancellation keeps its own variant so callers can tell it apart
    /// from a controller rejection.
    pub(crate) fn from_transport(action: &str, stage: Stage, err: TransportError) -> Self {
        match err {
            TransportError::Cancelled => Self::Cancelled {
                action: action.to_string(),
            },
            source => Self::Transport {
                action: action.to_string(),
                stage,
                source,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;

/// Turn the not-found sentinel into `Ok(None)`.
///
/// Used by idempotent deletes and drift-tolerant reads.
pub fn ignore_not_found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ControllerError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}
