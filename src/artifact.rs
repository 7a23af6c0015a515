//! ZTP artifacts
//!
//! Edge gateway creation jobs return a zero-touch-provisioning payload in
//! `results` once they finish: a base64 ISO image or a plain cloud-init
//! script. This module decodes that payload and hands the bytes to an
//! [`ArtifactSink`].

use crate::config::ClientConfig;
use crate::controller::dispatch::Completion;
use crate::controller::envelope::{body_excerpt, MAX_ERROR_BODY_LENGTH};
use crate::error::{ControllerError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Kind of ZTP payload; decides decoding and file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Base64 encoded ISO image
    Iso,
    /// Plain text cloud-init script
    CloudInit,
}

impl ArtifactKind {
    /// Parse the controller's `ztp_file_type` value
    pub fn from_ztp_file_type(s: &str) -> Option<Self> {
        match s {
            "iso" => Some(Self::Iso),
            "cloud-init" => Some(Self::CloudInit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iso => "iso",
            Self::CloudInit => "cloud-init",
        }
    }

    /// File name used when persisting.
    /// Existing automation relies on these exact patterns.
    pub fn file_name(&self, gw_name: &str, site_id: &str) -> String {
        match self {
            Self::Iso => format!("{gw_name}-{site_id}.iso"),
            Self::CloudInit => format!("{gw_name}-{site_id}-cloud-init.txt"),
        }
    }
}

/// Decoded artifact ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Decode a results string according to `kind`
pub fn extract(action: &str, payload: &str, kind: ArtifactKind) -> Result<Vec<u8>> {
    match kind {
        ArtifactKind::CloudInit => Ok(payload.as_bytes().to_vec()),
        ArtifactKind::Iso => {
            let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| ControllerError::Decode {
                    action: action.to_string(),
                    what: "ZTP ISO artifact".to_string(),
                    message: e.to_string(),
                    body: body_excerpt(payload, MAX_ERROR_BODY_LENGTH),
                })
        }
    }
}

impl Artifact {
    /// Build the artifact carried by a finished creation job.
    ///
    /// `Ok(None)` when the job returned no payload; a payload that is not a
    /// string, or not valid base64 for an ISO, is a decode failure.
    pub fn from_completion(
        completion: &Completion,
        kind: ArtifactKind,
        gw_name: &str,
        site_id: &str,
    ) -> Result<Option<Self>> {
        let payload = match completion.results() {
            Value::Null => return Ok(None),
            Value::String(s) if s.is_empty() => return Ok(None),
            Value::String(s) => s,
            other => {
                return Err(ControllerError::Decode {
                    action: completion.action().to_string(),
                    what: "ZTP artifact".to_string(),
                    message: "expected a string payload".to_string(),
                    body: body_excerpt(&other.to_string(), MAX_ERROR_BODY_LENGTH),
                })
            }
        };

        let bytes = extract(completion.action(), payload, kind)?;
        Ok(Some(Self {
            kind,
            file_name: kind.file_name(gw_name, site_id),
            bytes,
        }))
    }
}

/// Destination for artifacts
pub trait ArtifactSink: Send + Sync {
    /// Persist the artifact in full, returning where it went
    fn persist(&self, artifact: &Artifact) -> Result<PathBuf>;
}

/// Writes artifacts as files under a directory
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    dir: PathBuf,
}

impl FsArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Sink writing into the configured `artifact_dir`
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.artifact_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for FsArtifactSink {
    fn persist(&self, artifact: &Artifact) -> Result<PathBuf> {
        let path = self.dir.join(&artifact.file_name);
        let write_err = |source| ControllerError::ArtifactWrite {
            path: path.clone(),
            source,
        };

        // The handle is closed on every return path when `file` drops
        let mut file = File::create(&path).map_err(write_err)?;
        file.write_all(&artifact.bytes).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;

        tracing::info!(
            "Wrote {} artifact {} ({} bytes)",
            artifact.kind.as_str(),
            path.display(),
            artifact.bytes.len()
        );
        Ok(path)
    }
}
