//! Resolution of patch payloads.

use crate::config::{BodyType, Patch};
use bytes::Bytes;
use hyper::StatusCode;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("Patch body file {path:?} is unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Patch status {0} is not a valid HTTP status code")]
    InvalidStatus(u16),
}

/// Status and payload produced by a matched patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBody {
    pub status: StatusCode,
    pub body: Bytes,
    /// Set for `json` patches
    pub content_type: Option<&'static str>,
}

/// Resolve the status and payload of `patch`.
///
/// File-backed bodies are read on every call so edits show up without a reload.
/// Callers treat any error as if the rule had not matched.
pub fn resolve(patch: &Patch) -> Result<ResolvedBody, BodyError> {
    let status = match patch.status {
        0 => StatusCode::OK,
        code => StatusCode::from_u16(code).map_err(|_| BodyError::InvalidStatus(code))?,
    };

    let (body, content_type) = match patch.body_type {
        BodyType::File => {
            let contents =
                std::fs::read(&patch.body).map_err(|source| BodyError::SourceUnavailable {
                    path: PathBuf::from(&patch.body),
                    source,
                })?;
            (Bytes::from(contents), None)
        }
        BodyType::String => (Bytes::from(patch.body.clone()), None),
        BodyType::Json => (Bytes::from(patch.body.clone()), Some("application/json")),
    };

    Ok(ResolvedBody {
        status,
        body,
        content_type,
    })
}
