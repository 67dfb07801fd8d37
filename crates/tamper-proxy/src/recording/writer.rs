//! Persists matched upstream response bodies to flat files.

use crate::config::{BodyType, Patch};
use crate::matcher::RequestDescriptor;
use bytes::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_FILENAME_CHARS: usize = 200;
const DEFAULT_EXTENSION: &str = "json";

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Failed to write recording to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File name a recording is written to.
///
/// A `file` patch names the target explicitly, even when the name is empty.
/// Otherwise the name is built from method and uri, with path separators
/// flattened to `_` and the result cut to 200 characters.
pub fn derive_filename(patch: &Patch, descriptor: &RequestDescriptor) -> String {
    if patch.body_type == BodyType::File {
        return patch.body.clone();
    }

    format!(
        "{}_{}.{}",
        descriptor.method, descriptor.uri, DEFAULT_EXTENSION
    )
    .replace(['/', '\\'], "_")
    .chars()
    .take(MAX_FILENAME_CHARS)
    .collect()
}

/// Writes response bodies beneath a base directory.
///
/// Relative file names resolve against `base_dir`; absolute names are used as is.
/// Missing parent directories are not created.
#[derive(Debug, Clone)]
pub struct RecordWriter {
    base_dir: PathBuf,
}

impl RecordWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn target_path(&self, patch: &Patch, descriptor: &RequestDescriptor) -> PathBuf {
        self.base_dir.join(derive_filename(patch, descriptor))
    }

    /// Write the body of `response` verbatim and put the same bytes back.
    ///
    /// Status and headers are left untouched, and the body is restored whether
    /// or not the write succeeds.
    pub fn record(
        &self,
        patch: &Patch,
        descriptor: &RequestDescriptor,
        response: &mut Response<Bytes>,
    ) -> Result<PathBuf, RecordError> {
        let path = self.target_path(patch, descriptor);
        let body = std::mem::take(response.body_mut());

        let result = std::fs::write(&path, &body);
        *response.body_mut() = body;

        result.map_err(|source| RecordError::Write {
            path: path.clone(),
            source,
        })?;

        debug!(
            "Wrote {} bytes for {} {} to {:?}",
            response.body().len(),
            descriptor.method,
            descriptor.uri,
            path
        );
        Ok(path)
    }
}
