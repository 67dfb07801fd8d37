//! Interception strategies.
//!
//! The proxy runs in exactly one mode, picked at startup:
//!
//! - `patch` - matched requests are answered with a synthetic response and
//!   matched upstream responses are rewritten
//! - `record` - requests always go upstream; matched responses are written to
//!   disk and delivered unchanged

mod patch;
mod record;

pub use patch::PatchInterceptor;
pub use record::RecordInterceptor;

use crate::config::{ConfigStore, Snapshot};
use crate::matcher::RequestDescriptor;
use crate::recording::RecordWriter;
use bytes::Bytes;
use hyper::Response;
use std::fmt;
use std::sync::Arc;

/// Interception mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterceptMode {
    /// Serve and apply configured patches
    #[default]
    Patch,
    /// Capture matched upstream responses
    Record,
}

impl InterceptMode {
    pub fn from_record_flag(record: bool) -> Self {
        if record {
            InterceptMode::Record
        } else {
            InterceptMode::Patch
        }
    }
}

impl fmt::Display for InterceptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptMode::Patch => write!(f, "patch"),
            InterceptMode::Record => write!(f, "record"),
        }
    }
}

enum Strategy {
    Patch(PatchInterceptor),
    Record(RecordInterceptor),
}

/// The active strategy, fixed for the lifetime of the proxy, and the store its
/// rules come from.
///
/// The hooks never read the store themselves. The caller loads one snapshot
/// per request and hands the same one to both hooks.
pub struct Interceptor {
    store: Arc<ConfigStore>,
    strategy: Strategy,
}

impl Interceptor {
    pub fn new(mode: InterceptMode, store: Arc<ConfigStore>, writer: RecordWriter) -> Self {
        let strategy = match mode {
            InterceptMode::Patch => Strategy::Patch(PatchInterceptor),
            InterceptMode::Record => Strategy::Record(RecordInterceptor::new(writer)),
        };
        Self { store, strategy }
    }

    pub fn mode(&self) -> InterceptMode {
        match self.strategy {
            Strategy::Patch(_) => InterceptMode::Patch,
            Strategy::Record(_) => InterceptMode::Record,
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// `Some` means the request is fully handled and must not be forwarded.
    pub fn handle_request(
        &self,
        snapshot: &Snapshot,
        descriptor: &RequestDescriptor,
    ) -> Option<Response<Bytes>> {
        match &self.strategy {
            Strategy::Patch(p) => p.handle_request(snapshot, descriptor),
            Strategy::Record(r) => r.handle_request(snapshot, descriptor),
        }
    }

    /// Inspect, and possibly rewrite, the upstream response for `descriptor`.
    pub fn handle_response(
        &self,
        snapshot: &Snapshot,
        descriptor: &RequestDescriptor,
        response: &mut Response<Bytes>,
    ) {
        match &self.strategy {
            Strategy::Patch(p) => p.handle_response(snapshot, descriptor, response),
            Strategy::Record(r) => r.handle_response(snapshot, descriptor, response),
        }
    }
}
