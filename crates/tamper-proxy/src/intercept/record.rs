//! Record mode: archive matched upstream responses.

use crate::config::Snapshot;
use crate::matcher::{evaluate, MatchOutcome, RequestDescriptor};
use crate::metrics;
use crate::recording::RecordWriter;
use bytes::Bytes;
use hyper::Response;
use tracing::{info, warn};

/// Captures responses selected by the configured `responses` rules.
///
/// Request rules are never consulted in this mode.
pub struct RecordInterceptor {
    writer: RecordWriter,
}

impl RecordInterceptor {
    pub fn new(writer: RecordWriter) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &RecordWriter {
        &self.writer
    }

    /// Always declines.
    pub fn handle_request(
        &self,
        _snapshot: &Snapshot,
        _descriptor: &RequestDescriptor,
    ) -> Option<Response<Bytes>> {
        None
    }

    /// Write the body of a matched response to disk. The response itself is
    /// delivered exactly as received.
    pub fn handle_response(
        &self,
        snapshot: &Snapshot,
        descriptor: &RequestDescriptor,
        response: &mut Response<Bytes>,
    ) {
        let rule = match evaluate(descriptor, &snapshot.rules.response_rules) {
            MatchOutcome::Matched(rule) => rule,
            MatchOutcome::NoMatch => return,
            MatchOutcome::InvalidPattern { .. } => {
                metrics::record_rule_error("invalid_pattern");
                return;
            }
        };

        match self.writer.record(&rule.patch, descriptor, response) {
            Ok(path) => {
                metrics::record_recording(true);
                info!(
                    "Recorded {} {} (rule #{}, status {}) to {:?}",
                    descriptor.method,
                    descriptor.uri,
                    rule.index,
                    response.status(),
                    path
                );
            }
            Err(e) => {
                metrics::record_recording(false);
                warn!(
                    "Skipping recording of {} {}: {}",
                    descriptor.method, descriptor.uri, e
                );
            }
        }
    }
}
