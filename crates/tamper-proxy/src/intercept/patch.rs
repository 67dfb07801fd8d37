//! Patch mode: answer or rewrite matched traffic.

use crate::config::Snapshot;
use crate::matcher::{evaluate, MatchOutcome, RequestDescriptor};
use crate::metrics;
use crate::proxy::headers::{TamperHeadersExt, VALUE_REQUEST, VALUE_RESPONSE, X_TAMPER_PATCHED};
use crate::response::{resolve, BodyError, ResolvedBody, ResponseBuilder};
use crate::rules::CompiledRule;
use bytes::Bytes;
use hyper::header::{HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use hyper::Response;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct PatchInterceptor;

impl PatchInterceptor {
    /// Synthetic response for the first matching request rule, if any.
    pub fn handle_request(
        &self,
        snapshot: &Snapshot,
        descriptor: &RequestDescriptor,
    ) -> Option<Response<Bytes>> {
        let (rule, resolved) = match_and_resolve(descriptor, &snapshot.rules.request_rules)?;

        info!(
            "Patched request {} {} with rule #{} (status {})",
            descriptor.method, descriptor.uri, rule.index, resolved.status
        );
        metrics::record_patch("request");

        let mut response = ResponseBuilder::new(resolved.status)
            .body(resolved.body)
            .build();
        if let Some(content_type) = resolved.content_type {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        response.set_header(&X_TAMPER_PATCHED, &VALUE_REQUEST);
        Some(response)
    }

    /// Replace status and body of the upstream response when a response rule
    /// matches the request that produced it.
    ///
    /// The upstream `content-type` describes a body that is gone, so it is
    /// replaced when the patch names one and removed otherwise.
    pub fn handle_response(
        &self,
        snapshot: &Snapshot,
        descriptor: &RequestDescriptor,
        response: &mut Response<Bytes>,
    ) {
        let Some((rule, resolved)) = match_and_resolve(descriptor, &snapshot.rules.response_rules)
        else {
            return;
        };

        info!(
            "Patched response for {} {} with rule #{} (upstream status {}, patched status {})",
            descriptor.method,
            descriptor.uri,
            rule.index,
            response.status(),
            resolved.status
        );
        metrics::record_patch("response");

        let len = resolved.body.len();
        *response.status_mut() = resolved.status;
        *response.body_mut() = resolved.body;

        let headers = response.headers_mut();
        headers.remove(TRANSFER_ENCODING);
        headers.remove(CONTENT_ENCODING);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        match resolved.content_type {
            Some(content_type) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
            None => {
                headers.remove(CONTENT_TYPE);
            }
        }
        response.set_header(&X_TAMPER_PATCHED, &VALUE_RESPONSE);
    }
}

/// First matching rule together with its resolved body.
///
/// Every failure on the way (no rule, invalid pattern, unreadable body file,
/// bad status) is reported as `None` so the caller carries on as if nothing
/// matched.
fn match_and_resolve<'a>(
    descriptor: &RequestDescriptor,
    rules: &'a [CompiledRule],
) -> Option<(&'a CompiledRule, ResolvedBody)> {
    let rule = match evaluate(descriptor, rules) {
        MatchOutcome::Matched(rule) => rule,
        MatchOutcome::NoMatch => {
            debug!("No rule matched {} {}", descriptor.method, descriptor.uri);
            return None;
        }
        MatchOutcome::InvalidPattern { .. } => {
            metrics::record_rule_error("invalid_pattern");
            return None;
        }
    };

    match resolve(&rule.patch) {
        Ok(resolved) => Some((rule, resolved)),
        Err(e) => {
            let kind = match e {
                BodyError::SourceUnavailable { .. } => "body_unavailable",
                BodyError::InvalidStatus(_) => "invalid_status",
            };
            metrics::record_rule_error(kind);
            warn!(
                "Rule #{} matched {} {} but cannot be applied, passing through: {}",
                rule.index, descriptor.method, descriptor.uri, e
            );
            None
        }
    }
}
