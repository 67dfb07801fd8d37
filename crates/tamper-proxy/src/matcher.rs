//! Ordered, first-match-wins rule evaluation.

use crate::rules::{CompiledRule, UriPattern};
use hyper::Request;
use tracing::warn;

/// The parts of a request that rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: String,
    /// Path and query for inbound requests, the absolute URL for upstream ones
    pub uri: String,
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
        }
    }

    pub fn from_request<B>(req: &Request<B>) -> Self {
        let uri = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        Self::new(req.method().as_str(), uri)
    }

    /// Descriptor of a request as sent to the target, keyed by its absolute URL.
    ///
    /// Response rules and recording names are evaluated against this form.
    pub fn from_upstream_request<B>(req: &Request<B>) -> Self {
        Self::new(req.method().as_str(), req.uri().to_string())
    }
}

/// Result of evaluating a rule list.
///
/// The three non-matching cases all lead to the same external behavior but are
/// kept apart so callers can log and test them.
#[derive(Debug)]
pub enum MatchOutcome<'a> {
    Matched(&'a CompiledRule),
    NoMatch,
    /// Evaluation stopped at a rule whose pattern does not compile
    InvalidPattern {
        index: usize,
        error: &'a regex::Error,
    },
}

impl<'a> MatchOutcome<'a> {
    pub fn rule(&self) -> Option<&'a CompiledRule> {
        match self {
            MatchOutcome::Matched(rule) => Some(rule),
            _ => None,
        }
    }
}

/// Evaluate `rules` in declared order and return the first one whose method
/// and uri predicates both hold.
///
/// Rules without a pattern are skipped. A rule with a malformed pattern aborts
/// the whole evaluation for this request.
pub fn evaluate<'a>(descriptor: &RequestDescriptor, rules: &'a [CompiledRule]) -> MatchOutcome<'a> {
    for rule in rules {
        if !rule.allows_method(&descriptor.method) {
            continue;
        }

        match &rule.uri {
            UriPattern::Empty => continue,
            UriPattern::Invalid { pattern, error } => {
                warn!(
                    "Aborting rule evaluation for {} {}: rule #{} pattern '{}' is invalid: {}",
                    descriptor.method, descriptor.uri, rule.index, pattern, error
                );
                return MatchOutcome::InvalidPattern {
                    index: rule.index,
                    error,
                };
            }
            UriPattern::Compiled(regex) => {
                if regex.is_match(&descriptor.uri) {
                    return MatchOutcome::Matched(rule);
                }
            }
        }
    }

    MatchOutcome::NoMatch
}
