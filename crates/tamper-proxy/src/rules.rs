//! Compiled rule sets.
//!
//! A [`RuleSet`] is built once from an [`InterceptGroup`] and never mutated.
//! Wildcards are expanded and patterns compiled here so that matching only
//! evaluates; a pattern that fails to compile is kept alongside its rule and
//! reported when evaluation reaches it.

use crate::config::{Intercept, InterceptGroup, Patch};
use regex::Regex;
use tracing::warn;

#[derive(Debug)]
pub enum UriPattern {
    /// No pattern configured: the rule can never match
    Empty,
    Compiled(Regex),
    Invalid { pattern: String, error: regex::Error },
}

impl UriPattern {
    pub fn compile(raw: &str) -> Self {
        if raw.is_empty() {
            return UriPattern::Empty;
        }
        let pattern = expand_wildcards(raw);
        match Regex::new(&pattern) {
            Ok(regex) => UriPattern::Compiled(regex),
            Err(error) => UriPattern::Invalid { pattern, error },
        }
    }
}

/// Rewrite each `*` into `.*`. This is the only glob translation performed.
pub fn expand_wildcards(pattern: &str) -> String {
    pattern.replace('*', ".*")
}

#[derive(Debug)]
pub struct CompiledRule {
    /// Position in the declared list, used in logs and response headers
    pub index: usize,
    /// Upper-cased allowed methods; empty means any
    pub methods: Vec<String>,
    pub uri: UriPattern,
    pub patch: Patch,
}

impl CompiledRule {
    pub fn compile(index: usize, intercept: &Intercept) -> Self {
        let uri = UriPattern::compile(&intercept.match_config.uri);
        if let UriPattern::Invalid { pattern, error } = &uri {
            warn!("Rule #{} has an invalid uri pattern '{}': {}", index, pattern, error);
        }

        CompiledRule {
            index,
            methods: intercept
                .match_config
                .methods
                .iter()
                .map(|m| m.trim().to_uppercase())
                .collect(),
            uri,
            patch: intercept.patch.clone(),
        }
    }

    pub fn allows_method(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m == method)
    }
}

fn compile_list(intercepts: &[Intercept]) -> Vec<CompiledRule> {
    intercepts
        .iter()
        .enumerate()
        .map(|(index, intercept)| CompiledRule::compile(index, intercept))
        .collect()
}

/// Ordered request and response rules currently in effect.
#[derive(Debug, Default)]
pub struct RuleSet {
    pub request_rules: Vec<CompiledRule>,
    pub response_rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(group: &InterceptGroup) -> Self {
        RuleSet {
            request_rules: compile_list(&group.requests),
            response_rules: compile_list(&group.responses),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.request_rules.is_empty() && self.response_rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;

    fn intercept(uri: &str, methods: &[&str]) -> Intercept {
        Intercept {
            match_config: MatchConfig {
                uri: uri.to_string(),
                methods: methods.iter().map(|m| m.to_string()).collect(),
                params: vec![],
            },
            patch: Patch::default(),
        }
    }

    #[test]
    fn test_expand_wildcards() {
        assert_eq!(expand_wildcards("/api/*"), "/api/.*");
        assert_eq!(expand_wildcards("*/users/*"), ".*/users/.*");
        assert_eq!(expand_wildcards("/plain"), "/plain");
    }

    #[test]
    fn test_empty_pattern() {
        assert!(matches!(UriPattern::compile(""), UriPattern::Empty));
    }

    #[test]
    fn test_invalid_pattern_kept() {
        match UriPattern::compile("/api/(unclosed") {
            UriPattern::Invalid { pattern, .. } => assert_eq!(pattern, "/api/(unclosed"),
            other => panic!("expected invalid pattern, got {other:?}"),
        }
    }

    #[test]
    fn test_methods_normalized() {
        let rule = CompiledRule::compile(0, &intercept("/x", &["get", " Post "]));
        assert_eq!(rule.methods, vec!["GET", "POST"]);
        assert!(rule.allows_method("GET"));
        assert!(rule.allows_method("POST"));
        assert!(!rule.allows_method("DELETE"));
    }

    #[test]
    fn test_no_methods_allows_any() {
        let rule = CompiledRule::compile(0, &intercept("/x", &[]));
        assert!(rule.allows_method("PATCH"));
    }

    #[test]
    fn test_rule_set_preserves_order() {
        let group = InterceptGroup {
            requests: vec![intercept("/a", &[]), intercept("/b", &[]), intercept("", &[])],
            responses: vec![intercept("/c", &["GET"])],
        };
        let rules = RuleSet::compile(&group);
        assert_eq!(rules.request_rules.len(), 3);
        assert_eq!(rules.response_rules.len(), 1);
        let indexes: Vec<usize> = rules.request_rules.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert!(matches!(rules.request_rules[2].uri, UriPattern::Empty));
        assert!(!rules.is_empty());
        assert!(RuleSet::default().is_empty());
    }
}
