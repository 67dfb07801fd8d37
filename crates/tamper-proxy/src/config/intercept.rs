//! Intercept rule configuration.

use serde::{Deserialize, Serialize};

/// Request and response rule lists, in the order they were declared.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct InterceptGroup {
    #[serde(default)]
    pub requests: Vec<Intercept>,
    #[serde(default)]
    pub responses: Vec<Intercept>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Intercept {
    #[serde(rename = "match", default)]
    pub match_config: MatchConfig,
    #[serde(default)]
    pub patch: Patch,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MatchConfig {
    /// Regex searched anywhere in the request URI. `*` is a shorthand for `.*`.
    #[serde(default)]
    pub uri: String,
    /// Allowed methods; empty means any method
    #[serde(default)]
    pub methods: Vec<String>,
    /// Reserved: parsed but not enforced yet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamMatch>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ParamMatch {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Patch {
    /// 0 means "not set" and resolves to 200
    #[serde(default)]
    pub status: u16,
    /// Literal payload, or a file path when `type` is `file`
    #[serde(default)]
    pub body: String,
    #[serde(default, rename = "type")]
    pub body_type: BodyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    File,
    #[default]
    String,
    Json,
}
