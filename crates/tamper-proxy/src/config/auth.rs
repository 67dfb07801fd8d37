//! Upstream authentication configuration.
//!
//! Credentials are injected by the forwarder into requests that reach the
//! target without an `Authorization` header of their own. The main use case is
//! testing flows where the real credential lives in a cookie the proxy never sees.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Authentication {
    #[serde(default)]
    pub basic: BasicAuth,
    #[serde(default)]
    pub bearer: BearerAuth,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct BasicAuth {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct BearerAuth {
    /// Scheme written before the token, e.g. "Bearer" or "Token"
    #[serde(default, rename = "type")]
    pub token_type: String,
    #[serde(default)]
    pub token: String,
}

impl Authentication {
    /// Value for the `Authorization` header, if any credential is configured.
    ///
    /// A bearer token takes precedence over basic credentials.
    pub fn authorization_value(&self) -> Option<String> {
        if !self.bearer.token.is_empty() {
            let scheme = if self.bearer.token_type.is_empty() {
                "Bearer"
            } else {
                self.bearer.token_type.as_str()
            };
            return Some(format!("{scheme} {}", self.bearer.token));
        }

        if !self.basic.username.is_empty() {
            let encoded = STANDARD.encode(format!(
                "{}:{}",
                self.basic.username, self.basic.password
            ));
            return Some(format!("Basic {encoded}"));
        }

        None
    }
}
