//! Configuration types for the Tamper proxy.

mod auth;
mod intercept;
mod listen;
mod protocol;
mod store;
mod watcher;

use std::path::{Path, PathBuf};

use hyper::Uri;
use serde::{Deserialize, Serialize};

pub use auth::{Authentication, BasicAuth, BearerAuth};
pub use intercept::{BodyType, Intercept, InterceptGroup, MatchConfig, ParamMatch, Patch};
pub use listen::MetricsConfig;
pub use protocol::Protocol;
pub use store::{ConfigStore, Snapshot};
pub use watcher::ConfigWatcher;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Absolute URL of the proxied service (http or https)
    pub target_url: String,
    #[serde(default)]
    pub authentication: Authentication,
    #[serde(default)]
    pub intercept: InterceptGroup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target_uri().map(|_| ())
    }

    /// Parse `target_url` into an absolute URI without path.
    pub fn target_uri(&self) -> Result<Uri, ConfigError> {
        let uri: Uri = self.target_url.parse().map_err(|e| {
            ConfigError::Invalid(format!("target_url '{}': {e}", self.target_url))
        })?;

        let scheme = uri.scheme_str().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "target_url '{}' is missing a scheme (http:// or https://)",
                self.target_url
            ))
        })?;
        Protocol::from_scheme(scheme).map_err(ConfigError::Invalid)?;

        if uri.authority().is_none() {
            return Err(ConfigError::Invalid(format!(
                "target_url '{}' is missing a host",
                self.target_url
            )));
        }

        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
target_url: "https://api.example.com"
authentication:
  basic:
    username: admin
    password: secret
  bearer:
    type: Bearer
    token: abc
intercept:
  requests:
    - match:
        uri: "/health"
        methods: ["GET"]
      patch:
        status: 200
        body: "OK"
        type: string
  responses:
    - match:
        uri: "/users/*"
      patch:
        body: "./fixtures/users.json"
        type: file
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.target_url, "https://api.example.com");
        assert_eq!(config.authentication.basic.username, "admin");
        assert_eq!(config.authentication.bearer.token, "abc");
        assert_eq!(config.intercept.requests.len(), 1);
        assert_eq!(config.intercept.requests[0].match_config.uri, "/health");
        assert_eq!(config.intercept.responses.len(), 1);
        assert_eq!(
            config.intercept.responses[0].patch.body_type,
            BodyType::File
        );
        assert!(config.metrics.is_none());
    }

    #[test]
    fn test_minimal_config() {
        let config = Config::from_yaml("target_url: http://localhost:3000\n").unwrap();
        assert!(config.intercept.requests.is_empty());
        assert!(config.intercept.responses.is_empty());
        assert_eq!(config.authentication, Authentication::default());
    }

    #[test]
    fn test_metrics_section() {
        let yaml = "target_url: http://localhost:3000\nmetrics:\n  port: 9100\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.metrics.unwrap().port, 9100);
    }

    #[test]
    fn test_missing_target_url_is_parse_error() {
        let err = Config::from_yaml("intercept: {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_target_url_requires_scheme() {
        let err = Config::from_yaml("target_url: example.com\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_target_url_rejects_unsupported_scheme() {
        let err = Config::from_yaml("target_url: ftp://example.com\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tamper.yaml");
        std::fs::write(&path, "target_url: http://127.0.0.1:9000\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        let uri = config.target_uri().unwrap();
        assert_eq!(uri.host(), Some("127.0.0.1"));
        assert_eq!(uri.port_u16(), Some(9000));
    }
}
