//! Hot-swappable configuration snapshots.
//!
//! Request tasks call [`ConfigStore::snapshot`] once per request and work
//! against that immutable [`Snapshot`] only. A reload builds a complete new
//! snapshot off to the side and publishes it with a single atomic pointer swap,
//! so readers see either the old rule set or the new one, never a mix.

use super::{Config, ConfigError};
use crate::rules::RuleSet;
use arc_swap::ArcSwap;
use hyper::Uri;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// One loaded configuration: target, credentials, and compiled rules.
#[derive(Debug)]
pub struct Snapshot {
    pub config: Config,
    pub target: Uri,
    pub rules: RuleSet,
}

impl Snapshot {
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let target = config.target_uri()?;
        let rules = RuleSet::compile(&config.intercept);
        Ok(Self {
            config,
            target,
            rules,
        })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Self::from_config(Config::from_yaml(contents)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_config(Config::from_file(path)?)
    }
}

pub struct ConfigStore {
    source: Option<PathBuf>,
    current: ArcSwap<Snapshot>,
    /// Incremented on every publish
    generation: AtomicU64,
}

impl ConfigStore {
    /// Load the configuration file; any error here is fatal to startup.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let snapshot = Snapshot::load(path)?;
        info!(
            "Loaded config from {:?}: {} request rules, {} response rules",
            path,
            snapshot.rules.request_rules.len(),
            snapshot.rules.response_rules.len()
        );
        Ok(Self {
            source: Some(path.to_path_buf()),
            current: ArcSwap::from_pointee(snapshot),
            generation: AtomicU64::new(0),
        })
    }

    /// Store without a backing file; [`ConfigStore::reload`] always fails.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            source: None,
            current: ArcSwap::from_pointee(snapshot),
            generation: AtomicU64::new(0),
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Current snapshot. Hold on to it for the duration of one decision.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn publish(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Re-read the source file and publish it if it loads cleanly.
    ///
    /// On error the previously published snapshot stays in effect.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let path = self
            .source
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid("config store has no file source".to_string()))?;
        let snapshot = Snapshot::load(path)?;
        info!(
            "Reloaded config from {:?}: {} request rules, {} response rules",
            path,
            snapshot.rules.request_rules.len(),
            snapshot.rules.response_rules.len()
        );
        self.publish(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{evaluate, RequestDescriptor};

    const V1: &str = r#"
target_url: http://127.0.0.1:9000
intercept:
  requests:
    - match: { uri: "/health", methods: [GET] }
      patch: { status: 200, body: "v1", type: string }
"#;

    const V2: &str = r#"
target_url: http://127.0.0.1:9001
intercept:
  requests:
    - match: { uri: "/health", methods: [GET] }
      patch: { status: 200, body: "v2", type: string }
"#;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("tamper.yaml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(write_config(dir.path(), V1)).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.target.port_u16(), Some(9000));
        assert_eq!(snapshot.rules.request_rules.len(), 1);
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_load_invalid_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "target_url: [not, a, string]\n");
        assert!(ConfigStore::load(path).is_err());
    }

    #[test]
    fn test_reload_publishes_new_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), V1);
        let store = ConfigStore::load(&path).unwrap();

        std::fs::write(&path, V2).unwrap();
        store.reload().unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.target.port_u16(), Some(9001));
        assert_eq!(snapshot.rules.request_rules[0].patch.body, "v2");
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), V1);
        let store = ConfigStore::load(&path).unwrap();

        std::fs::write(&path, "intercept: [broken").unwrap();
        assert!(store.reload().is_err());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.rules.request_rules[0].patch.body, "v1");
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_reload_without_source_fails() {
        let store = ConfigStore::from_snapshot(Snapshot::from_yaml(V1).unwrap());
        assert!(store.source().is_none());
        assert!(matches!(store.reload(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_old_snapshot_lives_until_dropped() {
        let store = ConfigStore::from_snapshot(Snapshot::from_yaml(V1).unwrap());
        let old = store.snapshot();

        store.publish(Snapshot::from_yaml(V2).unwrap());

        assert_eq!(old.rules.request_rules[0].patch.body, "v1");
        assert_eq!(store.snapshot().rules.request_rules[0].patch.body, "v2");
    }

    #[test]
    fn test_concurrent_readers_see_whole_rule_sets() {
        // Every snapshot holds either one "/health" GET rule or none at all.
        let store = Arc::new(ConfigStore::from_snapshot(Snapshot::from_yaml(V1).unwrap()));
        let empty = "target_url: http://127.0.0.1:9000\n";

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let descriptor = RequestDescriptor::new("GET", "/health");
                    for _ in 0..2_000 {
                        let snapshot = store.snapshot();
                        let rules = &snapshot.rules.request_rules;
                        let matched = evaluate(&descriptor, rules).rule().is_some();
                        assert_eq!(matched, !rules.is_empty());
                        if let Some(rule) = rules.first() {
                            assert!(rule.allows_method("GET"));
                            assert!(rule.patch.body == "v1" || rule.patch.body == "v2");
                        }
                    }
                })
            })
            .collect();

        for i in 0..200 {
            let next = match i % 3 {
                0 => empty,
                1 => V2,
                _ => V1,
            };
            store.publish(Snapshot::from_yaml(next).unwrap());
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.generation(), 200);
    }
}
