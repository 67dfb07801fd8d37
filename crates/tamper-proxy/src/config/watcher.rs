//! Configuration file watcher for hot reload.

use super::ConfigStore;
use crate::metrics;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Bursts of events from a single save are folded into one reload.
const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Watches the store's source file and reloads the store when it changes.
///
/// The parent directory is watched rather than the file itself so that editors
/// which save by renaming a temporary file over the original are picked up.
/// Dropping the watcher stops both the notify backend and the reload task.
pub struct ConfigWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching. Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<ConfigStore>) -> Result<Self, notify::Error> {
        let path = store
            .source()
            .map(Path::to_path_buf)
            .ok_or_else(|| notify::Error::generic("config store has no file to watch"))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| notify::Error::generic("config path has no file name"))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if touches_file(&event, &file_name) {
                    let _ = tx.send(());
                }
            }
            Err(e) => error!("Config watch error: {}", e),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let task = tokio::spawn(reload_loop(store, rx));
        info!(path = ?path, "Config watcher started");

        Ok(Self {
            path,
            _watcher: watcher,
            task,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn touches_file(event: &Event, file_name: &OsString) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

async fn reload_loop(store: Arc<ConfigStore>, mut rx: mpsc::UnboundedReceiver<()>) {
    while rx.recv().await.is_some() {
        tokio::time::sleep(SETTLE_DELAY).await;
        while rx.try_recv().is_ok() {}

        debug!("Config file change detected, reloading");
        match store.reload() {
            Ok(()) => {
                metrics::record_config_reload(true);
                info!(generation = store.generation(), "Config reloaded");
            }
            Err(e) => {
                metrics::record_config_reload(false);
                warn!("Failed to reload config: {}. Keeping current configuration.", e);
            }
        }
    }
}
