//! Hot reload of the configuration file via `notify`.

use crate::cache::ConfigCache;
use crate::loader::{ConfigError, ConfigLoader};
use notify::{Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Watches a configuration file and swaps new versions into a [`ConfigCache`].
///
/// Dropping the watcher stops both the OS watch and the reload task.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching `path`. Must be called inside a tokio runtime.
    pub fn start(path: &Path, cache: Arc<ConfigCache>) -> Result<Self, ConfigError> {
        let path = path.to_path_buf();
        let (tx, rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!("Configuration watcher error: {}", e),
            },
            NotifyConfig::default(),
        )?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        info!(path = %path.display(), "Watching configuration for changes");

        let task = tokio::spawn(reload_loop(path, cache, rx));
        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn reload_loop(path: PathBuf, cache: Arc<ConfigCache>, mut rx: mpsc::UnboundedReceiver<()>) {
    while rx.recv().await.is_some() {
        // Editors often emit several events per save.
        while rx.try_recv().is_ok() {}
        reload_once(&path, &cache);
    }
    debug!("Configuration reload loop finished");
}

/// Re-read `path` into `cache`, keeping the old configuration when the new one is invalid.
pub fn reload_once(path: &Path, cache: &ConfigCache) -> bool {
    match ConfigLoader::load_config(path).and_then(|config| cache.update(config)) {
        Ok(()) => {
            info!(path = %path.display(), "Configuration reloaded");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), "Ignoring configuration change: {}", e);
            false
        }
    }
}
