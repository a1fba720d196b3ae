//! Hot-reload: a `notify` watcher on the rules directory that rebuilds and
//! republishes the rule set after YAML changes settle.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use super::core::{is_rule_file, RuleLoader, RuleSource};
use super::error::Result;
use crate::store::RuleStore;

/// Watches a rules directory and reloads the store on change.
///
/// Events are debounced: a reload runs once no further rule-file event has
/// arrived for the debounce interval. A failed reload keeps the previous
/// snapshot. Dropping the watcher stops the reload thread.
pub struct RuleWatcher {
    dir: PathBuf,
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
}

impl RuleWatcher {
    /// Start watching `dir` recursively.
    pub fn spawn(
        store: Arc<RuleStore>,
        loader: RuleLoader,
        dir: impl Into<PathBuf>,
        debounce: Duration,
    ) -> Result<Self> {
        let dir = dir.into();
        let (tx, rx) = mpsc::channel::<PathBuf>();

        let mut watcher = notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if !is_relevant(&event.kind) {
                        return;
                    }
                    for path in event.paths.into_iter().filter(|p| is_rule_file(p)) {
                        // Receiver gone means the watcher is shutting down.
                        let _ = tx.send(path);
                    }
                }
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            }
        })?;
        watcher.watch(&dir, RecursiveMode::Recursive)?;

        let source = RuleSource::Dir(dir.clone());
        let worker = thread::Builder::new()
            .name("glyco-rule-watcher".to_string())
            .spawn(move || {
                while let Ok(first) = rx.recv() {
                    debug!(path = %first.display(), "rule file changed");
                    // Drain until the directory has been quiet for `debounce`.
                    loop {
                        match rx.recv_timeout(debounce) {
                            Ok(path) => debug!(path = %path.display(), "rule file changed"),
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }
                    if let Ok(snapshot) = store.reload_with(&loader, &source) {
                        info!(rules = snapshot.len(), fingerprint = %snapshot.fingerprint(), "hot-reloaded rule set");
                    }
                }
            })?;

        info!(path = %dir.display(), debounce_ms = debounce.as_millis() as u64, "watching rules directory for changes (recursive)");
        Ok(Self {
            dir,
            watcher: Some(watcher),
            worker: Some(worker),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stop watching and wait for any in-progress reload to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.watcher.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(path = %self.dir.display(), "rule watcher thread panicked");
            }
        }
    }
}

impl Drop for RuleWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}
