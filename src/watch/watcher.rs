//! File watch actor: notify → debouncer → changed paths.
//!
//! ```text
//! notify callback → std mpsc → bridge thread → tokio mpsc → Debouncer → listener
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::debouncer::Debouncer;

/// Watches a directory tree and emits debounced changed paths.
pub struct FsWatcher {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
    /// Changed paths go here
    changed_tx: mpsc::Sender<PathBuf>,
    debouncer: Debouncer,
}

impl FsWatcher {
    /// Start watching `root` recursively. Events buffer until [`run`](Self::run).
    pub fn new(root: &Path, changed_tx: mpsc::Sender<PathBuf>, poll: Duration) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok(Self {
            notify_rx,
            _watcher: watcher,
            changed_tx,
            debouncer: Debouncer::new(poll),
        })
    }

    /// Run until the receiving side goes away.
    pub async fn run(self) {
        let Self {
            notify_rx,
            _watcher,
            changed_tx,
            mut debouncer,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // notify delivers on its own thread; forward into the runtime
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) => debouncer.add_event(&event),
                    None => break,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    let Some(changes) = debouncer.take_if_ready() else { continue };
                    for (path, kind) in changes {
                        crate::debug!("watch"; "{}: {}", kind.label(), path.display());
                        if changed_tx.send(path).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }
}
