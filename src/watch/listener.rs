//! Invalidation listener: evicts cached routes for each changed file.
//!
//! Each path is handled on its own; evicting an absent entry is a no-op. A
//! panic while handling one path leaves the cache in an unknown state, so the
//! process exits instead of serving stale content.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dispatch::Dispatcher;
use crate::router::{RouteCache, Router};

/// Something that can drop state derived from a file.
pub trait Invalidate: Send + Sync {
    /// Returns the number of evicted entries.
    fn invalidate(&self, path: &Path) -> usize;
}

impl Invalidate for RouteCache {
    fn invalidate(&self, path: &Path) -> usize {
        self.evict(path)
    }
}

impl Invalidate for Router {
    fn invalidate(&self, path: &Path) -> usize {
        self.cache().evict(path)
    }
}

impl Invalidate for Dispatcher {
    fn invalidate(&self, path: &Path) -> usize {
        self.router().invalidate(path)
    }
}

/// Consumes changed paths and evicts them.
pub struct InvalidationListener {
    target: Arc<dyn Invalidate>,
    changed_rx: mpsc::Receiver<PathBuf>,
}

impl InvalidationListener {
    pub fn new(target: Arc<dyn Invalidate>, changed_rx: mpsc::Receiver<PathBuf>) -> Self {
        Self { target, changed_rx }
    }

    /// Run until the sending side closes.
    pub async fn run(mut self) {
        while let Some(path) = self.changed_rx.recv().await {
            if let Err(message) = self.handle(&path) {
                crate::log!("error"; "invalidation failed for {}: {}", path.display(), message);
                std::process::exit(1);
            }
        }
    }

    /// Handle one changed path. `Err` carries the panic message.
    pub fn handle(&self, path: &Path) -> Result<usize, String> {
        crate::log!("watch"; "detected changed file: {}", path.display());
        catch_unwind(AssertUnwindSafe(|| self.target.invalidate(path)))
            .map(|evicted| {
                crate::debug!("cache"; "{} route(s) evicted for {}", evicted, path.display());
                evicted
            })
            .map_err(|panic| {
                panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panic".to_string())
            })
    }
}
