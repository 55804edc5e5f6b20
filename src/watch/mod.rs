//! File watching and cache invalidation.
//!
//! Runs on its own tokio runtime thread next to the request workers:
//!
//! ```text
//! FsWatcher ──changed paths──▶ InvalidationListener ──evict──▶ RouteCache
//! ```

mod debouncer;
mod listener;
mod watcher;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

pub use debouncer::{ChangeKind, Debouncer, is_temp_file};
pub use listener::{Invalidate, InvalidationListener};
pub use watcher::FsWatcher;

use crate::{debug, log};

const CHANNEL_BUFFER: usize = 64;

/// Watch settings.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub root: PathBuf,
    pub poll: Duration,
}

/// Start the watch system on a background thread.
///
/// The thread stops when a shutdown signal arrives on `shutdown_rx`. If the
/// watcher cannot start, or stops on its own, cached routes would never be
/// invalidated again, so the process exits.
pub fn spawn(
    options: WatchOptions,
    target: Arc<dyn Invalidate>,
    shutdown_rx: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = run(options, target, shutdown_rx) {
            log!("error"; "watch: {:#}", e);
            std::process::exit(1);
        }
    })
}

fn run(options: WatchOptions, target: Arc<dyn Invalidate>, shutdown_rx: Receiver<()>) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async move {
        let (changed_tx, changed_rx) = mpsc::channel(CHANNEL_BUFFER);
        let watcher = FsWatcher::new(&options.root, changed_tx, options.poll)
            .with_context(|| format!("cannot watch {}", options.root.display()))?;
        let listener = InvalidationListener::new(target, changed_rx);

        log!("watch"; "watching for changes in {}", options.root.display());
        let watcher_handle = tokio::spawn(watcher.run());
        let listener_handle = tokio::spawn(listener.run());

        supervise(watcher_handle, listener_handle, &shutdown_rx).await
    })
}

/// Wait for shutdown. Either task finishing first is an error.
async fn supervise(
    watcher: tokio::task::JoinHandle<()>,
    listener: tokio::task::JoinHandle<()>,
    shutdown_rx: &Receiver<()>,
) -> Result<()> {
    let result = loop {
        if shutdown_rx.try_recv().is_ok() {
            debug!("watch"; "shutdown signal received");
            break Ok(());
        }
        if watcher.is_finished() {
            break Err(anyhow!("file watcher stopped unexpectedly"));
        }
        if listener.is_finished() {
            break Err(anyhow!("invalidation listener stopped unexpectedly"));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    };

    watcher.abort();
    listener.abort();
    debug!("watch"; "stopped");
    result
}

/// Wait for the watch thread to stop (max 2 seconds).
pub fn wait_for_shutdown(handle: Option<JoinHandle<()>>) {
    let Some(handle) = handle else { return };

    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}
