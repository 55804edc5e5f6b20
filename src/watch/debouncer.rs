//! Event debouncing: dedup by path, flush after a quiet window.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::utils::path::normalize_path;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Pure debouncer: only handles timing and event deduplication.
pub struct Debouncer {
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            window,
        }
    }

    /// Add a notify event. Metadata-only modifications, access events and
    /// editor temp files are ignored.
    pub fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return,
        };

        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        for path in &event.paths {
            if !is_temp_file(path) {
                self.add(normalize_path(path), kind);
            }
        }
    }

    /// Record a change. A later removal or restore replaces the earlier
    /// kind; a modification never downgrades a creation.
    pub fn add(&mut self, path: PathBuf, kind: ChangeKind) {
        self.changes
            .entry(path)
            .and_modify(|existing| {
                if !(*existing == ChangeKind::Created && kind == ChangeKind::Modified) {
                    *existing = kind;
                }
            })
            .or_insert(kind);
        self.last_event = Some(Instant::now());
    }

    /// Take pending changes once the window has passed without new events.
    pub fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        Some(std::mem::take(&mut self.changes))
    }

    pub fn is_ready(&self) -> bool {
        self.last_event
            .is_some_and(|t| t.elapsed() >= self.window && !self.changes.is_empty())
    }

    pub fn pending(&self) -> usize {
        self.changes.len()
    }

    /// Precise sleep duration until next possible ready time.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };
        self.window
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, EventKind, MetadataKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> notify::Event {
        notify::Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_dedup_and_flush() {
        let mut d = Debouncer::new(Duration::ZERO);
        assert!(d.take_if_ready().is_none());

        d.add_event(&event(EventKind::Create(CreateKind::File), "/site/a.md"));
        d.add_event(&event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), "/site/a.md"));
        d.add_event(&event(EventKind::Modify(ModifyKind::Any), "/site/b.md"));
        assert_eq!(d.pending(), 2);

        let changes = d.take_if_ready().unwrap();
        assert_eq!(changes[Path::new("/site/a.md")], ChangeKind::Created);
        assert_eq!(changes[Path::new("/site/b.md")], ChangeKind::Modified);
        assert_eq!(d.pending(), 0);
        assert!(d.take_if_ready().is_none());
    }

    #[test]
    fn test_ignored_events() {
        let mut d = Debouncer::new(Duration::ZERO);
        d.add_event(&event(EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)), "/site/a.md"));
        d.add_event(&event(EventKind::Create(CreateKind::File), "/site/.a.md.swp"));
        d.add_event(&event(EventKind::Create(CreateKind::File), "/site/a.md~"));
        d.add_event(&event(EventKind::Access(notify::event::AccessKind::Any), "/site/a.md"));
        assert_eq!(d.pending(), 0);
    }

    #[test]
    fn test_waits_for_quiet_window() {
        let mut d = Debouncer::new(Duration::from_secs(60));
        d.add(PathBuf::from("/site/a.md"), ChangeKind::Modified);
        assert!(!d.is_ready());
        assert!(d.take_if_ready().is_none());
        assert!(d.sleep_duration() <= Duration::from_secs(60));
    }

    #[test]
    fn test_removal_replaces_modification() {
        let mut d = Debouncer::new(Duration::ZERO);
        d.add(PathBuf::from("/a"), ChangeKind::Modified);
        d.add(PathBuf::from("/a"), ChangeKind::Removed);
        assert_eq!(d.take_if_ready().unwrap()[Path::new("/a")], ChangeKind::Removed);
    }
}
