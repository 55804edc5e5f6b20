//! Resolution descriptor: how a request path maps to content.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::module::Loaded;
use crate::utils::mime;

/// Content kind a path resolved to. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    NotFound,
    Static,
    Markdown,
    Module,
}

impl RouteKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::Static => "static",
            Self::Markdown => "markdown",
            Self::Module => "module",
        }
    }
}

/// Load state of a module route.
///
/// `Failed` is sticky: it is never retried until the route is evicted.
#[derive(Debug, Clone, Default)]
pub enum ModuleState {
    #[default]
    NotLoaded,
    Loaded(Loaded),
    Failed(String),
}

/// Resolution descriptor, shared between the cache and in-flight requests.
///
/// The MIME type and the loaded module are memoized in place on first use.
#[derive(Debug)]
pub struct Route {
    kind: RouteKind,
    source: Option<PathBuf>,
    mime: OnceLock<&'static str>,
    module: Mutex<ModuleState>,
}

impl Route {
    pub fn not_found() -> Self {
        Self::build(RouteKind::NotFound, None)
    }

    pub fn new(kind: RouteKind, source: PathBuf) -> Self {
        Self::build(kind, Some(source))
    }

    fn build(kind: RouteKind, source: Option<PathBuf>) -> Self {
        Self {
            kind,
            source,
            mime: OnceLock::new(),
            module: Mutex::new(ModuleState::NotLoaded),
        }
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    /// Backing file; `None` only for `NotFound`.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RouteKind::NotFound
    }

    /// MIME type of the backing file, computed once.
    pub fn mime(&self) -> &'static str {
        *self.mime.get_or_init(|| match &self.source {
            Some(path) => mime::from_path(path),
            None => mime::types::OCTET_STREAM,
        })
    }

    /// Module load state. Held across a load so concurrent requests for the
    /// same route load at most once.
    pub fn module(&self) -> parking_lot::MutexGuard<'_, ModuleState> {
        self.module.lock()
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.source == other.source
    }
}
