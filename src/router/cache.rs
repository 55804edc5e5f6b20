//! Route cache: request path → shared [`Route`].
//!
//! Lookups take a read lock; `store` and `evict` take the write lock, so an
//! eviction is visible to every lookup that starts after it returns.
//! Not-found routes are never stored.
//!
//! Every eviction bumps a generation counter. A route resolved before an
//! eviction and stored after it is dropped instead of cached, since the file
//! it points at may already be gone.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::route::Route;
use crate::module::{ModuleLoader, reference_for};

/// Process-wide route cache.
pub struct RouteCache {
    routes: RwLock<FxHashMap<String, Arc<Route>>>,
    /// Bumped under the write lock by every `evict`.
    generation: AtomicU64,
    loader: Arc<dyn ModuleLoader>,
    root: PathBuf,
    module_ext: String,
}

impl RouteCache {
    pub fn new(loader: Arc<dyn ModuleLoader>, root: &Path, module_ext: &str) -> Self {
        Self {
            routes: RwLock::new(FxHashMap::default()),
            generation: AtomicU64::new(0),
            loader,
            root: root.to_path_buf(),
            module_ext: module_ext.to_string(),
        }
    }

    pub fn loader(&self) -> &Arc<dyn ModuleLoader> {
        &self.loader
    }

    pub fn lookup(&self, path: &str) -> Option<Arc<Route>> {
        self.routes.read().get(path).cloned()
    }

    /// Current eviction generation. Read it before resolving a route that
    /// will be passed to [`store`](Self::store).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Store a route resolved at `generation`.
    ///
    /// Not-found routes, and routes resolved before an eviction that has
    /// since happened, are returned without being cached. Otherwise returns
    /// the cached route: if another request stored the same path first, that
    /// route is kept and returned instead.
    pub fn store(&self, path: &str, route: Arc<Route>, generation: u64) -> Arc<Route> {
        if route.is_not_found() {
            return route;
        }
        let mut routes = self.routes.write();
        if self.generation.load(Ordering::Acquire) != generation {
            crate::debug!("cache"; "skip stale route for {}", path);
            return route;
        }
        routes.entry(path.to_string()).or_insert(route).clone()
    }

    /// Unload the module for `source`, then evict every route backed by it.
    ///
    /// The module goes first: a request racing the eviction either still
    /// sees the old route or re-resolves after the unload, never a fresh
    /// route bound to the old module. Returns the number of evicted entries.
    /// Idempotent.
    pub fn evict(&self, source: &Path) -> usize {
        self.loader.unload(&reference_for(&self.root, source, &self.module_ext));

        let mut routes = self.routes.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        let before = routes.len();
        routes.retain(|key, route| {
            let hit = route.source() == Some(source);
            if hit {
                crate::debug!("cache"; "evict {}", key);
            }
            !hit
        });
        before - routes.len()
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached request paths, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.routes.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::testing::CountingLoader;
    use crate::router::RouteKind;

    fn cache() -> (Arc<CountingLoader>, RouteCache) {
        let loader = Arc::new(CountingLoader::default());
        let cache = RouteCache::new(loader.clone(), Path::new("/site"), "cgi");
        (loader, cache)
    }

    fn module(path: &str) -> Arc<Route> {
        Arc::new(Route::new(RouteKind::Module, PathBuf::from(path)))
    }

    #[test]
    fn test_store_and_lookup() {
        let (_, cache) = cache();
        assert!(cache.lookup("/a").is_none());

        let route = cache.store("/a", module("/site/a.cgi"), cache.generation());
        assert!(Arc::ptr_eq(&route, &cache.lookup("/a").unwrap()));
    }

    #[test]
    fn test_not_found_is_never_stored() {
        let (_, cache) = cache();
        cache.store("/missing", Arc::new(Route::not_found()), cache.generation());
        assert!(cache.lookup("/missing").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_first_store_wins() {
        let (_, cache) = cache();
        let first = cache.store("/a", module("/site/a.cgi"), cache.generation());
        let second = cache.store("/a", module("/site/a.cgi"), cache.generation());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_evict_removes_every_alias_and_unloads() {
        let (loader, cache) = cache();
        let generation = cache.generation();
        cache.store("/blog/a", module("/site/blog+.cgi"), generation);
        cache.store("/blog/b/c", module("/site/blog+.cgi"), generation);
        cache.store("/other", module("/site/other.cgi"), generation);

        assert_eq!(cache.evict(Path::new("/site/blog+.cgi")), 2);
        assert_eq!(cache.keys(), ["/other"]);
        assert_eq!(*loader.unloads.lock(), ["blog+"]);

        assert_eq!(cache.evict(Path::new("/site/blog+.cgi")), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_store_after_eviction_is_dropped() {
        let (_, cache) = cache();
        let generation = cache.generation();
        let resolved = module("/site/gone.md");

        // the file is deleted and its change evicted while the route was in flight
        assert_eq!(cache.evict(Path::new("/site/gone.md")), 0);

        let returned = cache.store("/gone", resolved.clone(), generation);
        assert!(Arc::ptr_eq(&returned, &resolved));
        assert!(cache.lookup("/gone").is_none());

        cache.store("/gone", module("/site/gone.md"), cache.generation());
        assert!(cache.lookup("/gone").is_some());
    }
}
