//! Request routing: resolve a path to content, with caching.

mod cache;
mod resolve;
mod route;

use std::sync::Arc;

pub use cache::RouteCache;
pub use resolve::{CATCH_ALL, Resolver, is_forbidden};
pub use route::{ModuleState, Route, RouteKind};

use crate::module::ModuleLoader;

/// Resolver plus cache: the lookup path every request takes.
pub struct Router {
    resolver: Resolver,
    cache: RouteCache,
}

impl Router {
    pub fn new(resolver: Resolver, loader: Arc<dyn ModuleLoader>) -> Self {
        let cache = RouteCache::new(loader, resolver.root(), resolver.module_ext());
        Self { resolver, cache }
    }

    /// Cached route for `path`, resolving and storing on a miss.
    pub fn find(&self, path: &str) -> Arc<Route> {
        if let Some(route) = self.cache.lookup(path) {
            return route;
        }
        let generation = self.cache.generation();
        let route = Arc::new(self.resolver.resolve(path));
        self.cache.store(path, route, generation)
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    pub fn loader(&self) -> &Arc<dyn ModuleLoader> {
        self.cache.loader()
    }
}
