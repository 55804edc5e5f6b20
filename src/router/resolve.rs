//! Path resolution: request path → [`Route`].
//!
//! Lookup order for a path under the mount prefix, first match wins:
//!
//! 1. forbidden segments (`_hidden`, `..`) → not found
//! 2. existing file → classified by extension
//! 3. existing directory → `<dir>/index` with the step 4 rules
//! 4. `<path>.html`, `<path>.md`, `<path>.<ext>`, then `<path>+.<ext>`
//! 5. nearest ancestor catch-all `<ancestor>+.<ext>`, below the mount root
//!
//! Resolution never caches; see [`RouteCache`](super::RouteCache).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::route::{Route, RouteKind};
use crate::utils::path::normalize_path;

const MARKDOWN_EXT: &str = "md";
const HTML_EXT: &str = "html";
const INDEX: &str = "index";

/// Catch-all marker appended to a module's base name.
pub const CATCH_ALL: &str = "+";

/// Maps request paths to content under a site root.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    mount: String,
    module_ext: String,
}

impl Resolver {
    /// `mount` is the URL prefix the site is served under; `/` means the
    /// whole path space.
    pub fn new(root: &Path, mount: &str, module_ext: &str) -> Self {
        let mount = mount.trim_end_matches('/').to_string();
        Self {
            root: normalize_path(root),
            mount,
            module_ext: module_ext.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn module_ext(&self) -> &str {
        &self.module_ext
    }

    /// Resolve a decoded request path (no query string).
    ///
    /// Only absolute paths resolve; an empty path (what an undecodable
    /// request path becomes) is not found.
    pub fn resolve(&self, path: &str) -> Route {
        if !path.starts_with('/') || is_forbidden(path) {
            return Route::not_found();
        }
        let Some(rel) = self.strip_mount(path) else {
            return Route::not_found();
        };

        let segments: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();
        let fs_path = segments.iter().fold(self.root.clone(), |acc, s| acc.join(s));

        if fs_path.is_file() {
            return self.file_route(fs_path);
        }
        if fs_path.is_dir() {
            return self
                .find_with_extension(&fs_path.join(INDEX))
                .unwrap_or_else(Route::not_found);
        }
        if let Some(route) = self.find_with_extension(&fs_path) {
            return route;
        }

        self.find_up_tree(&segments).unwrap_or_else(Route::not_found)
    }

    /// Classify an existing file by extension.
    pub fn classify(&self, path: &Path) -> RouteKind {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext == self.module_ext => RouteKind::Module,
            Some(MARKDOWN_EXT) => RouteKind::Markdown,
            _ => RouteKind::Static,
        }
    }

    fn file_route(&self, path: PathBuf) -> Route {
        Route::new(self.classify(&path), path)
    }

    /// Relative part of `path` below the mount, or `None` outside it.
    fn strip_mount<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.mount.as_str())?;
        if rest.is_empty() {
            return Some(rest);
        }
        rest.strip_prefix('/')
    }

    fn find_with_extension(&self, base: &Path) -> Option<Route> {
        [
            format!(".{HTML_EXT}"),
            format!(".{MARKDOWN_EXT}"),
            format!(".{}", self.module_ext),
            format!("{CATCH_ALL}.{}", self.module_ext),
        ]
        .iter()
        .map(|suffix| with_suffix(base, suffix))
        .find(|candidate| candidate.is_file())
        .map(|found| self.file_route(found))
    }

    /// Nearest ancestor catch-all, excluding the mount root itself.
    fn find_up_tree(&self, segments: &[&str]) -> Option<Route> {
        let suffix = format!("{CATCH_ALL}.{}", self.module_ext);
        (1..segments.len()).rev().find_map(|depth| {
            let ancestor = segments[..depth].iter().fold(self.root.clone(), |acc, s| acc.join(s));
            let candidate = with_suffix(&ancestor, &suffix);
            candidate
                .is_file()
                .then(|| Route::new(RouteKind::Module, candidate))
        })
    }
}

/// Hidden (`_name`) or parent (`..`) segments are never routable.
pub fn is_forbidden(path: &str) -> bool {
    path.split(['/', '\\'])
        .any(|seg| seg.starts_with('_') || seg.starts_with("..") || seg.contains('\0'))
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(base.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, name).unwrap();
        }
        dir
    }

    fn resolve(dir: &TempDir, path: &str) -> (RouteKind, Option<String>) {
        let resolver = Resolver::new(dir.path(), "/", "cgi");
        let route = resolver.resolve(path);
        let rel = route.source().map(|p| {
            p.strip_prefix(resolver.root())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        });
        (route.kind(), rel)
    }

    fn found(kind: RouteKind, rel: &str) -> (RouteKind, Option<String>) {
        (kind, Some(rel.to_string()))
    }

    const NOT_FOUND: (RouteKind, Option<String>) = (RouteKind::NotFound, None);

    #[test]
    fn test_exact_file_is_classified() {
        let dir = site(&["style.css", "post.md", "api.cgi"]);
        assert_eq!(resolve(&dir, "/style.css"), found(RouteKind::Static, "style.css"));
        assert_eq!(resolve(&dir, "/post.md"), found(RouteKind::Markdown, "post.md"));
        assert_eq!(resolve(&dir, "/api.cgi"), found(RouteKind::Module, "api.cgi"));
    }

    #[test]
    fn test_extension_precedence() {
        let dir = site(&["foo.html", "foo.md", "foo.cgi", "bar.md", "bar.cgi", "baz.cgi", "baz+.cgi"]);
        assert_eq!(resolve(&dir, "/foo"), found(RouteKind::Static, "foo.html"));
        assert_eq!(resolve(&dir, "/bar"), found(RouteKind::Markdown, "bar.md"));
        assert_eq!(resolve(&dir, "/baz"), found(RouteKind::Module, "baz.cgi"));
    }

    #[test]
    fn test_same_level_catch_all() {
        let dir = site(&["api+.cgi"]);
        assert_eq!(resolve(&dir, "/api"), found(RouteKind::Module, "api+.cgi"));
    }

    #[test]
    fn test_directory_index() {
        let dir = site(&["index.md", "docs/index.html", "docs/index.md", "app/index.cgi", "app/x.txt"]);
        assert_eq!(resolve(&dir, "/"), found(RouteKind::Markdown, "index.md"));
        assert_eq!(resolve(&dir, "/docs"), found(RouteKind::Static, "docs/index.html"));
        assert_eq!(resolve(&dir, "/docs/"), found(RouteKind::Static, "docs/index.html"));
        assert_eq!(resolve(&dir, "/app"), found(RouteKind::Module, "app/index.cgi"));
    }

    #[test]
    fn test_directory_without_index_is_not_found() {
        let dir = site(&["empty/readme.txt", "empty+.cgi"]);
        assert_eq!(resolve(&dir, "/empty"), NOT_FOUND);
    }

    #[test]
    fn test_up_tree_fallback() {
        let dir = site(&["blog+.cgi", "blog/2024/hello.md"]);
        assert_eq!(resolve(&dir, "/blog/2024/post-1"), found(RouteKind::Module, "blog+.cgi"));
        assert_eq!(resolve(&dir, "/blog/x/y/z"), found(RouteKind::Module, "blog+.cgi"));
        assert_eq!(resolve(&dir, "/blog/2024/hello"), found(RouteKind::Markdown, "blog/2024/hello.md"));
    }

    #[test]
    fn test_nearest_catch_all_wins() {
        let dir = site(&["blog+.cgi", "blog/x+.cgi"]);
        assert_eq!(resolve(&dir, "/blog/x/y/z"), found(RouteKind::Module, "blog/x+.cgi"));
        assert_eq!(resolve(&dir, "/blog/w/y"), found(RouteKind::Module, "blog+.cgi"));
    }

    #[test]
    fn test_no_catch_all_is_not_found() {
        let dir = site(&["other+.cgi", "+.cgi"]);
        assert_eq!(resolve(&dir, "/blog/x/y/z"), NOT_FOUND);
        assert_eq!(resolve(&dir, "/missing"), NOT_FOUND);
    }

    #[test]
    fn test_private_segments() {
        let dir = site(&["_secret/file.txt", "_layout/post.cgi", "a/_b.md"]);
        assert_eq!(resolve(&dir, "/_secret/file.txt"), NOT_FOUND);
        assert_eq!(resolve(&dir, "/_secret/file"), NOT_FOUND);
        assert_eq!(resolve(&dir, "/_layout/post"), NOT_FOUND);
        assert_eq!(resolve(&dir, "/a/_b"), NOT_FOUND);
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = site(&["inner/x.txt"]);
        let resolver = Resolver::new(&dir.path().join("inner"), "/", "cgi");
        assert!(resolver.resolve("/../inner/x.txt").is_not_found());
        assert!(resolver.resolve("/a/../x.txt").is_not_found());
        assert!(resolver.resolve("/x.txt").kind() == RouteKind::Static);
        assert!(is_forbidden("/.."));
        assert!(!is_forbidden("/a.b/c..d"));
    }

    #[test]
    fn test_relative_or_empty_path_is_not_found() {
        let dir = site(&["index.html", "page.html"]);
        assert_eq!(resolve(&dir, ""), NOT_FOUND);
        assert_eq!(resolve(&dir, "page"), NOT_FOUND);
        assert_eq!(resolve(&dir, "/"), found(RouteKind::Static, "index.html"));
    }

    #[test]
    fn test_leading_double_slash_stays_inside_root() {
        let dir = site(&["etc/hosts.txt"]);
        assert_eq!(resolve(&dir, "//etc/hosts.txt"), found(RouteKind::Static, "etc/hosts.txt"));
    }

    #[test]
    fn test_mount_prefix() {
        let dir = site(&["index.html", "about.md", "docs+.cgi"]);
        let resolver = Resolver::new(dir.path(), "/app/", "cgi");

        assert_eq!(resolver.resolve("/app").kind(), RouteKind::Static);
        assert_eq!(resolver.resolve("/app/").kind(), RouteKind::Static);
        assert_eq!(resolver.resolve("/app/about").kind(), RouteKind::Markdown);
        assert_eq!(resolver.resolve("/app/docs/a/b").kind(), RouteKind::Module);
        assert!(resolver.resolve("/about").is_not_found());
        assert!(resolver.resolve("/application").is_not_found());
    }

    #[test]
    fn test_classify_custom_extension() {
        let resolver = Resolver::new(Path::new("/site"), "/", ".py");
        assert_eq!(resolver.module_ext(), "py");
        assert_eq!(resolver.classify(Path::new("a.py")), RouteKind::Module);
        assert_eq!(resolver.classify(Path::new("a.cgi")), RouteKind::Static);
        assert_eq!(resolver.classify(Path::new("a.md")), RouteKind::Markdown);
    }
}
