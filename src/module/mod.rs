//! Module loading.
//!
//! A module is a file under the site root whose extension is the configured
//! module extension. Loading it yields either an executable [`Handler`] or a
//! renderable [`Template`]. Modules are addressed by a logical reference: the
//! path relative to the site root, `/`-separated, without the extension
//! (`blog+`, `_layout/post`).

mod script;
mod template;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::{Request, Response};

pub use script::ScriptLoader;
pub use template::TextTemplate;

/// Attribute map handed to templates.
pub type Attrs = Map<String, Value>;

/// Why a module could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read module `{}`", .0.display())]
    Io(PathBuf, #[source] io::Error),

    #[error("syntax error in `{reference}`: {message}")]
    Syntax { reference: String, message: String },

    #[error("interpreter `{interpreter}` for `{reference}` not found")]
    Interpreter { reference: String, interpreter: String },
}

/// Executable request handler.
pub trait Handler: Send + Sync {
    fn call(&self, req: &mut Request) -> anyhow::Result<Response>;
}

impl<F> Handler for F
where
    F: Fn(&mut Request) -> anyhow::Result<Response> + Send + Sync,
{
    fn call(&self, req: &mut Request) -> anyhow::Result<Response> {
        self(req)
    }
}

/// Renderable template.
///
/// `content` is inserted unescaped wherever the template asks for it.
pub trait Template: Send + Sync {
    fn render(&self, attrs: &Attrs, content: Option<&str>) -> anyhow::Result<String>;
}

/// A loaded module.
#[derive(Clone)]
pub enum Loaded {
    Handler(Arc<dyn Handler>),
    Template(Arc<dyn Template>),
}

impl Loaded {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Handler(_) => "handler",
            Self::Template(_) => "template",
        }
    }
}

impl std::fmt::Debug for Loaded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Loaded::{}", self.kind())
    }
}

/// Loads and unloads modules by logical reference.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, reference: &str) -> Result<Loaded, LoadError>;

    /// Forget a reference so the next `load` re-reads the file.
    fn unload(&self, reference: &str);
}

/// Logical reference for a module file: relative to `root`, `/`-separated,
/// extension stripped. Paths outside `root` keep their full form.
pub fn reference_for(root: &Path, path: &Path, ext: &str) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let suffix = format!(".{ext}");
    match joined.strip_suffix(&suffix) {
        Some(stem) => stem.to_string(),
        None => joined,
    }
}

/// Inverse of [`reference_for`].
pub fn path_for(root: &Path, reference: &str, ext: &str) -> PathBuf {
    root.join(format!("{reference}.{ext}"))
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory loader that counts calls.

    use super::*;
    use parking_lot::Mutex;
    use rustc_hash::FxHashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct CountingLoader {
        modules: Mutex<FxHashMap<String, Result<Loaded, String>>>,
        pub loads: AtomicUsize,
        pub unloads: Mutex<Vec<String>>,
    }

    impl CountingLoader {
        pub fn with(self, reference: &str, module: Loaded) -> Self {
            self.modules.lock().insert(reference.into(), Ok(module));
            self
        }

        pub fn failing(self, reference: &str, message: &str) -> Self {
            self.modules.lock().insert(reference.into(), Err(message.into()));
            self
        }

        pub fn set(&self, reference: &str, module: Loaded) {
            self.modules.lock().insert(reference.into(), Ok(module));
        }

        pub fn load_count(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl ModuleLoader for CountingLoader {
        fn load(&self, reference: &str) -> Result<Loaded, LoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            match self.modules.lock().get(reference) {
                Some(Ok(m)) => Ok(m.clone()),
                Some(Err(msg)) => Err(LoadError::Syntax {
                    reference: reference.into(),
                    message: msg.clone(),
                }),
                None => Err(LoadError::Io(
                    PathBuf::from(reference),
                    io::Error::from(io::ErrorKind::NotFound),
                )),
            }
        }

        fn unload(&self, reference: &str) {
            self.unloads.lock().push(reference.into());
        }
    }

    /// Handler answering with a fixed body.
    pub fn text_handler(body: &'static str) -> Loaded {
        Loaded::Handler(Arc::new(move |_: &mut Request| {
            Ok::<_, anyhow::Error>(Response::text(body))
        }))
    }
}
