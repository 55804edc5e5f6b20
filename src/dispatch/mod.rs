//! Content dispatch: turn a resolved [`Route`] and a request into a response.
//!
//! Every failure ends as a response. Load failures trip a per-route circuit
//! breaker that holds until the route is evicted; handler errors map to the
//! status carried by [`HttpError`], anything else to 500.

pub mod markdown;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;

use crate::core::{HttpError, Request, Response, status};
use crate::module::{Attrs, Handler, Loaded, Template, reference_for};
use crate::router::{ModuleState, Route, RouteKind, Router};
use crate::{debug, log};

use markdown::Document;

/// Fixed body for unresolved paths.
pub const NOT_FOUND_BODY: &str = "Not found";

/// Dispatches requests through a [`Router`].
pub struct Dispatcher {
    router: Router,
    layout_dir: String,
}

impl Dispatcher {
    pub fn new(router: Router, layout_dir: impl Into<String>) -> Self {
        Self {
            router,
            layout_dir: layout_dir.into().trim_matches('/').to_string(),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Route and dispatch a request.
    pub fn handle(&self, req: &mut Request) -> Response {
        let route = self.router.find(req.path());
        self.dispatch(req, &route)
    }

    /// Produce a response for an already resolved route.
    pub fn dispatch(&self, req: &mut Request, route: &Route) -> Response {
        let result = match route.kind() {
            RouteKind::NotFound => return Response::error(status::NOT_FOUND, NOT_FOUND_BODY),
            RouteKind::Static => self.respond_static(route),
            RouteKind::Markdown => self.respond_markdown(route),
            RouteKind::Module => return self.call_module(req, route),
        };
        result.unwrap_or_else(|e| {
            log!("error"; "{}: {:#}", req.path(), e);
            Response::error(status::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        })
    }

    fn respond_static(&self, route: &Route) -> Result<Response> {
        let path = source_of(route)?;
        let body = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
        Ok(Response::bytes(route.mime(), body))
    }

    fn respond_markdown(&self, route: &Route) -> Result<Response> {
        let path = source_of(route)?;
        let source =
            std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
        let doc = Document::parse(&source, path)?;

        let Some(layout) = doc.layout() else {
            return Ok(Response::html(doc.html));
        };
        let template = self.layout(layout)?;
        Ok(Response::html(template.render(&doc.attrs, Some(&doc.html))?))
    }

    fn layout(&self, name: &str) -> Result<Arc<dyn Template>> {
        if name.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            bail!("invalid layout name `{name}`");
        }
        let reference = format!("{}/{}", self.layout_dir, name);
        match self.router.loader().load(&reference)? {
            Loaded::Template(t) => Ok(t),
            Loaded::Handler(_) => bail!("layout `{reference}` is not a template"),
        }
    }

    fn call_module(&self, req: &mut Request, route: &Route) -> Response {
        let loaded = match self.load_module(route) {
            Ok(loaded) => loaded,
            Err(message) => return Response::error(status::INTERNAL_SERVER_ERROR, message),
        };

        let outcome = match &loaded {
            Loaded::Handler(handler) => invoke(handler.as_ref(), req),
            Loaded::Template(template) => Ok(render_template(template.as_ref(), req)),
        };

        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let code = HttpError::status_of(&e);
                if code >= status::INTERNAL_SERVER_ERROR {
                    log!("handler"; "{}: {:#}", req.path(), e);
                } else {
                    debug!("handler"; "{} -> {}: {}", req.path(), code, e);
                }
                Response::error(code, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                log!("handler"; "{}: panicked: {}", req.path(), message);
                Response::error(status::INTERNAL_SERVER_ERROR, message)
            }
        }
    }

    /// Memoized module for a route. A failed load is sticky until eviction.
    fn load_module(&self, route: &Route) -> Result<Loaded, String> {
        let mut state = route.module();
        match &*state {
            ModuleState::Loaded(loaded) => return Ok(loaded.clone()),
            ModuleState::Failed(message) => return Err(message.clone()),
            ModuleState::NotLoaded => {}
        }

        let resolver = self.router.resolver();
        let source = source_of(route).map_err(|e| e.to_string())?;
        let reference = reference_for(resolver.root(), source, resolver.module_ext());
        match self.router.loader().load(&reference) {
            Ok(loaded) => {
                *state = ModuleState::Loaded(loaded.clone());
                Ok(loaded)
            }
            Err(e) => {
                log!("module"; "error loading `{}`: {}", reference, e);
                let message = e.to_string();
                *state = ModuleState::Failed(message.clone());
                Err(message)
            }
        }
    }
}

type Outcome = std::thread::Result<Result<Response>>;

fn invoke(handler: &dyn Handler, req: &mut Request) -> Outcome {
    catch_unwind(AssertUnwindSafe(|| handler.call(req)))
}

/// Render a template module with the query parameters and context bag.
fn render_template(template: &dyn Template, req: &Request) -> Result<Response> {
    let mut attrs: Attrs = req
        .query_params()
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    attrs.extend(req.ctx().iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(Response::html(template.render(&attrs, None)?))
}

fn source_of(route: &Route) -> Result<&std::path::Path> {
    route
        .source()
        .ok_or_else(|| anyhow!("{} route has no source", route.kind().as_str()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}
