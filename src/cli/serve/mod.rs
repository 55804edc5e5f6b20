//! Development server.
//!
//! Requests are read on the accept thread and handed to a rayon pool, which
//! runs them through the [`Dispatcher`]. The optional watcher evicts cached
//! routes when files under the site root change.

mod lifecycle;
mod response;

use crate::{
    config::TrellisConfig,
    core::{Request, is_shutdown},
    debug,
    dispatch::Dispatcher,
    log,
    module::ScriptLoader,
    router::{Resolver, Router},
};
use anyhow::{Context, Result};
use crossbeam::channel;
use std::net::SocketAddr;
use std::sync::Arc;
use tiny_http::Server;

/// Build the routing pipeline for a site.
pub fn build_dispatcher(config: &TrellisConfig) -> Dispatcher {
    let site = &config.site;
    let loader = Arc::new(ScriptLoader::new(config.root(), site.module_ext.as_str()));
    let resolver = Resolver::new(config.root(), &site.mount, &site.module_ext);
    Dispatcher::new(Router::new(resolver, loader), site.layout_dir.as_str())
}

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server without starting the request loop.
pub fn bind_server(config: &TrellisConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    lifecycle::register_server_for_shutdown(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{}", addr);

    Ok(BoundServer {
        server,
        addr,
        shutdown_rx,
    })
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the request loop (blocking).
    pub fn run(self, config: &TrellisConfig, dispatcher: Arc<Dispatcher>) -> Result<()> {
        log!("serve"; "serving from {}", config.root().display());

        let watcher = lifecycle::spawn_watcher(
            Arc::clone(&dispatcher),
            config.root().to_path_buf(),
            config.serve.poll_interval(),
            config.serve.watch,
            self.shutdown_rx,
        );
        let result = run_request_loop(&self.server, dispatcher, config.serve.workers);
        lifecycle::wait_for_shutdown(watcher);
        result
    }
}

/// Serve a site until shutdown.
pub fn serve(config: &TrellisConfig) -> Result<()> {
    let dispatcher = Arc::new(build_dispatcher(config));
    bind_server(config)?.run(config, dispatcher)
}

fn run_request_loop(server: &Server, dispatcher: Arc<Dispatcher>, workers: usize) -> Result<()> {
    // Handlers may block on subprocesses; keep the accept thread free.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("trellis-worker-{i}"))
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let dispatcher = Arc::clone(&dispatcher);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &dispatcher) {
                log!("serve"; "request error: {e:#}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: tiny_http::Request, dispatcher: &Dispatcher) -> Result<()> {
    // Early exit if shutdown requested
    if is_shutdown() {
        return response::respond_unavailable(request);
    }
    serve_request(request, dispatcher)
}

fn serve_request(mut request: tiny_http::Request, dispatcher: &Dispatcher) -> Result<()> {
    let mut req: Request = response::read_request(&mut request)?;
    let res = dispatcher.handle(&mut req);
    debug!("serve"; "{} {} -> {}", req.method(), request.url(), res.status());
    response::send(request, res)
}
