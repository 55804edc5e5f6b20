//! trellis: a file-system routed web runtime.
//!
//! Files under the site root map to request paths:
//!
//! ```text
//! /about          → about.html | about.md | about.cgi | about+.cgi
//! /blog/          → blog/index.*
//! /blog/2024/post → blog/2024/post.*  or the nearest ancestor `+` module
//! ```
//!
//! [`router`] resolves and caches routes, [`dispatch`] turns a route into a
//! response, [`watch`] evicts cached routes when their files change.

pub mod logger;

pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod module;
pub mod params;
pub mod router;
pub mod utils;
pub mod watch;
