//! `trellis route`: show how request paths resolve without serving them.

use crate::config::TrellisConfig;
use crate::router::{Resolver, Route};
use crate::utils::path::decode_url_path;
use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use std::io::{Write, stdout};
use std::path::Path;

/// Resolve each path and print `<path>  <kind>  <source>`.
///
/// Paths are decoded like request targets, so `/a%20b?x=1` resolves `/a b`.
pub fn run_route(paths: &[String], config: &TrellisConfig) -> Result<()> {
    let mut out = stdout().lock();
    for line in route_lines(paths, config) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn route_lines(paths: &[String], config: &TrellisConfig) -> Vec<String> {
    let site = &config.site;
    let resolver = Resolver::new(config.root(), &site.mount, &site.module_ext);
    paths
        .iter()
        .map(|path| describe(path, &resolver.resolve(&decode_url_path(path)), resolver.root()))
        .collect()
}

fn describe(path: &str, route: &Route, root: &Path) -> String {
    let kind = route.kind().as_str();
    match route.source() {
        Some(source) => {
            let source = source.strip_prefix(root).unwrap_or(source);
            format!(
                "{path}  {}  {}",
                kind.if_supports_color(Stream::Stdout, |k| k.green()),
                source.display()
            )
        }
        None => format!("{path}  {}", kind.if_supports_color(Stream::Stdout, |k| k.red())),
    }
}
