//! Incoming request as seen by the router, dispatcher and handlers.

use rustc_hash::FxHashMap;
use serde_json::Value;
use tiny_http::Method;

use crate::utils::path::{decode_url_path, parse_query, split_target};

/// An incoming HTTP request.
///
/// The path is percent-decoded and stripped of its query string; query
/// parameters are decoded into a map. The context bag is free for handlers
/// and templates to share per-request data.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query_string: String,
    query: FxHashMap<String, String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    ctx: FxHashMap<String, Value>,
}

impl Request {
    /// Build a request from a method and raw request target (`/path?query`).
    pub fn new(method: Method, target: &str) -> Self {
        let (_, query_string) = split_target(target);
        let query_string = query_string.unwrap_or_default().to_string();
        Self {
            method,
            path: decode_url_path(target),
            query: parse_query(&query_string),
            query_string,
            headers: Vec::new(),
            body: Vec::new(),
            ctx: FxHashMap::default(),
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(target: &str) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Decoded request path (no query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw, undecoded query string (without `?`).
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// A single decoded query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn query_params(&self) -> &FxHashMap<String, String> {
        &self.query
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Per-request context bag.
    pub fn ctx(&self) -> &FxHashMap<String, Value> {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut FxHashMap<String, Value> {
        &mut self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_splits_path_and_query() {
        let req = Request::get("/blog/my%20post?page=2&tag=a+b");
        assert_eq!(req.path(), "/blog/my post");
        assert_eq!(req.query_string(), "page=2&tag=a+b");
        assert_eq!(req.query("page"), Some("2"));
        assert_eq!(req.query("tag"), Some("a b"));
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = Request::get("/").with_header("Content-Type", "text/plain");
        assert_eq!(req.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_ctx_is_mutable() {
        let mut req = Request::get("/");
        req.ctx_mut().insert("user".into(), Value::from("ana"));
        assert_eq!(req.ctx().get("user"), Some(&Value::from("ana")));
    }
}
