//! Conversion between tiny_http and the core request/response types.

use std::io::Cursor;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, StatusCode};

use crate::core::{Request, Response, status};

/// Build a core request, reading the body.
pub fn read_request(request: &mut tiny_http::Request) -> Result<Request> {
    let mut body = Vec::new();
    request
        .as_reader()
        .read_to_end(&mut body)
        .context("Failed to read request body")?;

    let headers = request
        .headers()
        .iter()
        .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
        .collect::<Vec<_>>();

    let req = headers.into_iter().fold(
        Request::new(request.method().clone(), request.url()),
        |req, (name, value)| req.with_header(name, value),
    );
    Ok(req.with_body(body))
}

/// Convert a core response. HEAD responses keep their headers, drop the body.
pub fn to_http(response: Response, method: &Method) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let (status, headers, body) = response.into_parts();
    let body = if *method == Method::Head { Vec::new() } else { body };

    headers
        .iter()
        .filter_map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).ok())
        .fold(
            tiny_http::Response::from_data(body).with_status_code(StatusCode(status)),
            |res, header| res.with_header(header),
        )
}

/// Write a core response back to the client.
pub fn send(request: tiny_http::Request, response: Response) -> Result<()> {
    let response = to_http(response, request.method());
    request.respond(response)?;
    Ok(())
}

/// Respond with 503 while shutting down.
pub fn respond_unavailable(request: tiny_http::Request) -> Result<()> {
    send(
        request,
        Response::error(status::SERVICE_UNAVAILABLE, "Server is shutting down"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(res: &'a tiny_http::Response<Cursor<Vec<u8>>>, name: &'static str) -> Option<&'a str> {
        res.headers()
            .iter()
            .find(|h| h.field.equiv(name))
            .map(|h| h.value.as_str())
    }

    #[test]
    fn test_to_http_keeps_status_and_headers() {
        let res = to_http(Response::html("<p>x</p>").with_status(201), &Method::Get);
        assert_eq!(res.status_code(), StatusCode(201));
        assert_eq!(header(&res, "Content-Type"), Some(crate::utils::mime::types::HTML));
        assert_eq!(res.data_length(), Some(8));
    }

    #[test]
    fn test_to_http_head_drops_body() {
        let res = to_http(Response::text("hello"), &Method::Head);
        assert_eq!(res.status_code(), StatusCode(200));
        assert_eq!(res.data_length(), Some(0));
        assert!(header(&res, "Content-Type").is_some());
    }
}
