//! HTTP response handlers.
//!
//! Every response carries `Access-Control-Allow-Origin: *`.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::embed::serve::{LIVERELOAD_JS, LiveReloadVars, livereload_tag};
use crate::utils::html::inject_before;
use crate::utils::mime::{self, types};

/// Serve a file. HTML gets the live-reload tag when `ws_port` is set.
pub fn respond_file(request: Request, path: &Path, ws_port: Option<u16>) -> Result<()> {
    respond_file_with_status(request, path, 200, ws_port)
}

/// Serve `path` under another status (history fallback, custom 404).
pub fn respond_file_with_status(
    request: Request,
    path: &Path,
    status: u16,
    ws_port: Option<u16>,
) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, status, content_type);
    }

    if status == 200
        && let Some(range) = header_value(&request, "range")
    {
        return respond_range(request, path, content_type, &range);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = maybe_inject_livereload(body, content_type, ws_port);
    send_body(request, status, content_type, body)
}

/// Partial content for media seeking.
fn respond_range(
    request: Request,
    path: &Path,
    content_type: &'static str,
    range: &str,
) -> Result<()> {
    let file_size = fs::metadata(path)?.len();

    let Some((start, end)) = parse_range(range, file_size) else {
        let response = Response::empty(StatusCode(416));
        let response = with_headers(
            response,
            &[("Content-Range", &format!("bytes */{file_size}"))],
        );
        return request.respond(response).map_err(Into::into);
    };

    let length = end - start + 1;
    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(start))?;

    let response = Response::new(
        StatusCode(206),
        Vec::new(),
        file.take(length),
        usize::try_from(length).ok(),
        None,
    );
    let response = with_headers(
        response,
        &[
            ("Content-Type", content_type),
            ("Content-Range", &format!("bytes {start}-{end}/{file_size}")),
            ("Accept-Ranges", "bytes"),
        ],
    );
    request.respond(response)?;
    Ok(())
}

/// Parse `bytes=start-end`, `bytes=start-` or `bytes=-suffix` into an
/// inclusive range. `None` when unsatisfiable.
pub fn parse_range(range: &str, file_size: u64) -> Option<(u64, u64)> {
    let spec = range.trim().strip_prefix("bytes=")?;
    // Multiple ranges are answered with the first.
    let spec = spec.split(',').next()?.trim();
    let (start, end) = spec.split_once('-')?;
    let last = file_size.checked_sub(1)?;

    let (start, end) = match (start.trim(), end.trim()) {
        ("", "") => return None,
        ("", suffix) => {
            let suffix: u64 = suffix.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            (file_size.saturating_sub(suffix), last)
        }
        (start, "") => (start.parse().ok()?, last),
        (start, end) => (start.parse().ok()?, end.parse::<u64>().ok()?.min(last)),
    };

    (start <= end && start <= last).then_some((start, end))
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.to_string())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, types::PLAIN);
    }
    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

/// Server is shutting down.
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, types::PLAIN, b"503 Service Unavailable".to_vec())
}

/// Live-reload client from memory, bound to `ws_port`.
pub fn respond_livereload_js(request: Request, ws_port: u16) -> Result<()> {
    let body = LIVERELOAD_JS.render(&LiveReloadVars { ws_port });
    send_body(request, 200, types::JAVASCRIPT, body.into_bytes())
}

/// Add the live-reload `<script>` before `</body>` of HTML responses.
pub fn maybe_inject_livereload(body: Vec<u8>, content_type: &str, ws_port: Option<u16>) -> Vec<u8> {
    if ws_port.is_none() || !mime::is_html(content_type) {
        return body;
    }
    match String::from_utf8(body) {
        Ok(html) => inject_before(&html, "body", &livereload_tag()).into_bytes(),
        Err(e) => e.into_bytes(),
    }
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &str) -> Result<()> {
    let response = with_headers(
        Response::empty(StatusCode(status)),
        &[("Content-Type", content_type)],
    );
    request.respond(response)?;
    Ok(())
}

fn send_body(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let response = with_headers(
        Response::from_data(body).with_status_code(StatusCode(status)),
        &[("Content-Type", content_type), ("Cache-Control", "no-cache")],
    );
    request.respond(response)?;
    Ok(())
}

fn with_headers<R: Read>(mut response: Response<R>, headers: &[(&str, &str)]) -> Response<R> {
    let cors = [("Access-Control-Allow-Origin", "*")];
    for (key, value) in headers.iter().chain(cors.iter()) {
        if let Ok(header) = Header::from_bytes(key.as_bytes(), value.as_bytes()) {
            response.add_header(header);
        }
    }
    response
}
