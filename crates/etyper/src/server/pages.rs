//! Request routing and the HTML index page.

use std::fmt::Write as _;

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

use crate::document::is_document_name;

/// What a request path asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`: document list.
    Index,
    /// `/dl/<name>`: one document. The name is decoded and reduced to its
    /// last path component.
    Download(String),
    /// `/download-all`: zip of every document.
    Archive,
    /// Anything else.
    NotFound,
}

/// Route a request URL (path plus optional query).
pub fn route(url: &str) -> Route {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    match path {
        "" | "/" => Route::Index,
        "/download-all" => Route::Archive,
        _ => match path.strip_prefix("/dl/") {
            Some(raw) => {
                let decoded = percent_decode_str(raw).decode_utf8_lossy();
                let name = decoded.rsplit(['/', '\\']).next().unwrap_or_default();
                if is_document_name(name) {
                    Route::Download(name.to_owned())
                } else {
                    Route::NotFound
                }
            }
            None => Route::NotFound,
        },
    }
}

/// One row of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// File name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

/// `"N B"` below 1 KiB, `"N.N KB"` above.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "body{font-family:sans-serif;max-width:600px;margin:2em auto;padding:0 1em;}\
a{display:block;padding:.6em;margin:.3em 0;background:#f4f4f4;color:#000;text-decoration:none;border-radius:4px;}\
a:hover{background:#e0e0e0;}\
.meta{color:#666;font-size:.85em;}\
.dl-all{margin-top:1.5em;}\
.dl-all a{background:#222;color:#fff;text-align:center;}";

/// Index page listing `entries` in the order given.
pub fn render_index(entries: &[Entry]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html><head><meta charset='utf-8'>");
    html.push_str("<meta name='viewport' content='width=device-width, initial-scale=1'>");
    html.push_str("<title>etyper documents</title><style>");
    html.push_str(STYLE);
    html.push_str("</style></head><body><h1>etyper documents</h1>");
    if entries.is_empty() {
        html.push_str("<p>No documents yet.</p>");
    } else {
        for entry in entries {
            let _ = write!(
                html,
                "<a href='/dl/{}'>{} <span class='meta'>({})</span></a>",
                utf8_percent_encode(&entry.name, NON_ALPHANUMERIC),
                escape_html(&entry.name),
                format_size(entry.size),
            );
        }
        html.push_str("<div class='dl-all'><a href='/download-all'>Download all as .zip</a></div>");
    }
    html.push_str("</body></html>");
    html
}
