//! Read-only document sharing over HTTP(S).
//!
//! Each [`FileServer`] owns one listening socket and one accept thread.
//! The thread polls for requests with a short timeout so it notices a stop
//! request promptly; it only reads files from the documents directory.

use std::io::{self, Cursor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Header, Method, Request, Response, Server, SslConfig};

use platform::config::ARCHIVE_NAME;
use platform::{CommandError, StopFlag};

use crate::document::{DocumentError, DocumentStore};

pub mod archive;
pub mod cert;
pub mod pages;

pub use archive::build_archive;
pub use cert::{ensure_certificate, CertPaths};
pub use pages::{format_size, render_index, route, Entry, Route};

/// How long the accept loop blocks before re-checking its stop flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// File-sharing errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening socket could not be opened (or TLS set up).
    #[error("cannot listen on {addr}: {message}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// What went wrong.
        message: String,
    },
    /// The accept thread could not be started.
    #[error("cannot start server thread: {0}")]
    Thread(#[source] io::Error),
    /// The accept thread panicked.
    #[error("{0} server thread panicked")]
    Panicked(&'static str),
    /// A file could not be read.
    #[error("reading {path}: {source}")]
    Read {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Listing the documents failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Writing the zip failed.
    #[error("building archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    /// Certificate generation failed.
    #[error("certificate generation: {0}")]
    Command(#[from] CommandError),
}

/// A running server that can be stopped.
pub trait ServerHandle: Send {
    /// Short name for logs ("https", "http").
    fn name(&self) -> &'static str;

    /// Address actually bound.
    fn local_addr(&self) -> SocketAddr;

    /// Stop accepting and join the accept thread. Idempotent.
    fn stop(&mut self) -> Result<(), ServerError>;
}

/// tiny_http server on its own thread.
#[derive(Debug)]
pub struct FileServer {
    name: &'static str,
    addr: SocketAddr,
    stop: StopFlag,
    thread: Option<JoinHandle<()>>,
}

impl FileServer {
    /// Plain HTTP on `addr`.
    pub fn start_plain(addr: SocketAddr, store: DocumentStore) -> Result<Self, ServerError> {
        let server = Server::http(addr).map_err(|e| ServerError::Bind {
            addr,
            message: e.to_string(),
        })?;
        Self::spawn("http", addr, server, store)
    }

    /// HTTPS on `addr` with the PEM certificate and key in `cert`.
    pub fn start_tls(addr: SocketAddr, store: DocumentStore, cert: &CertPaths) -> Result<Self, ServerError> {
        let (certificate, private_key) = cert.load()?;
        let server = Server::https(
            addr,
            SslConfig {
                certificate,
                private_key,
            },
        )
        .map_err(|e| ServerError::Bind {
            addr,
            message: e.to_string(),
        })?;
        Self::spawn("https", addr, server, store)
    }

    fn spawn(
        name: &'static str,
        requested: SocketAddr,
        server: Server,
        store: DocumentStore,
    ) -> Result<Self, ServerError> {
        let addr = server.server_addr().to_ip().unwrap_or(requested);
        let stop = StopFlag::new();
        let thread_stop = stop.clone();
        let thread = thread::Builder::new()
            .name(format!("{name}-server"))
            .spawn(move || serve(&server, &store, &thread_stop))
            .map_err(ServerError::Thread)?;
        tracing::info!(server = name, %addr, "file server listening");
        Ok(Self {
            name,
            addr,
            stop,
            thread: Some(thread),
        })
    }
}

impl ServerHandle for FileServer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    fn stop(&mut self) -> Result<(), ServerError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.stop.set();
        thread.join().map_err(|_| ServerError::Panicked(self.name))?;
        tracing::info!(server = self.name, "file server stopped");
        Ok(())
    }
}

impl Drop for FileServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "file server stop on drop failed");
        }
    }
}

fn serve(server: &Server, store: &DocumentStore, stop: &StopFlag) {
    while !stop.is_set() {
        match server.recv_timeout(ACCEPT_POLL) {
            Ok(Some(request)) => handle(request, store),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "accept failed, server loop ending");
                break;
            }
        }
    }
}

type Reply = Response<Cursor<Vec<u8>>>;

fn header(reply: Reply, name: &str, value: &str) -> Reply {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(h) => reply.with_header(h),
        Err(()) => {
            tracing::warn!(name, value, "invalid response header dropped");
            reply
        }
    }
}

fn not_found() -> Reply {
    header(
        Response::from_string("Not found").with_status_code(404),
        "Content-Type",
        "text/plain; charset=utf-8",
    )
}

fn attachment(body: Vec<u8>, content_type: &str, filename: &str) -> Reply {
    let reply = header(Response::from_data(body), "Content-Type", content_type);
    header(
        reply,
        "Content-Disposition",
        &format!("attachment; filename=\"{filename}\""),
    )
}

fn handle(request: Request, store: &DocumentStore) {
    let url = request.url().to_owned();
    let reply = if matches!(request.method(), Method::Get | Method::Head) {
        respond(&url, store)
    } else {
        Response::from_string("Method not allowed").with_status_code(405)
    };
    tracing::debug!(method = %request.method(), url = %url, status = reply.status_code().0, "request");
    if let Err(e) = request.respond(reply) {
        tracing::debug!(error = %e, "client went away");
    }
}

/// Build the reply for a GET of `url`.
pub fn respond(url: &str, store: &DocumentStore) -> Response<Cursor<Vec<u8>>> {
    match route(url) {
        Route::Index => match index_entries(store) {
            Ok(entries) => header(
                Response::from_string(render_index(&entries)),
                "Content-Type",
                "text/html; charset=utf-8",
            ),
            Err(e) => server_error(&e),
        },
        Route::Download(name) => {
            let path = store.dir().join(&name);
            if !path.is_file() {
                return not_found();
            }
            match std::fs::read(&path) {
                Ok(body) => attachment(body, "text/plain; charset=utf-8", &name),
                Err(e) => server_error(&e),
            }
        }
        Route::Archive => match build_archive(store) {
            Ok(body) => attachment(body, "application/zip", ARCHIVE_NAME),
            Err(e) => server_error(&e),
        },
        Route::NotFound => not_found(),
    }
}

fn server_error(error: &dyn std::error::Error) -> Reply {
    tracing::warn!(error = %error, "request failed");
    Response::from_string("Internal error").with_status_code(500)
}

/// Documents newest first, with sizes.
pub fn index_entries(store: &DocumentStore) -> Result<Vec<Entry>, ServerError> {
    let mut entries = Vec::new();
    for path in store.list()?.into_iter().rev() {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let size = std::fs::metadata(&path)
            .map_err(|source| ServerError::Read {
                path: path.clone(),
                source,
            })?
            .len();
        entries.push(Entry {
            name: name.to_owned(),
            size,
        });
    }
    Ok(entries)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn header_value(reply: &Reply, name: &'static str) -> Option<String> {
        reply
            .headers()
            .iter()
            .find(|h| h.field.equiv(name))
            .map(|h| h.value.as_str().to_owned())
    }

    #[test]
    fn test_index_is_newest_first() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("doc_20240101_000000.txt"), "old").unwrap();
        fs::write(tmp.path().join("doc_20240202_000000.txt"), "newer").unwrap();
        let entries = index_entries(&DocumentStore::new(tmp.path())).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["doc_20240202_000000.txt", "doc_20240101_000000.txt"]);
        assert_eq!(entries[0].size, 5);
    }

    #[test]
    fn test_download_reply_headers() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("doc_1.txt"), "hello").unwrap();
        let reply = respond("/dl/doc_1.txt", &DocumentStore::new(tmp.path()));
        assert_eq!(reply.status_code().0, 200);
        assert_eq!(
            header_value(&reply, "Content-Disposition").as_deref(),
            Some("attachment; filename=\"doc_1.txt\"")
        );
        assert_eq!(
            header_value(&reply, "Content-Type").as_deref(),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_missing_download_is_404() {
        let tmp = TempDir::new().unwrap();
        let reply = respond("/dl/doc_9.txt", &DocumentStore::new(tmp.path()));
        assert_eq!(reply.status_code().0, 404);
    }

    #[test]
    fn test_archive_reply_headers() {
        let tmp = TempDir::new().unwrap();
        let reply = respond("/download-all", &DocumentStore::new(tmp.path()));
        assert_eq!(
            header_value(&reply, "Content-Disposition").as_deref(),
            Some("attachment; filename=\"etyper_docs.zip\"")
        );
    }
}
