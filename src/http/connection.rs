use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::http::parser::{header_section_len, parse_http_request};
use crate::http::request::{Method, Request};
use crate::http::resolver::PathResolver;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::storage::{DocumentStore, LocalFs};

/// Bytes requested from the socket per read
const READ_CHUNK: usize = 1024;

/// Per-connection resource bounds.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub max_header_bytes: usize,
}

impl ConnectionLimits {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            read_timeout: cfg.server.read_timeout(),
            write_timeout: cfg.server.write_timeout(),
            max_header_bytes: cfg.server.max_header_bytes,
        }
    }
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Read-only state shared by every connection of one server.
#[derive(Debug)]
pub struct Site<S = LocalFs> {
    pub resolver: PathResolver,
    pub store: S,
    pub limits: ConnectionLimits,
}

/// Why a request was answered before it could be dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InvalidRequest,
    RequestTooLarge,
    Timeout,
}

impl Rejection {
    pub fn response(&self) -> Response {
        match self {
            Rejection::InvalidRequest => Response::bad_request(),
            Rejection::RequestTooLarge => Response::empty(StatusCode::RequestHeaderFieldsTooLarge),
            Rejection::Timeout => Response::empty(StatusCode::RequestTimeout),
        }
    }
}

enum Received {
    Request(Request),
    Rejected(Rejection),
    PeerClosed,
}

pub enum ConnectionState {
    Receiving,
    Parsed(Request),
    Responding(ResponseWriter),
    Closed,
}

/// One accepted socket, driven through a single request/response exchange.
///
/// `run` takes the connection by value; the stream is dropped, and the
/// socket released, when it returns.
pub struct Connection<T = TcpStream, S = LocalFs> {
    stream: T,
    peer: SocketAddr,
    buffer: BytesMut,
    state: ConnectionState,
    site: Arc<Site<S>>,
}

impl<T, S> Connection<T, S>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: DocumentStore,
{
    pub fn new(stream: T, peer: SocketAddr, site: Arc<Site<S>>) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Receiving,
            site,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Receiving => match self.receive().await? {
                    Received::Request(req) => ConnectionState::Parsed(req),
                    Received::Rejected(rejection) => {
                        warn!(peer = %self.peer, reason = ?rejection, "Rejecting request");
                        ConnectionState::Responding(ResponseWriter::new(&rejection.response()))
                    }
                    Received::PeerClosed => {
                        debug!(peer = %self.peer, "Peer closed before sending a full request");
                        ConnectionState::Closed
                    }
                },

                ConnectionState::Parsed(req) => {
                    let response = self.handle_request(&req).await;
                    info!(
                        peer = %self.peer,
                        method = %req.method,
                        path = %req.path,
                        status = response.status.as_u16(),
                        "Response ready"
                    );
                    ConnectionState::Responding(ResponseWriter::new(&response))
                }

                ConnectionState::Responding(mut writer) => {
                    timeout(
                        self.site.limits.write_timeout,
                        writer.write_to_stream(&mut self.stream),
                    )
                    .await
                    .context("Write timeout")??;

                    // Best effort; the response is already written
                    if let Err(e) = self.stream.shutdown().await {
                        debug!(peer = %self.peer, error = %e, "Shutdown failed");
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }

    /// Accumulate bytes until the header terminator arrives, then parse.
    ///
    /// The read timeout bounds the whole head, not each read, so a client
    /// trickling one byte at a time cannot hold the connection open.
    async fn receive(&mut self) -> anyhow::Result<Received> {
        let max = self.site.limits.max_header_bytes;
        let deadline = Instant::now() + self.site.limits.read_timeout;

        loop {
            match header_section_len(&self.buffer) {
                Some(len) if len > max => return Ok(Received::Rejected(Rejection::RequestTooLarge)),
                Some(len) => {
                    return Ok(match parse_http_request(&self.buffer[..len]) {
                        Ok(req) => Received::Request(req),
                        Err(e) => {
                            debug!(peer = %self.peer, error = %e, "Unparseable request head");
                            Received::Rejected(Rejection::InvalidRequest)
                        }
                    });
                }
                None if self.buffer.len() >= max => {
                    return Ok(Received::Rejected(Rejection::RequestTooLarge));
                }
                None => {}
            }

            self.buffer.reserve(READ_CHUNK);
            let n = match timeout_at(deadline, self.stream.read_buf(&mut self.buffer)).await {
                Ok(read) => read.context("Failed to read request")?,
                Err(_) => return Ok(Received::Rejected(Rejection::Timeout)),
            };

            if n == 0 {
                return Ok(Received::PeerClosed);
            }
        }
    }

    /// Decide the response for a parsed request.
    async fn handle_request(&self, req: &Request) -> Response {
        info!(
            peer = %self.peer,
            method = %req.method,
            path = %req.path,
            version = %req.version,
            "Request"
        );

        // POST is refused rather than answered like GET; request bodies are
        // never read, so serving the file would silently drop the payload
        if req.method != Method::GET {
            return Response::method_not_allowed();
        }

        let target = match self.site.resolver.resolve(&req.path) {
            Ok(target) => target,
            Err(forbidden) => {
                warn!(peer = %self.peer, path = %req.path, "{}", forbidden);
                return Response::forbidden();
            }
        };

        if !self.site.store.is_file(&target).await {
            return Response::not_found();
        }

        match self.site.store.read(&target).await {
            Ok(contents) => Response::ok(contents),
            Err(e) => {
                warn!(
                    peer = %self.peer,
                    target = %target.display(),
                    error = %e,
                    "Failed to read file"
                );
                Response::internal_error()
            }
        }
    }
}
