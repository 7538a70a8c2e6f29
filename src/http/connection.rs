use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::files::StaticFiles;
use crate::http::parser::{parse_http_request, ParseError};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::router::{Dispatch, Router};

const READ_CHUNK: usize = 4096;

/// Everything a connection needs to turn a request into a response.
///
/// Shared read-only across all connections.
pub struct Service {
    pub router: Arc<Router>,
    pub files: StaticFiles,
    pub server_name: String,
    pub read_timeout: Duration,
}

impl Service {
    /// Routes a request: registered handler first, then static files for
    /// GET, otherwise 405 or 404.
    pub async fn respond(&self, req: &Request) -> Response {
        match self.dispatch(req).await {
            Ok(Dispatch::Handled(response)) => response,
            Ok(Dispatch::NoRoute) if req.method == Method::GET => self.files.serve(&req.path).await,
            Ok(Dispatch::NoRoute) => {
                let allowed = self.router.allowed_methods(&req.path);
                if allowed.is_empty() {
                    Response::not_found()
                } else {
                    Response::method_not_allowed(&allowed)
                }
            }
            Err(e) => {
                tracing::error!(
                    method = %req.method,
                    path = %req.path,
                    error = %e,
                    "Handler failed"
                );
                Response::internal_error()
            }
        }
    }

    /// Runs the route lookup and handler on the blocking pool, so a handler
    /// that blocks holds only its own connection's worker slot.
    async fn dispatch(&self, req: &Request) -> anyhow::Result<Dispatch> {
        let router = Arc::clone(&self.router);
        let owned = req.clone();
        tokio::task::spawn_blocking(move || router.dispatch(&owned))
            .await
            .map_err(|e| anyhow::anyhow!("handler task failed: {e}"))?
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("read timed out")]
    Timeout,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter),
    Closed,
}

/// One accepted connection, served exactly once and then closed.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    state: ConnectionState,
    service: Arc<Service>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, service: Arc<Service>) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Reading,
            service,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let result = self.drive().await;
        // Best effort; the socket is released when `self` drops either way
        let _ = self.stream.shutdown().await;
        result
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        let started = Instant::now();

        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(req) => {
                        if req.truncated {
                            tracing::warn!(
                                peer = %self.peer,
                                expected = req.content_length(),
                                received = req.body.len(),
                                "Request body truncated"
                            );
                        }
                        self.state = ConnectionState::Processing(req);
                    }
                    Err(ReadError::Parse(e)) => {
                        tracing::debug!(peer = %self.peer, error = %e, "Rejecting request");
                        let writer =
                            ResponseWriter::new(&Response::bad_request(), &self.service.server_name);
                        self.state = ConnectionState::Writing(writer);
                    }
                    Err(ReadError::Timeout) => {
                        tracing::debug!(peer = %self.peer, "Read timed out, dropping connection");
                    }
                    Err(ReadError::Io(e)) => {
                        return Err(anyhow::Error::new(e).context("reading request"));
                    }
                },

                ConnectionState::Processing(req) => {
                    let response = self.service.respond(&req).await;
                    tracing::info!(
                        peer = %self.peer,
                        method = %req.method,
                        path = %req.path,
                        status = response.status.as_u16(),
                        bytes = response.body.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Request served"
                    );

                    let writer = ResponseWriter::new(&response, &self.service.server_name);
                    self.state = ConnectionState::Writing(writer);
                }

                ConnectionState::Writing(mut writer) => {
                    writer
                        .write_to_stream(&mut self.stream)
                        .await
                        .map_err(|e| e.context(format!("writing response to {}", self.peer)))?;
                    // No keep-alive: one response per connection
                }

                ConnectionState::Closed => break,
            }
        }

        Ok(())
    }

    /// Reads until one full request is buffered or the peer stops sending.
    pub async fn read_request(&mut self) -> Result<Request, ReadError> {
        let mut eof = false;
        loop {
            match parse_http_request(&self.buffer, eof) {
                Ok((request, consumed)) => {
                    let _ = self.buffer.split_to(consumed);
                    return Ok(request);
                }
                Err(ParseError::Incomplete) if !eof => {}
                Err(ParseError::Incomplete) => {
                    // Parser never reports Incomplete once eof is set
                    return Err(ParseError::EmptyRequest.into());
                }
                Err(e) => return Err(e.into()),
            }

            self.buffer.reserve(READ_CHUNK);
            let read = tokio::time::timeout(
                self.service.read_timeout,
                self.stream.read_buf(&mut self.buffer),
            )
            .await
            .map_err(|_| ReadError::Timeout)??;

            if read == 0 {
                eof = true;
            }
        }
    }
}
