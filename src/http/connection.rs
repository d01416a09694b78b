//! Per-connection HTTP state driven by the reactor.
//!
//! One [`HttpConnection`] lives for the life of one client socket. Each
//! readiness event pulls whatever bytes the kernel has, advances the
//! incremental parse, and - once the header block is in - offers the
//! request to the middleware chain. A chain that cannot answer yet leaves
//! no trace except its rewound cursor; the next event picks up from there.
//!
//! Requests are served strictly one at a time: after a response goes out
//! and the request's declared bytes are all in, the connection resets and
//! the next request on the same socket parses from scratch.

use std::sync::Arc;

use bytes::{Buf, BytesMut};

use crate::http::middleware::{Handler, MiddlewareChain};
use crate::http::parser::Parser;
use crate::http::request::{ParseState, ServerRequest};
use crate::http::response::{Response, Status};
use crate::http::writer;
use crate::net::socket::{Progress, Socket};
use crate::server::reactor::ClientEvents;

const READ_CHUNK: usize = 4096;

/// The server half of one client connection.
pub struct HttpConnection {
    chain: Arc<MiddlewareChain>,
    request: ServerRequest,
    parser: Parser,
    inbound: BytesMut,
    response_sent: bool,
}

impl HttpConnection {
    pub fn new(chain: Arc<MiddlewareChain>) -> Self {
        Self {
            chain,
            request: ServerRequest::new(String::new()),
            parser: Parser::new(),
            inbound: BytesMut::with_capacity(READ_CHUNK),
            response_sent: false,
        }
    }

    /// Clears everything bound to the request just served. Bytes already
    /// buffered stay: they open the next request.
    fn reset_request(&mut self) {
        self.request.reset();
        self.parser.reset();
        self.response_sent = false;
    }

    /// Pulls everything available off the socket into the inbound buffer.
    fn fill_inbound(&mut self, client: &mut Socket) -> Result<(), crate::error::SysError> {
        loop {
            let mut chunk = [0u8; READ_CHUNK];
            match client.recv(&mut chunk)? {
                Progress::WouldBlock => return Ok(()),
                Progress::Ready(0) => return Ok(()),
                Progress::Ready(count) => self.inbound.extend_from_slice(&chunk[..count]),
            }
        }
    }

    /// Offers the request to the chain and ships whatever response comes
    /// back. A chain failure is answered with a synthetic 500; the
    /// connection itself stays usable.
    fn respond(&mut self, client: &mut Socket) {
        let response = match self.chain.handle(&mut self.request) {
            Ok(Some(response)) => Some(response),
            // The chain is waiting for more of the request.
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(peer = %self.request.peer(), error = %error, "middleware failed");
                Some(Response::new(Status::InternalServerError))
            }
        };
        let Some(mut response) = response else {
            return;
        };
        let status = response.status.code();
        if let Err(error) = writer::send(&mut response, client) {
            tracing::warn!(peer = %self.request.peer(), error = %error, "response write failed");
        }
        self.response_sent = true;
        self.request.set_cursor(0);
        tracing::info!(
            peer = %self.request.peer(),
            method = %self.request.method(),
            target = %self.request.uri(),
            status,
            "request completed"
        );
    }
}

impl ClientEvents for HttpConnection {
    fn connected(&mut self, client: &mut Socket) {
        self.request = ServerRequest::new(client.address().to_string());
        self.parser.reset();
        self.inbound.clear();
        self.response_sent = false;
    }

    fn data_available(&mut self, client: &mut Socket, half_closed: bool) -> bool {
        // Peer is gone and nothing is in flight: no point draining.
        if half_closed
            && self.request.state() == ParseState::RequestLine
            && self.parser.is_idle()
            && self.inbound.is_empty()
        {
            self.shutdown(client);
            return false;
        }

        if let Err(error) = self.fill_inbound(client) {
            tracing::debug!(peer = %self.request.peer(), error = %error, "receive failed");
            client.close();
            return false;
        }

        loop {
            let consumed = match self.parser.advance(&self.inbound, &mut self.request) {
                Ok(consumed) => consumed,
                Err(error) => {
                    tracing::debug!(peer = %self.request.peer(), error = %error, "request rejected");
                    let mut response = Response::new(Status::BadRequest);
                    let _ = writer::send(&mut response, client);
                    client.close();
                    return false;
                }
            };
            self.inbound.advance(consumed);

            if !self.response_sent && self.request.state() >= ParseState::Headers {
                self.respond(client);
                if client.is_invalid() {
                    return false;
                }
            }

            if self.response_sent && self.request.is_complete() {
                self.request.set_state(ParseState::Complete);
                self.reset_request();
                if !self.inbound.is_empty() {
                    // The next request is already buffered.
                    continue;
                }
            }
            break;
        }

        if half_closed {
            self.shutdown(client);
            return false;
        }
        !client.is_invalid()
    }

    fn shutdown(&mut self, _client: &mut Socket) {
        tracing::debug!(peer = %self.request.peer(), "peer closed its writing half");
    }
}
