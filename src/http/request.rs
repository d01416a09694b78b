//! Requests as the server sees them.

use std::fmt;

use bytes::BytesMut;

use crate::http::message::{Headers, Version};
use crate::http::uri::Uri;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Purge,
    Options,
    Trace,
    Connect,
}

impl Method {
    /// Parses the wire form; method names are case-sensitive.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "HEAD" => Some(Method::Head),
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "PATCH" => Some(Method::Patch),
            "DELETE" => Some(Method::Delete),
            "PURGE" => Some(Method::Purge),
            "OPTIONS" => Some(Method::Options),
            "TRACE" => Some(Method::Trace),
            "CONNECT" => Some(Method::Connect),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Head => "HEAD",
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Purge => "PURGE",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One HTTP request, possibly still arriving.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: Headers,
    pub body: BytesMut,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: Method::Get,
            uri: Uri::default(),
            version: Version::default(),
            headers: Headers::new(),
            body: BytesMut::new(),
        }
    }
}

impl Request {
    /// The comma-joined line for a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get_line(name)
    }
}

/// Progress of the incremental request parse, in advancing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParseState {
    /// Consuming the request line.
    RequestLine,
    /// Consuming header lines until the empty terminator.
    HeaderLine,
    /// Header block done; declared body bytes still owed.
    Headers,
    /// All declared body bytes arrived; the request can be served.
    Body,
    /// Served; the connection is about to reset for the next request.
    Complete,
}

/// A request in the context of one server connection: the parse progress,
/// the peer it came from, and the middleware chain position.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    pub request: Request,
    state: ParseState,
    peer: String,
    cursor: usize,
}

impl ServerRequest {
    pub fn new(peer: impl Into<String>) -> Self {
        Self {
            request: Request::default(),
            state: ParseState::RequestLine,
            peer: peer.into(),
            cursor: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ParseState) {
        self.state = state;
    }

    /// All declared bytes have arrived.
    pub fn is_complete(&self) -> bool {
        self.state >= ParseState::Body
    }

    /// Rendered address of the connected peer.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    pub fn uri(&self) -> &Uri {
        &self.request.uri
    }

    pub fn headers(&self) -> &Headers {
        &self.request.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.request.body
    }

    /// Position of the middleware chain for this request.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    /// Forgets everything and awaits a fresh request line. The peer stays.
    pub fn reset(&mut self) {
        self.request = Request::default();
        self.state = ParseState::RequestLine;
        self.cursor = 0;
    }
}
