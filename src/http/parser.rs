//! Incremental HTTP/1.1 request parsing.

use thiserror::Error;

use crate::http::message::Version;
use crate::http::request::{Method, ParseState, ServerRequest};
use crate::http::uri::{Uri, UriError};

/// Why a request could not be parsed. Any of these poisons the
/// connection: the byte stream is unrecoverable afterwards.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed request line")]
    InvalidRequestLine,
    #[error("unknown request method")]
    InvalidMethod,
    #[error("malformed protocol version")]
    InvalidVersion,
    #[error("malformed request target: {0}")]
    InvalidUri(#[from] UriError),
    #[error("malformed header line")]
    InvalidHeader,
    #[error("malformed content length")]
    InvalidContentLength,
    #[error("carriage return not followed by line feed")]
    StrayCarriageReturn,
}

enum Line {
    /// More bytes needed before the line terminator.
    Pending,
    /// A bare CRLF: either a tolerated leading one or the end of headers.
    Empty,
    /// A complete non-empty line sits in the buffer.
    Full,
}

/// Incremental parser state for one connection.
///
/// [`Parser::advance`] consumes as much of its input as the request's
/// parse state allows and can be resumed at any partition boundary: a
/// request fed one byte at a time parses identically to one fed whole.
#[derive(Debug, Default)]
pub struct Parser {
    line: Vec<u8>,
    loaded_body: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets partial progress ahead of a fresh request.
    pub fn reset(&mut self) {
        self.line.clear();
        self.loaded_body = 0;
    }

    /// No partial line or body bytes are pending.
    pub fn is_idle(&self) -> bool {
        self.line.is_empty() && self.loaded_body == 0
    }

    /// Feeds bytes into the parse, returning how many were consumed.
    ///
    /// Consumption stops once the request is complete; surplus input stays
    /// with the caller.
    pub fn advance(
        &mut self,
        input: &[u8],
        request: &mut ServerRequest,
    ) -> Result<usize, ParseError> {
        let mut consumed = 0;
        while request.state() < ParseState::Headers && consumed < input.len() {
            let byte = input[consumed];
            consumed += 1;
            match self.push_byte(byte)? {
                Line::Pending => {}
                Line::Empty => match request.state() {
                    // A leading CRLF before the request line is skipped.
                    ParseState::RequestLine => {}
                    _ => self.finish_head(request)?,
                },
                Line::Full => {
                    let line = std::mem::take(&mut self.line);
                    let text = String::from_utf8_lossy(&line);
                    if request.state() == ParseState::RequestLine {
                        self.parse_request_line(&text, request)?;
                        request.set_state(ParseState::HeaderLine);
                    } else {
                        self.parse_header_line(&text, request)?;
                    }
                }
            }
        }
        if request.state() == ParseState::Headers {
            consumed += self.load_body(&input[consumed..], request)?;
        }
        Ok(consumed)
    }

    fn push_byte(&mut self, byte: u8) -> Result<Line, ParseError> {
        if self.line.last() == Some(&b'\r') {
            if byte == b'\n' {
                self.line.pop();
                return Ok(if self.line.is_empty() {
                    Line::Empty
                } else {
                    Line::Full
                });
            }
            return Err(ParseError::StrayCarriageReturn);
        }
        self.line.push(byte);
        Ok(Line::Pending)
    }

    fn parse_request_line(
        &self,
        line: &str,
        request: &mut ServerRequest,
    ) -> Result<(), ParseError> {
        let mut tokens = line.split(' ').filter(|token| !token.is_empty());
        let (method, target, version) =
            match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
                (Some(method), Some(target), Some(version), None) => (method, target, version),
                _ => return Err(ParseError::InvalidRequestLine),
            };
        request.request.method = Method::from_str(method).ok_or(ParseError::InvalidMethod)?;
        request.request.uri = Uri::parse(target)?;
        request.request.version =
            Version::parse(version).ok_or(ParseError::InvalidVersion)?;
        Ok(())
    }

    fn parse_header_line(&self, line: &str, request: &mut ServerRequest) -> Result<(), ParseError> {
        let (name, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ParseError::InvalidHeader);
        }
        request.request.headers.append(name, value.trim());
        Ok(())
    }

    /// Ends the header block: with no declared body the request is already
    /// complete, otherwise body bytes are owed.
    fn finish_head(&mut self, request: &mut ServerRequest) -> Result<(), ParseError> {
        if self.content_length(request)? == 0 {
            request.set_state(ParseState::Body);
        } else {
            request.set_state(ParseState::Headers);
        }
        Ok(())
    }

    fn content_length(&self, request: &ServerRequest) -> Result<usize, ParseError> {
        match request
            .request
            .headers
            .get("content-length")
            .and_then(|values| values.first())
        {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ParseError::InvalidContentLength),
            None => Ok(0),
        }
    }

    fn load_body(&mut self, input: &[u8], request: &mut ServerRequest) -> Result<usize, ParseError> {
        let declared = self.content_length(request)?;
        let wanted = declared.saturating_sub(self.loaded_body).min(input.len());
        request.request.body.extend_from_slice(&input[..wanted]);
        self.loaded_body += wanted;
        if self.loaded_body >= declared {
            request.set_state(ParseState::Body);
        }
        Ok(wanted)
    }
}
