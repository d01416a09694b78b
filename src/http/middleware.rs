//! The middleware chain.
//!
//! A request travels an ordered list of middleware. Each middleware may
//! answer on its own, delegate to the rest of the chain through the
//! [`Handler`] it is given, or report that it cannot answer until more of
//! the request has arrived. The chain position lives on the request, so a
//! half-parsed request suspends and resumes exactly where it left off.

use crate::error::{Error, Result};
use crate::http::request::ServerRequest;
use crate::http::response::{Response, Status};

/// Delegation point a middleware uses to pass the request onward.
pub trait Handler {
    /// Asks the rest of the chain for a response. `Ok(None)` means the
    /// chain is waiting for more request data.
    fn handle(&self, request: &mut ServerRequest) -> Result<Option<Response>>;
}

/// One component of the processing chain.
pub trait Middleware: Send + Sync {
    /// Produces a response, delegates through `next`, or returns
    /// `Ok(None)` to be re-invoked once more of the request has arrived.
    fn process(&self, request: &mut ServerRequest, next: &dyn Handler)
        -> Result<Option<Response>>;
}

/// Ordered middleware list; doubles as the [`Handler`] that walks it.
#[derive(Default)]
pub struct MiddlewareChain {
    entries: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware to the end of the chain.
    pub fn push(&mut self, middleware: impl Middleware + 'static) {
        self.entries.push(Box::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Handler for MiddlewareChain {
    /// Invokes the middleware under the request's cursor.
    ///
    /// The cursor advances past the entry before it runs; when the entry
    /// reports "no response yet" the cursor rewinds so the same entry is
    /// asked again on the next readiness event.
    fn handle(&self, request: &mut ServerRequest) -> Result<Option<Response>> {
        let position = request.cursor();
        let entry = self
            .entries
            .get(position)
            .ok_or_else(|| Error::Runtime("middleware stack exhausted".into()))?;
        request.set_cursor(position + 1);
        let outcome = entry.process(request, self)?;
        if outcome.is_none() {
            request.set_cursor(position);
        }
        Ok(outcome)
    }
}

/// Catches failures from the rest of the chain and renders them as
/// responses: an HTTP-typed failure keeps its status and reports its text
/// as the body, anything else becomes a 500.
pub struct ErrorHandler;

impl Middleware for ErrorHandler {
    fn process(
        &self,
        request: &mut ServerRequest,
        next: &dyn Handler,
    ) -> Result<Option<Response>> {
        match next.handle(request) {
            Ok(outcome) => Ok(outcome),
            Err(Error::Http(error)) => Ok(Some(
                Response::new(error.status()).with_body(error.to_string()),
            )),
            Err(error) => Ok(Some(
                Response::new(Status::InternalServerError).with_body(error.to_string()),
            )),
        }
    }
}
