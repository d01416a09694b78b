use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rampart::error::{Error, HttpError, Result};
use rampart::http::middleware::{ErrorHandler, Handler, Middleware, MiddlewareChain};
use rampart::http::parser::Parser;
use rampart::http::request::ServerRequest;
use rampart::http::response::{Response, Status};

/// Tags responses on the way through, then delegates.
struct Tag(&'static str);

impl Middleware for Tag {
    fn process(&self, request: &mut ServerRequest, next: &dyn Handler) -> Result<Option<Response>> {
        let response = next.handle(request)?;
        Ok(response.map(|mut response| {
            response.headers.append("x-tag", self.0);
            response
        }))
    }
}

struct Hello;

impl Middleware for Hello {
    fn process(&self, _: &mut ServerRequest, _: &dyn Handler) -> Result<Option<Response>> {
        Ok(Some(Response::ok("Hello")))
    }
}

struct Boom;

impl Middleware for Boom {
    fn process(&self, _: &mut ServerRequest, _: &dyn Handler) -> Result<Option<Response>> {
        Err(Error::Runtime("boom".into()))
    }
}

struct Teapot;

impl Middleware for Teapot {
    fn process(&self, _: &mut ServerRequest, _: &dyn Handler) -> Result<Option<Response>> {
        Err(HttpError::new(Status::ImATeapot).into())
    }
}

/// Refuses to answer until the whole request has arrived.
struct BodyGate;

impl Middleware for BodyGate {
    fn process(&self, request: &mut ServerRequest, next: &dyn Handler) -> Result<Option<Response>> {
        if !request.is_complete() {
            return Ok(None);
        }
        next.handle(request)
    }
}

struct Counting(Arc<AtomicUsize>);

impl Middleware for Counting {
    fn process(&self, _: &mut ServerRequest, _: &dyn Handler) -> Result<Option<Response>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Response::ok("counted")))
    }
}

fn request() -> ServerRequest {
    ServerRequest::new("test")
}

#[test]
fn test_chain_runs_in_order_and_short_circuits() {
    let mut chain = MiddlewareChain::new();
    chain.push(Tag("outer"));
    chain.push(Hello);
    chain.push(Tag("unreached"));

    let mut request = request();
    let response = chain.handle(&mut request).unwrap().unwrap();

    assert_eq!(response.body.as_ref(), b"Hello");
    assert_eq!(response.headers.get("x-tag").unwrap(), ["outer"]);
}

#[test]
fn test_exhausted_chain_is_a_runtime_error() {
    let chain = MiddlewareChain::new();
    let mut request = request();

    let error = chain.handle(&mut request).unwrap_err();
    assert!(matches!(error, Error::Runtime(_)));
    assert!(error.to_string().contains("exhausted"));
}

#[test]
fn test_cursor_advances_past_answering_middleware() {
    let mut chain = MiddlewareChain::new();
    chain.push(Hello);

    let mut request = request();
    assert_eq!(request.cursor(), 0);
    chain.handle(&mut request).unwrap().unwrap();
    assert_eq!(request.cursor(), 1);
}

#[test]
fn test_pending_middleware_rewinds_the_cursor() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut chain = MiddlewareChain::new();
    chain.push(BodyGate);
    chain.push(Counting(Arc::clone(&counter)));

    let mut parser = Parser::new();
    let mut request = request();
    parser
        .advance(
            b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\na",
            &mut request,
        )
        .unwrap();

    // Headers are in but the body is not; the gate cannot answer yet.
    let outcome = chain.handle(&mut request).unwrap();
    assert!(outcome.is_none());
    assert_eq!(request.cursor(), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    // The rest of the body arrives; the same gate runs again and lets the
    // request through.
    parser.advance(b"bc", &mut request).unwrap();
    let response = chain.handle(&mut request).unwrap().unwrap();
    assert_eq!(response.status, Status::Ok);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_error_handler_reports_http_errors_with_their_status() {
    let mut chain = MiddlewareChain::new();
    chain.push(ErrorHandler);
    chain.push(Teapot);

    let mut request = request();
    let response = chain.handle(&mut request).unwrap().unwrap();

    assert_eq!(response.status, Status::ImATeapot);
    assert_eq!(response.body.as_ref(), b"418 I'm a teapot");
}

#[test]
fn test_error_handler_maps_other_errors_to_500() {
    let mut chain = MiddlewareChain::new();
    chain.push(ErrorHandler);
    chain.push(Boom);

    let mut request = request();
    let response = chain.handle(&mut request).unwrap().unwrap();

    assert_eq!(response.status, Status::InternalServerError);
    assert_eq!(response.body.as_ref(), b"boom");
}

#[test]
fn test_fresh_request_starts_at_the_chain_head() {
    let mut chain = MiddlewareChain::new();
    chain.push(Hello);

    let mut request = request();
    chain.handle(&mut request).unwrap().unwrap();
    assert_eq!(request.cursor(), 1);

    request.reset();
    assert_eq!(request.cursor(), 0);
    let response = chain.handle(&mut request).unwrap().unwrap();
    assert_eq!(response.status, Status::Ok);
}
