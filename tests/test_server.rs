//! End-to-end scenarios over real sockets.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rampart::error::{Error, Result};
use rampart::http::middleware::{ErrorHandler, Handler, Middleware};
use rampart::http::request::{Method, ServerRequest};
use rampart::http::response::Response;
use rampart::http::server::HttpServer;

struct Hello;

impl Middleware for Hello {
    fn process(&self, _: &mut ServerRequest, _: &dyn Handler) -> Result<Option<Response>> {
        Ok(Some(Response::ok("Hello")))
    }
}

struct Boom;

impl Middleware for Boom {
    fn process(&self, _: &mut ServerRequest, _: &dyn Handler) -> Result<Option<Response>> {
        Err(Error::Runtime("kaput".into()))
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

/// Waits for the full request, records it, answers 200.
struct Recorder(Arc<Mutex<Vec<(Method, String, Vec<u8>)>>>);

impl Middleware for Recorder {
    fn process(&self, request: &mut ServerRequest, _: &dyn Handler) -> Result<Option<Response>> {
        if !request.is_complete() {
            return Ok(None);
        }
        self.0.lock().unwrap().push((
            request.method(),
            request.uri().to_string(),
            request.body().to_vec(),
        ));
        Ok(Some(Response::ok("Hello")))
    }
}

struct Counting(Arc<AtomicUsize>);

impl Middleware for Counting {
    fn process(&self, _: &mut ServerRequest, _: &dyn Handler) -> Result<Option<Response>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Response::ok("Hello")))
    }
}

/// Boots a server on an ephemeral port with two worker threads and returns
/// its address. The workers run until the test process exits.
fn start(build: impl FnOnce(&mut HttpServer)) -> String {
    let mut server = HttpServer::bind(libc::AF_INET, Some("127.0.0.1"), "0", true).unwrap();
    build(&mut server);
    server.initialize(16).unwrap();
    let local = server.local_address().unwrap();
    let addr = format!(
        "{}:{}",
        local.host(libc::NI_NUMERICHOST).unwrap(),
        local.service(libc::NI_NUMERICSERV).unwrap()
    );
    let server = Arc::new(server);
    for _ in 0..2 {
        let server = Arc::clone(&server);
        thread::spawn(move || {
            let _ = server.run();
        });
    }
    addr
}

/// Reads one full response: the head as text plus exactly Content-Length
/// body bytes.
fn read_response(stream: &mut TcpStream) -> (String, Vec<u8>) {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    let split = loop {
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let count = stream.read(&mut buf).unwrap();
        assert!(count > 0, "connection closed before response head");
        raw.extend_from_slice(&buf[..count]);
    };
    let head = String::from_utf8(raw[..split].to_vec()).unwrap();
    let mut body = raw[split + 4..].to_vec();
    let length: usize = head
        .split("\r\n")
        .find_map(|line| line.strip_prefix("content-length:"))
        .expect("response has no content-length")
        .trim()
        .parse()
        .unwrap();
    while body.len() < length {
        let count = stream.read(&mut buf).unwrap();
        assert!(count > 0, "connection closed before response body");
        body.extend_from_slice(&buf[..count]);
    }
    (head, body)
}

#[test]
fn test_simple_get_round_trip() {
    let addr = start(|server| server.add_middleware(Hello).unwrap());
    let mut stream = TcpStream::connect(&addr).unwrap();

    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
        .unwrap();
    let (head, body) = read_response(&mut stream);

    assert!(head.starts_with("HTTP/1.1 200 OK"), "head: {}", head);
    assert!(head.contains("\r\ncontent-length:5"), "head: {}", head);
    assert_eq!(body, b"Hello");
}

#[test]
fn test_leading_blank_lines_are_tolerated() {
    let addr = start(|server| server.add_middleware(Hello).unwrap());
    let mut stream = TcpStream::connect(&addr).unwrap();

    stream
        .write_all(b"\r\n\r\nGET / HTTP/1.1\r\n\r\n")
        .unwrap();
    let (head, body) = read_response(&mut stream);

    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(body, b"Hello");
}

#[test]
fn test_request_dripped_one_byte_at_a_time() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let addr = start(|server| {
        server.add_middleware(Recorder(Arc::clone(&seen))).unwrap();
    });
    let mut stream = TcpStream::connect(&addr).unwrap();

    for &byte in b"POST /x HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc" {
        stream.write_all(&[byte]).unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(3));
    }
    let (head, body) = read_response(&mut stream);

    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(body, b"Hello");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1, "middleware ran more than once");
    let (method, target, request_body) = &seen[0];
    assert_eq!(*method, Method::Post);
    assert_eq!(target, "/x");
    assert_eq!(request_body, b"abc");
}

#[test]
fn test_garbage_request_gets_400_and_close() {
    let addr = start(|server| server.add_middleware(Hello).unwrap());
    let mut stream = TcpStream::connect(&addr).unwrap();

    stream.write_all(b"GARBAGE\r\n").unwrap();
    let (head, body) = read_response(&mut stream);

    assert!(head.starts_with("HTTP/1.1 400 Bad Request"), "head: {}", head);
    assert!(body.is_empty());

    // The server hangs up after a protocol error.
    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_middleware_failure_yields_500_and_connection_survives() {
    let addr = start(|server| {
        server.add_middleware(ErrorHandler).unwrap();
        server.add_middleware(Boom).unwrap();
    });
    let mut stream = TcpStream::connect(&addr).unwrap();

    stream.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
    let (head, body) = read_response(&mut stream);

    assert!(head.starts_with("HTTP/1.1 500"), "head: {}", head);
    assert_eq!(body, b"kaput");

    // Same connection takes another request.
    stream.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
    let (head, body) = read_response(&mut stream);
    assert!(head.starts_with("HTTP/1.1 500"));
    assert_eq!(body, b"kaput");
}

#[test]
fn test_gated_request_across_two_edges_answers_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let addr = start(|server| {
        server.add_middleware(BodyGate).unwrap();
        server.add_middleware(Counting(Arc::clone(&count))).unwrap();
    });
    let mut stream = TcpStream::connect(&addr).unwrap();

    stream
        .write_all(b"POST /x HTTP/1.1\r\nContent-Length: 3\r\n\r\n")
        .unwrap();
    stream.flush().unwrap();
    thread::sleep(Duration::from_millis(200));
    stream.write_all(b"abc").unwrap();

    let (head, body) = read_response(&mut stream);
    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(body, b"Hello");
    assert_eq!(count.load(Ordering::SeqCst), 1, "handler ran more than once");

    // Exactly one response: nothing else shows up.
    stream
        .set_read_timeout(Some(Duration::from_millis(300)))
        .unwrap();
    let mut buf = [0u8; 16];
    match stream.read(&mut buf) {
        Ok(0) => {}
        Ok(count) => panic!("unexpected extra bytes: {:?}", &buf[..count]),
        Err(err) => assert!(
            matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut),
            "unexpected error {}",
            err
        ),
    }
}

#[test]
fn test_sequential_requests_on_one_connection() {
    let addr = start(|server| server.add_middleware(Hello).unwrap());
    let mut stream = TcpStream::connect(&addr).unwrap();

    for _ in 0..3 {
        stream
            .write_all(b"GET /again HTTP/1.1\r\nHost: x\r\n\r\n")
            .unwrap();
        let (head, body) = read_response(&mut stream);
        assert!(head.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(body, b"Hello");
    }
}

#[test]
fn test_many_concurrent_connections() {
    let addr = start(|server| server.add_middleware(Hello).unwrap());

    let mut clients = Vec::new();
    for _ in 0..16 {
        let addr = addr.clone();
        clients.push(thread::spawn(move || {
            let mut stream = TcpStream::connect(&addr).unwrap();
            stream
                .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
                .unwrap();
            let (head, body) = read_response(&mut stream);
            assert!(head.starts_with("HTTP/1.1 200 OK"));
            assert_eq!(body, b"Hello");
        }));
    }
    for client in clients {
        client.join().unwrap();
    }
}
