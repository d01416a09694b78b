use rampart::http::parser::{ParseError, Parser};
use rampart::http::request::{Method, ParseState, ServerRequest};

fn parse_all(input: &[u8]) -> Result<ServerRequest, ParseError> {
    let mut parser = Parser::new();
    let mut request = ServerRequest::new("test");
    parser.advance(input, &mut request)?;
    Ok(request)
}

/// Feeds the input in chunks of the given size, as readiness edges would.
fn parse_chunked(input: &[u8], chunk: usize) -> Result<ServerRequest, ParseError> {
    let mut parser = Parser::new();
    let mut request = ServerRequest::new("test");
    for piece in input.chunks(chunk) {
        let mut piece = piece;
        while !piece.is_empty() {
            let consumed = parser.advance(piece, &mut request)?;
            if consumed == 0 {
                break;
            }
            piece = &piece[consumed..];
        }
    }
    Ok(request)
}

#[test]
fn test_parse_simple_get_request() {
    let request = parse_all(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();

    assert_eq!(request.method(), Method::Get);
    assert_eq!(request.uri().path(), "/");
    assert_eq!(request.headers().get_line("host").unwrap(), "example.com");
    assert_eq!(request.state(), ParseState::Body);
    assert!(request.is_complete());
}

#[test]
fn test_parse_post_with_body() {
    let request =
        parse_all(b"POST /api HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello").unwrap();

    assert_eq!(request.method(), Method::Post);
    assert_eq!(request.uri().path(), "/api");
    assert_eq!(request.body(), b"hello");
    assert!(request.is_complete());
}

#[test]
fn test_parser_is_resumable_at_any_boundary() {
    let input = b"POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 3\r\n\r\nabc";
    let whole = parse_all(input).unwrap();

    for chunk in [1, 2, 3, 7, input.len()] {
        let pieced = parse_chunked(input, chunk).unwrap();
        assert_eq!(pieced.method(), whole.method());
        assert_eq!(pieced.uri(), whole.uri());
        assert_eq!(pieced.body(), whole.body());
        assert_eq!(
            pieced.headers().get_line("content-length"),
            whole.headers().get_line("content-length")
        );
        assert_eq!(pieced.state(), whole.state());
    }
}

#[test]
fn test_leading_crlf_is_skipped() {
    let request = parse_all(b"\r\n\r\nGET / HTTP/1.1\r\n\r\n").unwrap();

    assert_eq!(request.method(), Method::Get);
    assert!(request.is_complete());
}

#[test]
fn test_headers_accumulate_repeated_names() {
    let request = parse_all(
        b"GET / HTTP/1.1\r\nAccept: text/html\r\nAccept: text/plain\r\n\r\n",
    )
    .unwrap();

    assert_eq!(
        request.headers().get("accept").unwrap(),
        ["text/html", "text/plain"]
    );
}

#[test]
fn test_header_names_and_values_are_trimmed() {
    let request = parse_all(b"GET / HTTP/1.1\r\n  Host  :  example.com  \r\n\r\n").unwrap();

    assert_eq!(request.headers().get_line("host").unwrap(), "example.com");
}

#[test]
fn test_zero_content_length_completes_at_headers_end() {
    let request = parse_all(b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n").unwrap();

    assert_eq!(request.state(), ParseState::Body);
    assert!(request.body().is_empty());
}

#[test]
fn test_partial_body_waits_in_headers_state() {
    let mut parser = Parser::new();
    let mut request = ServerRequest::new("test");
    parser
        .advance(b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\nab", &mut request)
        .unwrap();

    assert_eq!(request.state(), ParseState::Headers);
    assert!(!request.is_complete());

    parser.advance(b"cd", &mut request).unwrap();
    assert_eq!(request.state(), ParseState::Body);
    assert_eq!(request.body(), b"abcd");
}

#[test]
fn test_surplus_bytes_stay_unconsumed() {
    let mut parser = Parser::new();
    let mut request = ServerRequest::new("test");
    let input = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nokEXTRA";
    let consumed = parser.advance(input, &mut request).unwrap();

    assert_eq!(&input[consumed..], b"EXTRA");
    assert_eq!(request.body(), b"ok");
}

#[test]
fn test_garbage_request_line_is_rejected() {
    assert!(matches!(
        parse_all(b"GARBAGE\r\n"),
        Err(ParseError::InvalidRequestLine)
    ));
}

#[test]
fn test_unknown_method_is_rejected() {
    assert!(matches!(
        parse_all(b"FROB / HTTP/1.1\r\n\r\n"),
        Err(ParseError::InvalidMethod)
    ));
}

#[test]
fn test_bad_version_is_rejected() {
    assert!(matches!(
        parse_all(b"GET / HTTP/one\r\n\r\n"),
        Err(ParseError::InvalidVersion)
    ));
}

#[test]
fn test_header_without_colon_is_rejected() {
    assert!(matches!(
        parse_all(b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n"),
        Err(ParseError::InvalidHeader)
    ));
}

#[test]
fn test_non_numeric_content_length_is_rejected() {
    assert!(matches!(
        parse_all(b"POST / HTTP/1.1\r\nContent-Length: many\r\n\r\n"),
        Err(ParseError::InvalidContentLength)
    ));
}

#[test]
fn test_lone_carriage_return_is_rejected() {
    assert!(matches!(
        parse_all(b"GET / HTTP/1.1\rX"),
        Err(ParseError::StrayCarriageReturn)
    ));
}

#[test]
fn test_ten_methods_parse() {
    for (name, method) in [
        ("HEAD", Method::Head),
        ("GET", Method::Get),
        ("POST", Method::Post),
        ("PUT", Method::Put),
        ("PATCH", Method::Patch),
        ("DELETE", Method::Delete),
        ("PURGE", Method::Purge),
        ("OPTIONS", Method::Options),
        ("TRACE", Method::Trace),
        ("CONNECT", Method::Connect),
    ] {
        let input = format!("{} / HTTP/1.1\r\n\r\n", name);
        let request = parse_all(input.as_bytes()).unwrap();
        assert_eq!(request.method(), method);
    }
}
