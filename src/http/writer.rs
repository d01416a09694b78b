//! Response serialization and delivery.

use crate::error::Error;
use crate::http::response::Response;
use crate::net::socket::{Progress, Socket};

/// Renders the response envelope and body into wire bytes.
///
/// `Content-Length` is forced to the body size. Header names go out
/// lowercased with multi-values joined by commas.
pub fn serialize(response: &mut Response) -> Vec<u8> {
    response
        .headers
        .set("content-length", response.body.len().to_string());

    let mut wire = Vec::with_capacity(128 + response.body.len());
    wire.extend_from_slice(
        format!(
            "{} {} {}\r\n",
            response.version,
            response.status.code(),
            response.reason()
        )
        .as_bytes(),
    );
    for (name, values) in response.headers.iter() {
        wire.extend_from_slice(name.as_bytes());
        wire.push(b':');
        wire.extend_from_slice(values.join(",").as_bytes());
        wire.extend_from_slice(b"\r\n");
    }
    wire.extend_from_slice(b"\r\n");
    wire.extend_from_slice(&response.body);
    wire
}

/// Writes the whole response, riding out short writes.
///
/// A write failure closes the client: a partly sent response cannot be
/// retracted.
pub fn send(response: &mut Response, client: &mut Socket) -> Result<(), Error> {
    let wire = serialize(response);
    let mut written = 0;
    while written < wire.len() {
        match client.send(&wire[written..]) {
            Ok(Progress::Ready(0)) => {
                client.close();
                return Err(Error::Runtime(
                    "connection closed while writing response".into(),
                ));
            }
            Ok(Progress::Ready(count)) => written += count,
            Ok(Progress::WouldBlock) => std::thread::yield_now(),
            Err(err) => {
                client.close();
                return Err(err.into());
            }
        }
    }
    Ok(())
}
