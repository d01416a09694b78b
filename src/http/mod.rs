//! HTTP/1.1 protocol implementation.
//!
//! The layer is organized into:
//!
//! - **`message`**: pieces shared by requests and responses - the protocol
//!   version and the case-insensitive header map
//! - **`uri`**: the decomposed request target
//! - **`request`** / **`response`**: the message types themselves
//! - **`parser`**: the incremental request parser, resumable at any byte
//!   boundary
//! - **`middleware`**: the ordered processing chain and its cursor rules
//! - **`writer`**: response serialization and delivery
//! - **`connection`**: per-connection state gluing parser, chain and
//!   writer together under the reactor
//! - **`server`**: the user-facing facade

pub mod connection;
pub mod message;
pub mod middleware;
pub mod parser;
pub mod request;
pub mod response;
pub mod server;
pub mod uri;
pub mod writer;
