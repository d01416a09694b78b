//! Rampart - a multithreaded HTTP/1.1 server on a readiness-driven TCP
//! reactor.
//!
//! The crate splits into three layers:
//!
//! - [`net`]: a move-only wrapper over the BSD socket calls plus the
//!   resolver, with would-block reported as a value rather than an error.
//! - [`server`]: the reactor - an epoll loop with one-shot client arming
//!   that any number of worker threads may enter, serializing per-client
//!   work through [`server::locker::Locker`].
//! - [`http`]: the incremental request parser, the middleware chain, and
//!   response serialization.

pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod server;
