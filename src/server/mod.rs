//! Connection scheduling: readiness multiplexing and client ownership.

pub mod locker;
pub mod poller;
pub mod reactor;

pub use locker::Locker;
pub use reactor::{ClientEvents, TcpReactor};
