//! Hand-rolled BSD socket layer.
//!
//! [`socket::Socket`] is a move-only endpoint around one OS handle;
//! [`addr::SocketAddress`] owns a resolver candidate; [`sys`] isolates the
//! few calls that differ per platform.

pub mod addr;
pub mod socket;
pub(crate) mod sys;

pub use addr::SocketAddress;
pub use socket::{Progress, Socket};
