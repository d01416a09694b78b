//! The HTTP server facade.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::http::connection::HttpConnection;
use crate::http::middleware::{Middleware, MiddlewareChain};
use crate::net::addr::SocketAddress;
use crate::net::socket;
use crate::server::reactor::TcpReactor;

/// An HTTP/1.1 server: a TCP reactor whose clients speak the middleware
/// chain.
///
/// # Example
///
/// ```ignore
/// let mut server = HttpServer::bind(libc::AF_INET, None, "8080", true)?;
/// server.add_middleware(ErrorHandler)?;
/// server.add_middleware(Hello)?;
/// server.initialize(128)?;
/// server.run()?; // spawn from more threads for more workers
/// ```
pub struct HttpServer {
    reactor: TcpReactor,
    chain: Arc<MiddlewareChain>,
}

impl HttpServer {
    /// Binds a non-blocking listening socket for the given address family,
    /// host and service, and wraps it in a reactor.
    ///
    /// A `None` host binds the wildcard address.
    pub fn bind(family: i32, host: Option<&str>, service: &str, reuse: bool) -> Result<Self> {
        let listener = socket::bound(
            family,
            libc::SOCK_STREAM,
            libc::IPPROTO_TCP,
            host,
            service,
            true,
            reuse,
        )?;
        Ok(Self {
            reactor: TcpReactor::new(listener)?,
            chain: Arc::new(MiddlewareChain::new()),
        })
    }

    /// Appends a middleware to the chain.
    ///
    /// Only callable until [`HttpServer::initialize`] freezes the chain.
    pub fn add_middleware(&mut self, middleware: impl Middleware + 'static) -> Result<()> {
        Arc::get_mut(&mut self.chain)
            .ok_or_else(|| Error::Runtime("middleware chain is frozen".into()))?
            .push(middleware);
        Ok(())
    }

    /// Starts listening and freezes the middleware chain.
    pub fn initialize(&mut self, backlog: i32) -> Result<()> {
        let chain = Arc::clone(&self.chain);
        self.reactor.initialize(
            backlog,
            Box::new(move || Box::new(HttpConnection::new(Arc::clone(&chain)))),
        )
    }

    /// The address actually bound, with an OS-assigned port resolved.
    pub fn local_address(&self) -> Result<SocketAddress> {
        self.reactor.local_address()
    }

    /// Enters the readiness loop; call from as many threads as you want
    /// worker parallelism.
    pub fn run(&self) -> Result<()> {
        self.reactor.run()
    }
}
