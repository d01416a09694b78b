use std::sync::Arc;
use std::thread;

use rampart::config::Config;
use rampart::http::middleware::{ErrorHandler, Handler, Middleware};
use rampart::http::request::ServerRequest;
use rampart::http::response::Response;
use rampart::http::server::HttpServer;

/// Answers every request with a greeting.
struct Hello;

impl Middleware for Hello {
    fn process(
        &self,
        _request: &mut ServerRequest,
        _next: &dyn Handler,
    ) -> rampart::error::Result<Option<Response>> {
        Ok(Some(Response::ok("Hello\n")))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let cfg = Config::load();

    let mut server = HttpServer::bind(cfg.family, cfg.host.as_deref(), &cfg.service, cfg.reuse_addr)?;
    server.add_middleware(ErrorHandler)?;
    server.add_middleware(Hello)?;
    server.initialize(cfg.backlog)?;
    tracing::info!(address = %server.local_address()?, workers = cfg.workers, "listening");

    let server = Arc::new(server);
    let mut workers = Vec::new();
    for _ in 1..cfg.workers {
        let server = Arc::clone(&server);
        workers.push(thread::spawn(move || server.run()));
    }
    let result = server.run();
    for worker in workers {
        match worker.join() {
            Ok(outcome) => outcome?,
            Err(_) => anyhow::bail!("worker thread panicked"),
        }
    }
    result?;
    Ok(())
}
