//! Server configuration from the environment.

use std::env;

/// Runtime options, loaded once at startup.
///
/// | Variable | Meaning | Default |
/// |----------|---------|---------|
/// | `RAMPART_FAMILY` | `ipv4`, `ipv6` or `any` | `any` |
/// | `RAMPART_HOST` | bind host; unset binds the wildcard address | unset |
/// | `RAMPART_SERVICE` | bind service name or port | `8080` |
/// | `RAMPART_REUSE_ADDR` | set `SO_REUSEADDR` before bind | `true` |
/// | `RAMPART_BACKLOG` | listen backlog | `SOMAXCONN` |
/// | `RAMPART_WORKERS` | reactor worker threads | available parallelism |
#[derive(Debug, Clone)]
pub struct Config {
    pub family: i32,
    pub host: Option<String>,
    pub service: String,
    pub reuse_addr: bool,
    pub backlog: i32,
    pub workers: usize,
}

impl Config {
    pub fn load() -> Self {
        let family = match env::var("RAMPART_FAMILY").as_deref() {
            Ok("ipv4") => libc::AF_INET,
            Ok("ipv6") => libc::AF_INET6,
            _ => libc::AF_UNSPEC,
        };
        let host = env::var("RAMPART_HOST").ok();
        let service = env::var("RAMPART_SERVICE").unwrap_or_else(|_| "8080".to_string());
        let reuse_addr = env::var("RAMPART_REUSE_ADDR")
            .map(|value| value != "false" && value != "0")
            .unwrap_or(true);
        let backlog = env::var("RAMPART_BACKLOG")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(libc::SOMAXCONN);
        let workers = env::var("RAMPART_WORKERS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });
        Self {
            family,
            host,
            service,
            reuse_addr,
            backlog,
            workers,
        }
    }
}
