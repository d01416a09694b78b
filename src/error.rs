//! Error taxonomy for the server.
//!
//! Four kinds of failure flow through the crate:
//!
//! - [`SysError`]: an OS call failed; carries the raw error code and
//!   formats the message lazily.
//! - [`AddrInfoError`]: name/service resolution failed.
//! - [`HttpError`]: a failure that maps directly onto a response status.
//! - [`Error::Runtime`]: a formatted internal failure.

use std::ffi::CStr;
use std::fmt;
use std::io;
use std::sync::Mutex;

use thiserror::Error;

use crate::http::response::Status;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of an OS call.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct SysError {
    code: i32,
    source: io::Error,
}

impl SysError {
    /// Captures the calling thread's last OS error.
    pub fn last() -> Self {
        let source = io::Error::last_os_error();
        Self {
            code: source.raw_os_error().unwrap_or(-1),
            source,
        }
    }

    /// Wraps an error code obtained elsewhere, e.g. from `SO_ERROR`.
    pub fn from_code(code: i32) -> Self {
        Self {
            code,
            source: io::Error::from_raw_os_error(code),
        }
    }

    /// The raw OS error code.
    pub fn code(&self) -> i32 {
        self.code
    }
}

/// Failure reported by the name/service resolver.
#[derive(Debug)]
pub struct AddrInfoError {
    code: i32,
}

impl AddrInfoError {
    pub fn new(code: i32) -> Self {
        Self { code }
    }

    /// The raw resolver result code.
    pub fn code(&self) -> i32 {
        self.code
    }

    fn message(&self) -> String {
        // gai_strerror is not reentrant on every platform; lookups are
        // serialized process-wide.
        static LOOKUP: Mutex<()> = Mutex::new(());
        let _guard = LOOKUP.lock().unwrap_or_else(|e| e.into_inner());
        let message = unsafe { CStr::from_ptr(libc::gai_strerror(self.code)) };
        message.to_string_lossy().into_owned()
    }
}

impl fmt::Display for AddrInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AddrInfoError {}

/// A failure that carries the HTTP status it should be answered with.
#[derive(Debug)]
pub struct HttpError {
    status: Status,
    reason: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HttpError {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            reason: None,
            source: None,
        }
    }

    /// Attaches a reason phrase overriding the canonical one.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the upstream cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// The overriding reason phrase, or the canonical one for the status.
    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or_else(|| self.status.reason())
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.code(), self.reason())
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn std::error::Error + 'static))
    }
}

/// Umbrella error for server operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sys(#[from] SysError),
    #[error(transparent)]
    AddrInfo(#[from] AddrInfoError),
    #[error(transparent)]
    Http(#[from] HttpError),
    /// Formatted internal failure, e.g. an exhausted middleware chain.
    #[error("{0}")]
    Runtime(String),
}
