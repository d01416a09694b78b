//! Platform shim for the socket layer.
//!
//! Everything conditional on the target OS funnels through three entry
//! points: errno classification, non-blocking accept, and the raw close.

use std::os::unix::io::RawFd;

/// Tests whether an error code means "retry when readiness is signaled".
pub fn is_would_block(code: i32) -> bool {
    code == libc::EWOULDBLOCK || code == libc::EAGAIN
}

/// Tests whether an error code means a non-blocking connect is underway.
pub fn is_in_progress(code: i32) -> bool {
    code == libc::EINPROGRESS
}

/// Accepts a pending connection, atomically non-blocking when requested.
#[cfg(target_os = "linux")]
pub fn accept(
    fd: RawFd,
    addr: *mut libc::sockaddr,
    len: *mut libc::socklen_t,
    non_blocking: bool,
) -> RawFd {
    let flags = if non_blocking { libc::SOCK_NONBLOCK } else { 0 };
    unsafe { libc::accept4(fd, addr, len, flags) }
}

/// Accepts a pending connection; without accept4 the non-blocking mode is
/// applied with a follow-up fcntl.
#[cfg(not(target_os = "linux"))]
pub fn accept(
    fd: RawFd,
    addr: *mut libc::sockaddr,
    len: *mut libc::socklen_t,
    non_blocking: bool,
) -> RawFd {
    let client = unsafe { libc::accept(fd, addr, len) };
    if client >= 0 && non_blocking {
        let flags = unsafe { libc::fcntl(client, libc::F_GETFL, 0) };
        if flags < 0
            || unsafe { libc::fcntl(client, libc::F_SETFL, flags | libc::O_NONBLOCK) } != 0
        {
            unsafe { libc::close(client) };
            return -1;
        }
    }
    client
}

/// Closes a raw handle. Callers guarantee they close each handle once.
pub fn close(fd: RawFd) {
    unsafe { libc::close(fd) };
}
