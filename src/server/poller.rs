//! Readiness multiplexing over epoll.

use std::os::unix::io::RawFd;

use crate::error::SysError;
use crate::net::sys;

/// Interest set for client connections: readable plus peer-write-shutdown,
/// delivered at most once until the descriptor is re-armed.
///
/// Level-triggered on purpose: re-arming a client whose bytes are still
/// unread surfaces them again immediately.
pub const CLIENT_INTEREST: u32 =
    (libc::EPOLLIN | libc::EPOLLRDHUP | libc::EPOLLONESHOT) as u32;

/// Interest set for the listening socket, armed permanently.
pub const LISTENER_INTEREST: u32 = libc::EPOLLIN as u32;

/// One delivered readiness event.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub fd: RawFd,
    /// The peer shut down its writing half; no more bytes will arrive.
    pub half_closed: bool,
}

/// Reusable buffer for one wait batch.
pub struct Events {
    list: Vec<libc::epoll_event>,
    count: usize,
}

impl Events {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: vec![libc::epoll_event { events: 0, u64: 0 }; capacity],
            count: 0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.list[..self.count].iter().map(|raw| Event {
            fd: raw.u64 as RawFd,
            half_closed: raw.events & libc::EPOLLRDHUP as u32 != 0,
        })
    }
}

/// Thin wrapper over one epoll instance.
///
/// `wait` takes `&self` so any number of worker threads can block on the
/// same instance; the kernel splits ready descriptors between them.
pub struct Poller {
    fd: RawFd,
}

impl Poller {
    pub fn new() -> Result<Self, SysError> {
        let fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if fd < 0 {
            return Err(SysError::last());
        }
        Ok(Self { fd })
    }

    /// Registers a descriptor with the given interest set.
    pub fn add(&self, fd: RawFd, interest: u32) -> Result<(), SysError> {
        self.ctl(libc::EPOLL_CTL_ADD, fd, interest)
    }

    /// Re-arms a descriptor after a one-shot delivery.
    pub fn rearm(&self, fd: RawFd, interest: u32) -> Result<(), SysError> {
        self.ctl(libc::EPOLL_CTL_MOD, fd, interest)
    }

    pub fn remove(&self, fd: RawFd) -> Result<(), SysError> {
        if unsafe { libc::epoll_ctl(self.fd, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut()) } != 0
        {
            return Err(SysError::last());
        }
        Ok(())
    }

    fn ctl(&self, op: i32, fd: RawFd, interest: u32) -> Result<(), SysError> {
        let mut event = libc::epoll_event {
            events: interest,
            u64: fd as u64,
        };
        if unsafe { libc::epoll_ctl(self.fd, op, fd, &mut event) } != 0 {
            return Err(SysError::last());
        }
        Ok(())
    }

    /// Blocks until readiness is delivered, the timeout passes, or a
    /// signal interrupts the wait. An interrupted wait fills nothing.
    pub fn wait(&self, events: &mut Events, timeout_ms: i32) -> Result<(), SysError> {
        events.count = 0;
        let count = unsafe {
            libc::epoll_wait(
                self.fd,
                events.list.as_mut_ptr(),
                events.list.len() as i32,
                timeout_ms,
            )
        };
        if count < 0 {
            let err = SysError::last();
            if err.code() == libc::EINTR {
                return Ok(());
            }
            return Err(err);
        }
        events.count = count as usize;
        Ok(())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        sys::close(self.fd);
    }
}
