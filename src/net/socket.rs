//! Move-only wrapper around one BSD socket.

use std::fmt;
use std::mem::{self, MaybeUninit};
use std::os::unix::io::RawFd;

use crate::error::{Error, SysError};
use crate::net::addr::{self, SocketAddress};
use crate::net::sys;

const INVALID_HANDLE: RawFd = -1;

#[cfg(target_os = "linux")]
const SEND_FLAGS: i32 = libc::MSG_NOSIGNAL;
#[cfg(not(target_os = "linux"))]
const SEND_FLAGS: i32 = 0;

/// Outcome of a transfer attempt on a non-blocking socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Bytes moved. Zero from `recv` means the peer finished sending.
    Ready(usize),
    /// The operation would block; retry after the next readiness event.
    WouldBlock,
}

/// Which half of the connection [`Socket::shutdown`] affects.
#[derive(Debug, Clone, Copy)]
pub enum ShutdownHow {
    Read,
    Write,
    Both,
}

impl ShutdownHow {
    fn as_raw(self) -> i32 {
        match self {
            ShutdownHow::Read => libc::SHUT_RD,
            ShutdownHow::Write => libc::SHUT_WR,
            ShutdownHow::Both => libc::SHUT_RDWR,
        }
    }
}

/// One endpoint, owning its OS handle.
///
/// The handle is either a live socket or the closed/moved-from sentinel;
/// dropping a live handle closes it exactly once. Instances move, they are
/// never shared or copied.
pub struct Socket {
    handle: RawFd,
    address: SocketAddress,
}

impl Socket {
    /// Allocates a socket for the address's family, type and protocol.
    pub fn open(address: SocketAddress) -> Result<Self, SysError> {
        let handle = unsafe {
            libc::socket(address.family(), address.socktype(), address.protocol())
        };
        if handle == INVALID_HANDLE {
            return Err(SysError::last());
        }
        Ok(Self { handle, address })
    }

    pub(crate) fn from_parts(handle: RawFd, address: SocketAddress) -> Self {
        Self { handle, address }
    }

    /// The raw OS handle; also the client identifier inside the reactor.
    pub fn handle(&self) -> RawFd {
        self.handle
    }

    /// The address this socket was created for (the peer address on an
    /// accepted socket).
    pub fn address(&self) -> &SocketAddress {
        &self.address
    }

    pub fn is_invalid(&self) -> bool {
        self.handle == INVALID_HANDLE
    }

    fn check_state(&self) -> Result<(), SysError> {
        if self.is_invalid() {
            return Err(SysError::from_code(libc::EBADF));
        }
        Ok(())
    }

    /// Binds the handle to the configured address.
    pub fn bind(&self) -> Result<(), SysError> {
        self.check_state()?;
        if unsafe { libc::bind(self.handle, self.address.as_sockaddr(), self.address.len()) } != 0
        {
            return Err(SysError::last());
        }
        Ok(())
    }

    /// Connects to the configured address.
    ///
    /// A non-blocking connect still in progress counts as success; the
    /// caller learns completion through readiness and `SO_ERROR`.
    pub fn connect(&self) -> Result<(), SysError> {
        self.check_state()?;
        if unsafe { libc::connect(self.handle, self.address.as_sockaddr(), self.address.len()) }
            != 0
        {
            let err = SysError::last();
            if sys::is_in_progress(err.code()) {
                return Ok(());
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn listen(&self, backlog: i32) -> Result<(), SysError> {
        self.check_state()?;
        if unsafe { libc::listen(self.handle, backlog) } != 0 {
            return Err(SysError::last());
        }
        Ok(())
    }

    /// Accepts one pending connection.
    ///
    /// Returns `Ok(None)` when nothing is pending on a non-blocking
    /// listener. The accepted socket is made non-blocking when requested.
    pub fn accept(&self, set_nonblocking: bool) -> Result<Option<Socket>, SysError> {
        self.check_state()?;
        let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        let client = sys::accept(
            self.handle,
            &mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr,
            &mut len,
            set_nonblocking,
        );
        if client == INVALID_HANDLE {
            let err = SysError::last();
            if sys::is_would_block(err.code()) {
                return Ok(None);
            }
            return Err(err);
        }
        Ok(Some(Socket::from_parts(
            client,
            SocketAddress::from_raw(&storage, len),
        )))
    }

    pub fn recv(&self, buf: &mut [u8]) -> Result<Progress, SysError> {
        self.check_state()?;
        let count = unsafe {
            libc::recv(self.handle, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0)
        };
        if count < 0 {
            let err = SysError::last();
            if sys::is_would_block(err.code()) {
                return Ok(Progress::WouldBlock);
            }
            return Err(err);
        }
        Ok(Progress::Ready(count as usize))
    }

    pub fn send(&self, buf: &[u8]) -> Result<Progress, SysError> {
        self.check_state()?;
        let count = unsafe {
            libc::send(
                self.handle,
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
                SEND_FLAGS,
            )
        };
        if count < 0 {
            let err = SysError::last();
            if sys::is_would_block(err.code()) {
                return Ok(Progress::WouldBlock);
            }
            return Err(err);
        }
        Ok(Progress::Ready(count as usize))
    }

    pub fn set_nonblocking(&self) -> Result<(), SysError> {
        self.check_state()?;
        let flags = unsafe { libc::fcntl(self.handle, libc::F_GETFL, 0) };
        if flags < 0 {
            return Err(SysError::last());
        }
        if unsafe { libc::fcntl(self.handle, libc::F_SETFL, flags | libc::O_NONBLOCK) } != 0 {
            return Err(SysError::last());
        }
        Ok(())
    }

    pub fn shutdown(&self, how: ShutdownHow) -> Result<(), SysError> {
        self.check_state()?;
        if unsafe { libc::shutdown(self.handle, how.as_raw()) } != 0 {
            return Err(SysError::last());
        }
        Ok(())
    }

    /// Reads a socket option as a plain value.
    pub fn option<T: Copy>(&self, level: i32, name: i32) -> Result<T, SysError> {
        self.check_state()?;
        let mut value = MaybeUninit::<T>::uninit();
        let mut len = mem::size_of::<T>() as libc::socklen_t;
        if unsafe {
            libc::getsockopt(
                self.handle,
                level,
                name,
                value.as_mut_ptr() as *mut libc::c_void,
                &mut len,
            )
        } != 0
        {
            return Err(SysError::last());
        }
        Ok(unsafe { value.assume_init() })
    }

    /// Sets a socket option from a plain value.
    pub fn set_option<T: Copy>(&self, level: i32, name: i32, value: T) -> Result<(), SysError> {
        self.check_state()?;
        if unsafe {
            libc::setsockopt(
                self.handle,
                level,
                name,
                &value as *const T as *const libc::c_void,
                mem::size_of::<T>() as libc::socklen_t,
            )
        } != 0
        {
            return Err(SysError::last());
        }
        Ok(())
    }

    /// The pending socket error (`SO_ERROR`), if any.
    pub fn last_error(&self) -> Result<Option<SysError>, SysError> {
        let code: i32 = self.option(libc::SOL_SOCKET, libc::SO_ERROR)?;
        Ok((code != 0).then(|| SysError::from_code(code)))
    }

    /// The address the OS actually bound, resolving a service of `"0"` to
    /// the assigned port.
    pub fn local_address(&self) -> Result<SocketAddress, SysError> {
        self.check_state()?;
        let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        if unsafe {
            libc::getsockname(
                self.handle,
                &mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr,
                &mut len,
            )
        } != 0
        {
            return Err(SysError::last());
        }
        Ok(SocketAddress::from_raw(&storage, len))
    }

    /// Closes the handle. Only the first call reaches the OS.
    pub fn close(&mut self) {
        if self.handle != INVALID_HANDLE {
            sys::close(self.handle);
            self.handle = INVALID_HANDLE;
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("handle", &self.handle)
            .field("address", &self.address)
            .finish()
    }
}

/// Resolves `host`/`service` and returns the first candidate that binds.
///
/// Reuse-address and non-blocking mode are applied before `bind` so a
/// restarted server can reclaim its port. When every candidate fails the
/// most recent error is reported.
pub fn bound(
    family: i32,
    socktype: i32,
    protocol: i32,
    host: Option<&str>,
    service: &str,
    non_blocking: bool,
    reuse: bool,
) -> Result<Socket, Error> {
    let candidates = addr::resolve(family, socktype, protocol, libc::AI_PASSIVE, host, service)?;
    let mut last: Option<SysError> = None;
    for candidate in candidates {
        let socket = match Socket::open(candidate) {
            Ok(socket) => socket,
            Err(err) => {
                last = Some(err);
                continue;
            }
        };
        if reuse {
            if let Err(err) = socket.set_option(libc::SOL_SOCKET, libc::SO_REUSEADDR, 1i32) {
                last = Some(err);
                continue;
            }
        }
        if non_blocking {
            if let Err(err) = socket.set_nonblocking() {
                last = Some(err);
                continue;
            }
        }
        if let Err(err) = socket.bind() {
            last = Some(err);
            continue;
        }
        return Ok(socket);
    }
    Err(bind_failure("bound", last))
}

/// Resolves `host`/`service` and returns the first candidate that
/// connects.
pub fn connected(
    socktype: i32,
    protocol: i32,
    host: &str,
    service: &str,
    non_blocking: bool,
) -> Result<Socket, Error> {
    let candidates = addr::resolve(libc::AF_UNSPEC, socktype, protocol, 0, Some(host), service)?;
    let mut last: Option<SysError> = None;
    for candidate in candidates {
        let socket = match Socket::open(candidate) {
            Ok(socket) => socket,
            Err(err) => {
                last = Some(err);
                continue;
            }
        };
        if let Err(err) = socket.connect() {
            last = Some(err);
            continue;
        }
        if non_blocking {
            if let Err(err) = socket.set_nonblocking() {
                last = Some(err);
                continue;
            }
        }
        return Ok(socket);
    }
    Err(bind_failure("connected", last))
}

fn bind_failure(kind: &str, last: Option<SysError>) -> Error {
    match last {
        Some(err) => Error::Runtime(format!("cannot create {} socket: {}", kind, err)),
        None => Error::Runtime(format!("cannot create {} socket: no addresses resolved", kind)),
    }
}
