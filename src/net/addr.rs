//! Resolved socket addresses.

use std::ffi::CString;
use std::fmt;
use std::mem;
use std::ptr;

use crate::error::AddrInfoError;

/// An owned copy of one resolver candidate: the hints that produced it
/// plus the raw socket address bytes.
///
/// Rendering with `Display` yields `host:port` in numeric form.
#[derive(Clone, Copy)]
pub struct SocketAddress {
    family: i32,
    socktype: i32,
    protocol: i32,
    storage: libc::sockaddr_storage,
    len: libc::socklen_t,
}

impl SocketAddress {
    /// Copies a raw address as filled in by accept or getsockname.
    pub(crate) fn from_raw(storage: &libc::sockaddr_storage, len: libc::socklen_t) -> Self {
        Self {
            family: storage.ss_family as i32,
            socktype: 0,
            protocol: 0,
            storage: *storage,
            len,
        }
    }

    /// Copies one candidate out of a resolver list.
    ///
    /// The caller guarantees `info.ai_addr` points at `info.ai_addrlen`
    /// valid bytes.
    unsafe fn from_addrinfo(info: &libc::addrinfo) -> Self {
        let mut storage: libc::sockaddr_storage = mem::zeroed();
        ptr::copy_nonoverlapping(
            info.ai_addr as *const u8,
            &mut storage as *mut libc::sockaddr_storage as *mut u8,
            info.ai_addrlen as usize,
        );
        Self {
            family: info.ai_family,
            socktype: info.ai_socktype,
            protocol: info.ai_protocol,
            storage,
            len: info.ai_addrlen,
        }
    }

    pub fn family(&self) -> i32 {
        self.family
    }

    pub fn socktype(&self) -> i32 {
        self.socktype
    }

    pub fn protocol(&self) -> i32 {
        self.protocol
    }

    pub(crate) fn as_sockaddr(&self) -> *const libc::sockaddr {
        &self.storage as *const libc::sockaddr_storage as *const libc::sockaddr
    }

    pub(crate) fn len(&self) -> libc::socklen_t {
        self.len
    }

    /// Host name for the address, growing the buffer on `EAI_OVERFLOW`.
    ///
    /// Pass `NI_NUMERICHOST` to skip the reverse lookup.
    pub fn host(&self, flags: i32) -> Result<String, AddrInfoError> {
        let mut buf = vec![0u8; 32];
        loop {
            let code = unsafe {
                libc::getnameinfo(
                    self.as_sockaddr(),
                    self.len,
                    buf.as_mut_ptr() as *mut libc::c_char,
                    buf.len() as libc::socklen_t,
                    ptr::null_mut(),
                    0,
                    flags,
                )
            };
            match code {
                0 => return Ok(read_c_buffer(&buf)),
                libc::EAI_OVERFLOW => buf.resize(buf.len() * 2, 0),
                code => return Err(AddrInfoError::new(code)),
            }
        }
    }

    /// Service name or port for the address, growing on `EAI_OVERFLOW`.
    pub fn service(&self, flags: i32) -> Result<String, AddrInfoError> {
        let mut buf = vec![0u8; 32];
        loop {
            let code = unsafe {
                libc::getnameinfo(
                    self.as_sockaddr(),
                    self.len,
                    ptr::null_mut(),
                    0,
                    buf.as_mut_ptr() as *mut libc::c_char,
                    buf.len() as libc::socklen_t,
                    flags,
                )
            };
            match code {
                0 => return Ok(read_c_buffer(&buf)),
                libc::EAI_OVERFLOW => buf.resize(buf.len() * 2, 0),
                code => return Err(AddrInfoError::new(code)),
            }
        }
    }
}

fn read_c_buffer(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (
            self.host(libc::NI_NUMERICHOST),
            self.service(libc::NI_NUMERICSERV),
        ) {
            (Ok(host), Ok(service)) => write!(f, "{}:{}", host, service),
            _ => write!(f, "<unresolved>"),
        }
    }
}

impl fmt::Debug for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketAddress")
            .field("family", &self.family)
            .field("socktype", &self.socktype)
            .field("protocol", &self.protocol)
            .field("len", &self.len)
            .finish()
    }
}

/// Resolves a host/service pair into owned address records.
///
/// A `None` host yields wildcard or loopback candidates depending on
/// `flags`; pass `AI_PASSIVE` when the socket will listen.
pub fn resolve(
    family: i32,
    socktype: i32,
    protocol: i32,
    flags: i32,
    host: Option<&str>,
    service: &str,
) -> Result<Vec<SocketAddress>, AddrInfoError> {
    let host = host
        .map(CString::new)
        .transpose()
        .map_err(|_| AddrInfoError::new(libc::EAI_NONAME))?;
    let service = CString::new(service).map_err(|_| AddrInfoError::new(libc::EAI_SERVICE))?;

    let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
    hints.ai_family = family;
    hints.ai_socktype = socktype;
    hints.ai_protocol = protocol;
    hints.ai_flags = flags;

    let mut info: *mut libc::addrinfo = ptr::null_mut();
    let code = unsafe {
        libc::getaddrinfo(
            host.as_ref().map_or(ptr::null(), |h| h.as_ptr()),
            service.as_ptr(),
            &hints,
            &mut info,
        )
    };
    if code != 0 {
        return Err(AddrInfoError::new(code));
    }

    let mut candidates = Vec::new();
    let mut cursor = info;
    while !cursor.is_null() {
        let entry = unsafe { &*cursor };
        if !entry.ai_addr.is_null() {
            candidates.push(unsafe { SocketAddress::from_addrinfo(entry) });
        }
        cursor = entry.ai_next;
    }
    unsafe { libc::freeaddrinfo(info) };
    Ok(candidates)
}
