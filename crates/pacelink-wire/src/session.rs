use std::{
    io::{self, Write},
    mem,
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    os::fd::FromRawFd,
};

use tracing::{debug, info};

use crate::{Envelope, WireError, frame};

/// Dial the hardware side. Blocking connect, no retry, Nagle off: the
/// traffic is small latency-dominated frames.
pub fn connect(host: &str, port: u16) -> Result<TcpStream, WireError> {
    let stream = TcpStream::connect((host, port))
        .map_err(|source| WireError::Connect { addr: format!("{host}:{port}"), source })?;
    stream.set_nodelay(true)?;
    if let Ok(peer) = stream.peer_addr() {
        debug!(%peer, "connected");
    }
    Ok(stream)
}

/// Encode and write one envelope, whole-frame or error.
pub fn send<W: Write>(writer: &mut W, envelope: &Envelope) -> Result<(), WireError> {
    let bytes = frame::encode(envelope)?;
    writer.write_all(&bytes).map_err(WireError::Send)
}

/// Single-peer listener for the hardware side.
pub struct Listener {
    inner: TcpListener,
    local: SocketAddr,
}

impl Listener {
    /// Bind with address reuse and a backlog of one.
    pub fn bind(host: &str, port: u16) -> Result<Self, WireError> {
        let addr = resolve_bind_addr(host, port)?;
        let inner = bind_reuse(addr, 1)
            .map_err(|source| WireError::Bind { addr: addr.to_string(), source })?;
        let local = inner.local_addr()?;
        Ok(Self { inner, local })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Accept exactly one peer; the listener closes when this returns, so no
    /// further connection can ever be picked up.
    pub fn accept_one(self) -> Result<TcpStream, WireError> {
        let (stream, peer) = self.inner.accept().map_err(WireError::Accept)?;
        stream.set_nodelay(true)?;
        info!(%peer, "peer connected");
        Ok(stream)
    }
}

fn resolve_bind_addr(host: &str, port: u16) -> Result<SocketAddr, WireError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|source| WireError::Bind { addr: format!("{host}:{port}"), source })?
        .next()
        .ok_or_else(|| WireError::Bind {
            addr: format!("{host}:{port}"),
            source: io::Error::new(io::ErrorKind::NotFound, "host resolved to no address"),
        })
}

/// `SO_REUSEADDR` must be set before `bind`, which std's listener cannot do,
/// so the socket is built by hand and only then handed to std.
fn bind_reuse(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let (domain, storage, addr_len) = sockaddr_from(addr);
    unsafe {
        let fd = libc::socket(domain, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        let one: libc::c_int = 1;
        let rc = libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            (&raw const one).cast::<libc::c_void>(),
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        if rc != 0 ||
            libc::bind(fd, (&raw const storage).cast::<libc::sockaddr>(), addr_len) != 0 ||
            libc::listen(fd, backlog) != 0
        {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }
        Ok(TcpListener::from_raw_fd(fd))
    }
}

fn sockaddr_from(addr: SocketAddr) -> (libc::c_int, libc::sockaddr_storage, libc::socklen_t) {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    match addr {
        SocketAddr::V4(v4) => {
            let sin = libc::sockaddr_in {
                sin_family: libc::AF_INET as libc::sa_family_t,
                sin_port: v4.port().to_be(),
                sin_addr: libc::in_addr { s_addr: u32::from(*v4.ip()).to_be() },
                sin_zero: [0; 8],
            };
            unsafe { *(&raw mut storage).cast::<libc::sockaddr_in>() = sin };
            (libc::AF_INET, storage, mem::size_of::<libc::sockaddr_in>() as libc::socklen_t)
        }
        SocketAddr::V6(v6) => {
            let sin6 = libc::sockaddr_in6 {
                sin6_family: libc::AF_INET6 as libc::sa_family_t,
                sin6_port: v6.port().to_be(),
                sin6_flowinfo: v6.flowinfo(),
                sin6_addr: libc::in6_addr { s6_addr: v6.ip().octets() },
                sin6_scope_id: v6.scope_id(),
            };
            unsafe { *(&raw mut storage).cast::<libc::sockaddr_in6>() = sin6 };
            (libc::AF_INET6, storage, mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t)
        }
    }
}
