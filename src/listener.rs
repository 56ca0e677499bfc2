//! Reuse-enabled TCP bind.
//!
//! On a configuration reload the old listener may still be draining when the
//! replacement binds the same address, so the socket is created with
//! `SO_REUSEADDR` (and `SO_REUSEPORT` on Unix) before binding. Plain
//! `TcpListener::bind` would intermittently fail that race with
//! "address already in use".

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket};

use crate::error::Error;

/// Accept backlog; connections beyond it queue in the kernel.
const BACKLOG: u32 = 1024;

/// Binds `addr` with address/port reuse enabled.
///
/// Every failure — socket creation, option setting, bind, listen — is a
/// [`Error::Bind`]; the caller treats it as fatal to startup.
pub(crate) fn bind(addr: SocketAddr) -> Result<TcpListener, Error> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(Error::Bind)?;

    socket.set_reuseaddr(true).map_err(Error::Bind)?;
    #[cfg(unix)]
    socket.set_reuseport(true).map_err(Error::Bind)?;

    socket.bind(addr).map_err(Error::Bind)?;
    socket.listen(BACKLOG).map_err(Error::Bind)
}
