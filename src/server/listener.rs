// TCP listener setup
// SO_REUSEADDR/SO_REUSEPORT so a restarted server can rebind immediately

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

const BACKLOG: i32 = 128;

/// Bind a non-blocking, reuse-enabled listener on `addr`.
///
/// `SO_REUSEADDR` allows rebinding a port still in `TIME_WAIT`;
/// `SO_REUSEPORT` allows a replacement process to bind before the old one
/// has fully shut down.
pub fn bind_reusable(addr: std::net::SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_port(true)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
