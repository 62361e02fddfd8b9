//! Socket and buffer tuning applied to the listener and every connection.
//!
//! # Option table
//! ```text
//! SO_KEEPALIVE     on        listener + accepted sockets
//! listen backlog   262144    listener (kernel may clamp to somaxconn)
//! TCP_NODELAY      on        accepted sockets
//! SO_RCVBUF        262144    accepted sockets
//! SO_SNDBUF        262144    accepted sockets
//! read buffer      adaptive  HTTP decoder, grows on demand up to read_buffer_max
//! ```
//!
//! Byte buffers are reference-counted `Bytes` chunks handed from the decoder
//! to the aggregator and router without copying.

use std::io;
use std::net::SocketAddr;

use hyper::server::conn::http1;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::TcpStream;

pub const DEFAULT_BACKLOG: u32 = 256 * 1024;
pub const DEFAULT_SOCKET_BUFFER: usize = 256 * 1024;
pub const DEFAULT_READ_BUFFER_MAX: usize = 400 * 1024;

/// The HTTP decoder refuses a smaller adaptive ceiling.
pub const MIN_READ_BUFFER: usize = 8192;

/// Socket and buffer knobs for the listener and accepted connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    /// TCP keep-alive probes on the listener and every connection.
    pub keep_alive: bool,
    pub backlog: u32,
    pub tcp_nodelay: bool,
    pub recv_buffer_size: usize,
    pub send_buffer_size: usize,
    /// Ceiling for the decoder's adaptive read buffer.
    pub read_buffer_max: usize,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            keep_alive: true,
            backlog: DEFAULT_BACKLOG,
            tcp_nodelay: true,
            recv_buffer_size: DEFAULT_SOCKET_BUFFER,
            send_buffer_size: DEFAULT_SOCKET_BUFFER,
            read_buffer_max: DEFAULT_READ_BUFFER_MAX,
        }
    }
}

impl BufferPolicy {
    /// Create a non-blocking listening socket bound to `addr`.
    pub fn bind_listener(&self, addr: SocketAddr) -> io::Result<std::net::TcpListener> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

        #[cfg(not(windows))]
        socket.set_reuse_address(true)?;
        socket.set_keepalive(self.keep_alive)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(i32::try_from(self.backlog).unwrap_or(i32::MAX))?;

        Ok(socket.into())
    }

    /// Apply per-connection options to an accepted stream.
    pub fn apply_to_stream(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(self.tcp_nodelay)?;

        let sock = SockRef::from(stream);
        sock.set_keepalive(self.keep_alive)?;
        sock.set_recv_buffer_size(self.recv_buffer_size)?;
        sock.set_send_buffer_size(self.send_buffer_size)?;
        Ok(())
    }

    /// Configure the HTTP/1 codec's read buffering.
    pub fn configure_codec(&self, builder: &mut http1::Builder) {
        builder.max_buf_size(self.read_buffer_max.max(MIN_READ_BUFFER));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_option_table() {
        let policy = BufferPolicy::default();
        assert!(policy.keep_alive);
        assert!(policy.tcp_nodelay);
        assert_eq!(policy.backlog, 262_144);
        assert_eq!(policy.recv_buffer_size, 262_144);
        assert_eq!(policy.send_buffer_size, 262_144);
    }

    #[test]
    fn listener_binds_ephemeral_port() {
        let listener = BufferPolicy::default()
            .bind_listener("127.0.0.1:0".parse().unwrap())
            .unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let sock = SockRef::from(&listener);
        assert!(sock.keepalive().unwrap());
    }

    #[test]
    fn second_bind_on_same_port_fails() {
        let policy = BufferPolicy::default();
        let first = policy.bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let taken = first.local_addr().unwrap();

        let err = policy.bind_listener(taken).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
    }

    #[tokio::test]
    async fn accepted_stream_gets_connection_options() {
        let policy = BufferPolicy::default();
        let listener = tokio::net::TcpListener::from_std(
            policy.bind_listener("127.0.0.1:0".parse().unwrap()).unwrap(),
        )
        .unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (accepted, _) = listener.accept().await.unwrap();
        policy.apply_to_stream(&accepted).unwrap();

        assert!(accepted.nodelay().unwrap());
        let sock = SockRef::from(&accepted);
        assert!(sock.keepalive().unwrap());
        // Kernels round, double or clamp the requested size.
        assert!(sock.recv_buffer_size().unwrap() > 0);
    }
}
