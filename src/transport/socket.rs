//! UDP transport.
//!
//! Wraps a connected tokio [`UdpSocket`] so it can carry one ARQ connection.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::core::constants::{DEFAULT_RECV_BUFFER_SIZE, FRAME_HEADER_SIZE, RECOMMENDED_MAX_DATAGRAM};

use super::link::Transport;

/// Connected UDP socket used as an ARQ transport.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    /// The underlying UDP socket.
    socket: Arc<UdpSocket>,
    /// Size of the buffer each datagram is received into.
    recv_buffer_size: usize,
    /// Largest datagram the path is expected to carry.
    max_datagram_size: usize,
}

impl UdpTransport {
    /// Bind to `local` and connect to `peer`.
    pub async fn connect(local: SocketAddr, peer: SocketAddr) -> io::Result<Self> {
        UdpTransportBuilder::new().connect(local, peer).await
    }

    /// Use an already connected UDP socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        UdpTransportBuilder::new().from_socket(socket)
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Get the peer address.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket.peer_addr()
    }

    /// Largest datagram the path is expected to carry.
    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size
    }

    /// Largest write payload that fits one datagram after the frame header.
    pub fn max_payload_size(&self) -> usize {
        self.max_datagram_size.saturating_sub(FRAME_HEADER_SIZE)
    }

    /// Get a reference to the underlying socket.
    pub fn inner(&self) -> &UdpSocket {
        &self.socket
    }
}

impl Transport for UdpTransport {
    async fn send(&self, buf: Bytes) -> io::Result<()> {
        self.socket.send(&buf).await?;
        Ok(())
    }

    async fn recv(&self) -> io::Result<Bytes> {
        let mut buf = vec![0u8; self.recv_buffer_size];
        let len = self.socket.recv(&mut buf).await?;
        buf.truncate(len);
        Ok(Bytes::from(buf))
    }
}

/// Builder for [`UdpTransport`] with custom options.
#[derive(Debug, Clone)]
pub struct UdpTransportBuilder {
    recv_buffer_size: usize,
    max_datagram_size: usize,
}

impl Default for UdpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpTransportBuilder {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self {
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            max_datagram_size: RECOMMENDED_MAX_DATAGRAM,
        }
    }

    /// Set the receive buffer size.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Set the largest datagram the path is expected to carry.
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size;
        self
    }

    /// Bind to `local`, connect to `peer` and create the transport.
    pub async fn connect(self, local: SocketAddr, peer: SocketAddr) -> io::Result<UdpTransport> {
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        Ok(self.from_socket(socket))
    }

    /// Create the transport from an already connected socket.
    pub fn from_socket(self, socket: UdpSocket) -> UdpTransport {
        UdpTransport {
            socket: Arc::new(socket),
            recv_buffer_size: self.recv_buffer_size,
            max_datagram_size: self.max_datagram_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected_pair() -> (UdpTransport, UdpTransport) {
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        a.connect(b.local_addr().unwrap()).await.unwrap();
        b.connect(a.local_addr().unwrap()).await.unwrap();
        (UdpTransport::from_socket(a), UdpTransport::from_socket(b))
    }

    #[tokio::test]
    async fn test_send_recv() {
        let (a, b) = connected_pair().await;

        a.send(Bytes::from_static(b"hello arq")).await.unwrap();
        assert_eq!(b.recv().await.unwrap(), Bytes::from_static(b"hello arq"));
    }

    #[tokio::test]
    async fn test_connect() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let client = UdpTransport::connect("127.0.0.1:0".parse().unwrap(), server_addr)
            .await
            .unwrap();
        assert_eq!(client.peer_addr().unwrap(), server_addr);
        assert!(client.local_addr().unwrap().port() != 0);

        client.send(Bytes::from_static(b"hi")).await.unwrap();
        let mut buf = [0u8; 16];
        let (len, from) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"hi");
        assert_eq!(from, client.local_addr().unwrap());
    }

    #[test]
    fn test_builder() {
        let builder = UdpTransportBuilder::new()
            .recv_buffer_size(4096)
            .max_datagram_size(1400);

        assert_eq!(builder.recv_buffer_size, 4096);
        assert_eq!(builder.max_datagram_size, 1400);
    }

    #[tokio::test]
    async fn test_max_payload_size() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transport = UdpTransportBuilder::new()
            .max_datagram_size(1200)
            .from_socket(socket);

        assert_eq!(transport.max_payload_size(), 1200 - FRAME_HEADER_SIZE);
    }
}
