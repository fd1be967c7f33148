//! UDP transport: one bound receive socket, length-prefixed framing, and
//! an identifier-addressed send path per neighbor.
//!
//! Grounded on `citadel_transfer::transport`'s `UdpTransport`/`send`, cut
//! down to what identifier-addressed gossip needs: no packet batching, no
//! handler registration, a neighbor table keyed by node id instead of raw
//! `SocketAddr`s.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

/// Maximum UDP datagram this transport will read in one receive.
const MAX_DATAGRAM: usize = 64 * 1024;

pub struct UdpTransport {
    socket: UdpSocket,
    neighbors: HashMap<u32, SocketAddr>,
    by_addr: HashMap<SocketAddr, u32>,
}

impl UdpTransport {
    pub async fn bind(bind: SocketAddr, neighbors: HashMap<u32, SocketAddr>) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(bind).await?;
        tracing::info!(%bind, neighbor_count = neighbors.len(), "udp transport bound");
        let by_addr = neighbors.iter().map(|(&id, &addr)| (addr, id)).collect();
        Ok(Self {
            socket,
            neighbors,
            by_addr,
        })
    }

    /// Sends `payload` to `to`, prefixed with its 2-byte little-endian length.
    pub async fn send(&self, to: u32, payload: &[u8]) -> anyhow::Result<()> {
        let addr = *self
            .neighbors
            .get(&to)
            .ok_or_else(|| anyhow::anyhow!("no known address for neighbor {to}"))?;
        let mut framed = Vec::with_capacity(2 + payload.len());
        framed.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        framed.extend_from_slice(payload);
        self.socket.send_to(&framed, addr).await?;
        Ok(())
    }

    /// Waits for one datagram and returns the sender's node id and payload.
    ///
    /// Datagrams from unrecognized addresses, or whose framed length
    /// doesn't match what arrived, are logged and dropped; the caller
    /// loops back to wait for the next one.
    pub async fn recv(&self) -> anyhow::Result<(u32, Vec<u8>)> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, addr) = self.socket.recv_from(&mut buf).await?;
            let Some(&from) = self.by_addr.get(&addr) else {
                tracing::warn!(%addr, "dropping datagram from unknown neighbor");
                continue;
            };
            if len < 2 {
                tracing::warn!(%addr, len, "dropping undersized datagram");
                continue;
            }
            let declared = u16::from_le_bytes([buf[0], buf[1]]) as usize;
            if declared != len - 2 {
                tracing::warn!(%addr, declared, actual = len - 2, "dropping malformed frame");
                continue;
            }
            return Ok((from, buf[2..len].to_vec()));
        }
    }

    pub fn neighbor_ids(&self) -> Vec<u32> {
        self.neighbors.keys().copied().collect()
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_payload_between_two_bound_sockets() {
        let a_addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let b_addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let a_sock = UdpSocket::bind(a_addr).await.unwrap();
        let b_sock = UdpSocket::bind(b_addr).await.unwrap();
        let a_real = a_sock.local_addr().unwrap();
        let b_real = b_sock.local_addr().unwrap();
        drop(a_sock);
        drop(b_sock);

        let a = UdpTransport::bind(a_real, HashMap::from([(2, b_real)]))
            .await
            .unwrap();
        let b = UdpTransport::bind(b_real, HashMap::from([(1, a_real)]))
            .await
            .unwrap();

        a.send(2, b"hello").await.unwrap();
        let (from, payload) = b.recv().await.unwrap();
        assert_eq!(from, 1);
        assert_eq!(payload, b"hello");
    }
}
