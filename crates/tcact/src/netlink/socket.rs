//! Async NETLINK_ROUTE socket for action requests.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::error::Result;

/// One action dump batch fits in this many bytes.
const RECV_BUF_SIZE: usize = 32768;

/// Non-blocking routing socket driven by the tokio reactor.
pub struct NetlinkSocket {
    fd: AsyncFd<Socket>,
    seq: AtomicU32,
    port: u32,
}

impl NetlinkSocket {
    /// Open a NETLINK_ROUTE socket and let the kernel pick the port ID.
    pub fn new() -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_ROUTE)?;
        socket.set_non_blocking(true)?;

        let mut local = SocketAddr::new(0, 0);
        socket.bind(&local)?;
        socket.get_address(&mut local)?;
        let port = local.port_number();

        if let Err(e) = socket.set_ext_ack(true) {
            tracing::debug!(error = %e, "kernel rejected NETLINK_EXT_ACK");
        }
        tracing::trace!(port, "action socket bound");

        Ok(Self {
            fd: AsyncFd::new(socket)?,
            seq: AtomicU32::new(1),
            port,
        })
    }

    /// Sequence number for the next request.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Port ID the kernel assigned at bind time.
    pub fn pid(&self) -> u32 {
        self.port
    }

    /// Send one complete request.
    pub async fn send(&self, msg: &[u8]) -> Result<()> {
        self.ready_io(Interest::WRITABLE, |sock| sock.send(msg, 0))
            .await?;
        Ok(())
    }

    /// Receive one datagram.
    pub async fn recv_msg(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(RECV_BUF_SIZE);
        let n = self
            .ready_io(Interest::READABLE, |sock| sock.recv(&mut buf, 0))
            .await?;
        tracing::trace!(bytes = n, "datagram received");
        Ok(buf.to_vec())
    }

    async fn ready_io<T>(
        &self,
        interest: Interest,
        mut op: impl FnMut(&Socket) -> io::Result<T>,
    ) -> io::Result<T> {
        loop {
            let mut guard = self.fd.ready(interest).await?;
            if let Ok(result) = guard.try_io(|fd| op(fd.get_ref())) {
                return result;
            }
        }
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}
