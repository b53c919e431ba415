//! Request/reply exchanges over a [`NetlinkSocket`].

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{MessageIter, NlMsgError, NlMsgHdr};
use super::socket::NetlinkSocket;

/// What one reply message means for the request that is waiting on it.
enum Reply<'a> {
    /// Belongs to another request.
    Foreign,
    Ack,
    Done,
    Data(&'a NlMsgHdr, &'a [u8]),
}

fn classify<'a>(header: &'a NlMsgHdr, payload: &'a [u8], seq: u32) -> Result<Reply<'a>> {
    if header.nlmsg_seq != seq {
        return Ok(Reply::Foreign);
    }
    if header.is_error() {
        let err = NlMsgError::from_bytes(payload)?;
        if err.is_ack() {
            return Ok(Reply::Ack);
        }
        return Err(Error::from_errno(err.error));
    }
    if header.is_done() {
        return Ok(Reply::Done);
    }
    Ok(Reply::Data(header, payload))
}

/// Netlink connection carrying action requests.
///
/// One request is in flight per call. There are no retries and no timeouts.
pub struct Connection {
    socket: NetlinkSocket,
}

impl Connection {
    /// Open a connection to the kernel routing subsystem.
    pub fn new() -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new()?,
        })
    }

    pub fn socket(&self) -> &NetlinkSocket {
        &self.socket
    }

    /// Send a request and return the first reply datagram.
    ///
    /// A kernel error carried in that datagram is returned as `Err`.
    pub async fn request(&self, builder: MessageBuilder) -> Result<Vec<u8>> {
        let seq = self.send(builder, "request").await?;
        let datagram = self.socket.recv_msg().await?;
        for result in MessageIter::new(&datagram) {
            let (header, payload) = result?;
            classify(header, payload, seq)?;
        }
        Ok(datagram)
    }

    /// Send a request whose only reply is an ACK.
    pub async fn request_ack(&self, builder: MessageBuilder) -> Result<()> {
        let seq = self.send(builder, "ack").await?;
        loop {
            let datagram = self.socket.recv_msg().await?;
            for result in MessageIter::new(&datagram) {
                let (header, payload) = result?;
                if let Reply::Ack = classify(header, payload, seq)? {
                    return Ok(());
                }
            }
        }
    }

    /// Send a dump request and collect every reply message up to `NLMSG_DONE`.
    ///
    /// Each returned message keeps its `nlmsghdr`.
    pub async fn dump(&self, builder: MessageBuilder) -> Result<Vec<Vec<u8>>> {
        let seq = self.send(builder, "dump").await?;
        let mut messages = Vec::new();

        'recv: loop {
            let datagram = self.socket.recv_msg().await?;
            for result in MessageIter::new(&datagram) {
                let (header, payload) = result?;
                match classify(header, payload, seq)? {
                    Reply::Done => break 'recv,
                    Reply::Data(header, payload) => {
                        let mut message = header.as_bytes().to_vec();
                        message.extend_from_slice(payload);
                        messages.push(message);
                    }
                    Reply::Foreign | Reply::Ack => {}
                }
            }
        }

        tracing::debug!(seq, messages = messages.len(), "dump complete");
        Ok(messages)
    }

    async fn send(&self, mut builder: MessageBuilder, what: &'static str) -> Result<u32> {
        let seq = self.socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.socket.pid());

        let msg = builder.finish();
        tracing::debug!(seq, len = msg.len(), what, "sending");
        self.socket.send(&msg).await?;
        Ok(seq)
    }
}
