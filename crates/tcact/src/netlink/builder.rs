//! Request encoder with a hard size limit.
//!
//! Every write checks the limit first. A write that would cross it fails with
//! [`Error::MessageTooLarge`] and leaves the request untouched.

use zerocopy::{Immutable, IntoBytes};

use super::attr::{NLA_F_NESTED, NLA_HDRLEN, NlAttr, nla_align};
use super::error::{Error, Result};
use super::message::{NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};

/// Default request capacity, as the classic tc tools size their buffer.
pub const MAX_MSG: usize = 16384;

/// Open nest; hand it back to [`MessageBuilder::nest_end`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct NestToken {
    /// Position of the nest header within the body.
    at: usize,
}

/// `nla_len` for an attribute spanning `len` bytes, header included.
fn attr_len(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::MessageTooLarge {
        needed: len,
        capacity: u16::MAX as usize,
    })
}

/// A netlink request under construction.
///
/// The header is kept apart from the body, and `nlmsg_len` is filled in by
/// [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    header: NlMsgHdr,
    body: Vec<u8>,
    capacity: usize,
}

impl MessageBuilder {
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            header: NlMsgHdr::new(msg_type, flags),
            body: Vec::new(),
            capacity: MAX_MSG,
        }
    }

    /// Replace the default [`MAX_MSG`] limit.
    pub fn with_capacity_limit(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Encoded length so far, header included.
    pub fn len(&self) -> usize {
        NLMSG_HDRLEN + self.body.len()
    }

    /// True while nothing follows the header.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Header as it stands; `nlmsg_len` is only final after `finish`.
    pub fn header(&self) -> &NlMsgHdr {
        &self.header
    }

    /// Everything written after the netlink header.
    pub fn payload(&self) -> &[u8] {
        &self.body
    }

    fn check(&self, grow: usize) -> Result<()> {
        let needed = self.len() + grow;
        if needed > self.capacity {
            return Err(Error::MessageTooLarge {
                needed,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn pad(&mut self, to: usize) {
        self.body.resize(to, 0);
    }

    /// Write a fixed family header such as `tcamsg`.
    pub fn append<T: IntoBytes + Immutable>(&mut self, value: &T) -> Result<()> {
        let bytes = value.as_bytes();
        self.check(nlmsg_align(bytes.len()))?;
        self.body.extend_from_slice(bytes);
        self.pad(nlmsg_align(self.body.len()));
        Ok(())
    }

    /// Write one TLV, padded to the attribute alignment.
    pub fn append_attr(&mut self, attr_type: u16, data: &[u8]) -> Result<()> {
        let nla_len = attr_len(NLA_HDRLEN + data.len())?;
        self.check(nla_align(nla_len as usize))?;
        let attr = NlAttr {
            nla_len,
            nla_type: attr_type,
        };
        self.body.extend_from_slice(attr.as_bytes());
        self.body.extend_from_slice(data);
        self.pad(nla_align(self.body.len()));
        Ok(())
    }

    pub fn append_attr_struct<T: IntoBytes + Immutable>(
        &mut self,
        attr_type: u16,
        value: &T,
    ) -> Result<()> {
        self.append_attr(attr_type, value.as_bytes())
    }

    /// Zero-length marker attribute.
    pub fn append_attr_empty(&mut self, attr_type: u16) -> Result<()> {
        self.append_attr(attr_type, &[])
    }

    pub fn append_attr_u16(&mut self, attr_type: u16, value: u16) -> Result<()> {
        self.append_attr(attr_type, &value.to_ne_bytes())
    }

    pub fn append_attr_u32(&mut self, attr_type: u16, value: u32) -> Result<()> {
        self.append_attr(attr_type, &value.to_ne_bytes())
    }

    pub fn append_attr_u64(&mut self, attr_type: u16, value: u64) -> Result<()> {
        self.append_attr(attr_type, &value.to_ne_bytes())
    }

    /// NUL-terminated string, as `TCA_ACT_KIND` carries it.
    pub fn append_attr_str(&mut self, attr_type: u16, value: &str) -> Result<()> {
        let mut data = Vec::with_capacity(value.len() + 1);
        data.extend_from_slice(value.as_bytes());
        data.push(0);
        self.append_attr(attr_type, &data)
    }

    /// Open a nest whose length is patched by [`nest_end`](Self::nest_end).
    pub fn nest_start(&mut self, attr_type: u16) -> Result<NestToken> {
        self.check(NLA_HDRLEN)?;
        let at = self.body.len();
        self.body
            .extend_from_slice(NlAttr::new(attr_type | NLA_F_NESTED, 0).as_bytes());
        Ok(NestToken { at })
    }

    /// Patch the nest length. A nest longer than `nla_len` can express
    /// fails with [`Error::MessageTooLarge`].
    pub fn nest_end(&mut self, token: NestToken) -> Result<()> {
        let nest_len = attr_len(self.body.len() - token.at)?;
        self.body[token.at..token.at + 2].copy_from_slice(&nest_len.to_ne_bytes());
        self.pad(nla_align(self.body.len()));
        Ok(())
    }

    pub fn set_seq(&mut self, seq: u32) {
        self.header.nlmsg_seq = seq;
    }

    pub fn set_pid(&mut self, pid: u32) {
        self.header.nlmsg_pid = pid;
    }

    /// Serialize header and body into one datagram.
    pub fn finish(mut self) -> Vec<u8> {
        self.header.nlmsg_len = self.len() as u32;
        let mut msg = Vec::with_capacity(self.len());
        msg.extend_from_slice(self.header.as_bytes());
        msg.resize(NLMSG_HDRLEN, 0);
        msg.extend_from_slice(&self.body);
        msg
    }
}
