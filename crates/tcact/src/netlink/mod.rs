//! Netlink encoding, decoding and transport for tc actions.
//!
//! # Quick Start
//!
//! ```ignore
//! use tcact::netlink::{Connection, NLMSG_HDRLEN};
//! use tcact::netlink::action::{ActionList, CtinfoAction, CtinfoWire, add_request, dump_request};
//! use tcact::netlink::action::print_action_message;
//!
//! let conn = Connection::new()?;
//!
//! let actions = ActionList::new().add(CtinfoAction::new().cpmark(0xff).zone(2));
//! conn.request_ack(add_request(&actions)?).await?;
//!
//! for msg in conn.dump(dump_request("ctinfo")?).await? {
//!     let dump = print_action_message(&msg[NLMSG_HDRLEN..], CtinfoWire::V2, false)?;
//!     for report in &dump.reports {
//!         print!("{}", report.text());
//!     }
//! }
//! ```

pub mod action;
pub mod attr;
mod builder;
pub mod connection;
mod error;
pub mod message;
pub mod parse;
mod socket;
pub mod stats;
pub mod types;

pub use attr::{AttrIter, AttrTable, NlAttr};
pub use builder::{MAX_MSG, MessageBuilder, NestToken};
pub use connection::Connection;
pub use error::{Error, Result};
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use socket::NetlinkSocket;
