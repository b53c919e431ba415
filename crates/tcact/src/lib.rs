//! Netlink codecs for the `conndscp` and `ctinfo` traffic control actions.
//!
//! Both actions copy information between a packet's DSCP field and the
//! conntrack mark of its connection. This crate turns tc-style command
//! tokens into the nested attributes the kernel expects, and turns kernel
//! replies back into text or JSON reports.
//!
//! `ctinfo` exists in two wire generations that share a kind string but not
//! their attribute numbering. The generation is picked once per invocation
//! with [`netlink::action::CtinfoWire`].
//!
//! # Example
//!
//! ```ignore
//! use tcact::netlink::action::{CtinfoWire, codec_for, new_action_request, ActionOp};
//! use tcact::netlink::action::{parse_action_list, print_action_message};
//! use tcact::netlink::parse::Args;
//!
//! let tokens = ["ctinfo", "dscp", "0xfc000000/0x01000000", "cpmark", "zone", "5"];
//! let mut args = Args::new(&tokens);
//! let mut request = new_action_request(ActionOp::Add)?;
//! parse_action_list(&mut args, CtinfoWire::V2, &mut request)?;
//!
//! // Render what was encoded without talking to the kernel
//! let dump = print_action_message(request.payload(), CtinfoWire::V2, false)?;
//! print!("{}", dump.reports[0].text());
//! ```

pub mod netlink;
pub mod output;

// Re-export common types at crate root for convenience
pub use netlink::{Connection, Error, Result};
