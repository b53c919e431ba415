//! Traffic control action message types and constants.
//!
//! Values follow the kernel UAPI headers (`linux/rtnetlink.h`,
//! `linux/pkt_cls.h`, `linux/gen_stats.h`, `linux/tc_act/*.h`).

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Action message header (struct tcamsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct TcaMsg {
    /// Address family (AF_UNSPEC).
    pub tca_family: u8,
    /// Padding.
    pub tca_pad1: u8,
    /// Padding.
    pub tca_pad2: u16,
}

impl TcaMsg {
    /// Create a new action message header.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Top-level attributes of an action message.
pub mod root {
    pub const TCA_ROOT_UNSPEC: u16 = 0;
    /// Nest holding one slot per action.
    pub const TCA_ROOT_TAB: u16 = 1;
    pub const TCA_ROOT_FLAGS: u16 = 2;
    pub const TCA_ROOT_COUNT: u16 = 3;
    pub const TCA_ROOT_TIME_DELTA: u16 = 4;
    pub const TCA_ROOT_MAX: u16 = 4;

    /// Maximum number of action slots in one table (TCA_ACT_MAX_PRIO).
    pub const TCA_ACT_MAX_PRIO: u16 = 32;
}

/// Generic statistics attributes (TCA_STATS_*, linux/gen_stats.h).
pub mod stats {
    pub const TCA_STATS_UNSPEC: u16 = 0;
    pub const TCA_STATS_BASIC: u16 = 1;
    pub const TCA_STATS_RATE_EST: u16 = 2;
    pub const TCA_STATS_QUEUE: u16 = 3;
    pub const TCA_STATS_APP: u16 = 4;
    pub const TCA_STATS_RATE_EST64: u16 = 5;
    pub const TCA_STATS_PAD: u16 = 6;
    pub const TCA_STATS_BASIC_HW: u16 = 7;
    pub const TCA_STATS_PKT64: u16 = 8;
    pub const TCA_STATS_MAX: u16 = 8;
}

/// Queue counters (struct gnet_stats_queue).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GnetStatsQueue {
    pub qlen: u32,
    pub backlog: u32,
    pub drops: u32,
    pub requeues: u32,
    pub overlimits: u32,
}

/// Common action attributes and the generic action header.
pub mod action {
    use super::*;

    pub const TCA_ACT_UNSPEC: u16 = 0;
    pub const TCA_ACT_KIND: u16 = 1;
    pub const TCA_ACT_OPTIONS: u16 = 2;
    pub const TCA_ACT_INDEX: u16 = 3;
    pub const TCA_ACT_STATS: u16 = 4;
    pub const TCA_ACT_PAD: u16 = 5;
    pub const TCA_ACT_COOKIE: u16 = 6;
    pub const TCA_ACT_FLAGS: u16 = 7;
    pub const TCA_ACT_MAX: u16 = 7;

    /// Generic action header (the `tc_gen` macro of the UAPI).
    ///
    /// `refcnt` and `bindcnt` are filled in by the kernel on dumps and are
    /// always written as zero.
    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
    pub struct TcGen {
        pub index: u32,
        pub capab: u32,
        pub action: i32,
        pub refcnt: i32,
        pub bindcnt: i32,
    }

    impl TcGen {
        /// Create a header carrying only a control verb.
        pub fn new(action: i32) -> Self {
            Self {
                action,
                ..Default::default()
            }
        }

        /// Set the instance index.
        pub fn with_index(mut self, index: u32) -> Self {
            self.index = index;
            self
        }
    }

    /// Action timestamps in jiffies (struct tcf_t).
    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
    pub struct TcfT {
        pub install: u64,
        pub lastuse: u64,
        pub expires: u64,
        pub firstuse: u64,
    }
}

/// conndscp action (linux/tc_act/tc_conndscp.h).
pub mod conndscp {
    use super::action::TcGen;
    use super::*;

    /// Action id assigned by the kernel.
    pub const TCA_ACT_CONNDSCP: u16 = 99;

    pub const TCA_CONNDSCP_UNSPEC: u16 = 0;
    pub const TCA_CONNDSCP_PARMS: u16 = 1;
    pub const TCA_CONNDSCP_TM: u16 = 2;
    pub const TCA_CONNDSCP_PAD: u16 = 3;
    pub const TCA_CONNDSCP_MAX: u16 = 3;

    pub const CONNDSCP_FLAG_SETDSCP: u8 = 1 << 0;

    /// conndscp parameters (struct tc_conndscp).
    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
    pub struct TcConndscp {
        pub gen_: TcGen,
        pub mask: u32,
        pub statemask: u32,
        pub zone: u16,
        pub mode: u8,
        pub _pad: u8,
    }
}

/// ctinfo action, first wire generation (flag attribute plus embedded pair).
pub mod ctinfo_v1 {
    use super::*;

    pub const TCA_CTINFO_UNSPEC: u16 = 0;
    pub const TCA_CTINFO_ACT: u16 = 1;
    pub const TCA_CTINFO_ZONE: u16 = 2;
    pub const TCA_CTINFO_DSCP_PARMS: u16 = 3;
    pub const TCA_CTINFO_MODE_DSCP: u16 = 4;
    pub const TCA_CTINFO_TM: u16 = 5;
    pub const TCA_CTINFO_PAD: u16 = 6;
    pub const TCA_CTINFO_MAX: u16 = 6;

    pub const CTINFO_MODE_SETDSCP: u32 = 1 << 0;

    /// DSCP mask pair (struct tc_ctinfo_dscp).
    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
    pub struct TcCtinfoDscp {
        pub mask: u32,
        pub statemask: u32,
    }
}

/// ctinfo action, current wire generation (one attribute per field).
pub mod ctinfo {
    pub const TCA_CTINFO_UNSPEC: u16 = 0;
    pub const TCA_CTINFO_PAD: u16 = 1;
    pub const TCA_CTINFO_TM: u16 = 2;
    pub const TCA_CTINFO_ACT: u16 = 3;
    pub const TCA_CTINFO_ZONE: u16 = 4;
    pub const TCA_CTINFO_PARMS_DSCP_MASK: u16 = 5;
    pub const TCA_CTINFO_PARMS_DSCP_STATEMASK: u16 = 6;
    pub const TCA_CTINFO_PARMS_CPMARK_MASK: u16 = 7;
    pub const TCA_CTINFO_STATS_DSCP_SET: u16 = 8;
    pub const TCA_CTINFO_STATS_DSCP_ERROR: u16 = 9;
    pub const TCA_CTINFO_STATS_CPMARK_SET: u16 = 10;
    pub const TCA_CTINFO_MAX: u16 = 10;
}
