//! ctinfo, first wire generation.
//!
//! The header travels alone in `TCA_CTINFO_ACT`; the DSCP mask pair is one
//! struct attribute announced by the zero-length `TCA_CTINFO_MODE_DSCP` flag.
//!
//! ```text
//! ctinfo [dscp MASK[/STATEMASK]] [zone ZONE] [CONTROL] [index INDEX]
//! ```
//!
//! A zero mask writes neither the pair nor the flag, so `dscp 0` and no
//! `dscp` clause at all look the same to the kernel.

use super::{ActionCodec, ActionConfig, ActionControl, Field, bad_control, illegal};
use super::{
    optional_tm, options_table, parse_kind_keyword, print_generic, render_failure, require,
    write_nested,
};
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::Result;
use crate::netlink::parse::{Args, get_u16, get_u32};
use crate::netlink::stats::print_tm;
use crate::netlink::types::tc::action::{TcGen, TcfT};
use crate::netlink::types::tc::ctinfo_v1::{
    TCA_CTINFO_ACT, TCA_CTINFO_DSCP_PARMS, TCA_CTINFO_MAX, TCA_CTINFO_MODE_DSCP, TCA_CTINFO_TM,
    TCA_CTINFO_ZONE, TcCtinfoDscp,
};
use crate::output::ReportWriter;

const KIND: &str = "ctinfo";

const USAGE: &str = "\
Usage: ... ctinfo [dscp mask[/statemask]] [zone ZONE] [CONTROL] [index <INDEX>]
where :
\tMASK is the bitmask to store/restore DSCP
\tSTATEMASK is the bitmask to determine conditional storing/restoring
\tMODE dscp
\tZONE is the ctinfo zone
\tCONTROL := reclassify | pipe | drop | continue | ok |
\t           goto chain <CHAIN_INDEX>
";

/// Split `MASK[/STATEMASK]` and parse both halves.
pub(crate) fn parse_dscp_pair(
    value: &str,
    kind: &'static str,
    usage: &'static str,
) -> Result<(u32, u32)> {
    let (mask, statemask) = match value.split_once('/') {
        Some((mask, statemask)) => (mask, Some(statemask)),
        None => (value, None),
    };

    let mask = get_u32(mask, 0).map_err(illegal(kind, "dscp mask", usage))?;
    let statemask = match statemask {
        Some(s) => get_u32(s, 0).map_err(illegal(kind, "dscp statemask", usage))?,
        None => 0,
    };
    Ok((mask, statemask))
}

/// ctinfo configuration for kernels speaking the first generation.
///
/// # Example
///
/// ```ignore
/// use tcact::netlink::action::CtinfoV1Action;
///
/// let action = CtinfoV1Action::new().dscp(0xfc00_0000, 0).zone(2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CtinfoV1Action {
    dscp: TcCtinfoDscp,
    zone: u16,
    control: ActionControl,
    index: u32,
}

impl CtinfoV1Action {
    /// Create an action with DSCP restore disabled and the `pipe` verb.
    pub fn new() -> Self {
        Self::default()
    }

    /// DSCP mask and statemask. A zero mask disables the feature.
    pub fn dscp(mut self, mask: u32, statemask: u32) -> Self {
        self.dscp = TcCtinfoDscp { mask, statemask };
        self
    }

    /// Conntrack zone.
    pub fn zone(mut self, zone: u16) -> Self {
        self.zone = zone;
        self
    }

    /// Control verb.
    pub fn control(mut self, control: ActionControl) -> Self {
        self.control = control;
        self
    }

    /// Instance index.
    pub fn index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Parse tokens starting at the `ctinfo` keyword.
    pub fn from_args(args: &mut Args<'_>) -> Result<Self> {
        parse_kind_keyword(args, KIND, USAGE)?;
        let mut action = Self::new();

        if args.peek_matches("dscp") {
            args.advance();
            let value = args.next_value("dscp").map_err(illegal(KIND, "dscp", USAGE))?;
            let (mask, statemask) = parse_dscp_pair(value, KIND, USAGE)?;
            action.dscp = TcCtinfoDscp { mask, statemask };
        }

        if args.peek_matches("zone") {
            args.advance();
            let value = args.next_value("zone").map_err(illegal(KIND, "zone", USAGE))?;
            action.zone = get_u16(value, 10).map_err(illegal(KIND, "zone", USAGE))?;
        }

        action.control = ActionControl::parse_or(args, ActionControl::PIPE)
            .map_err(bad_control(KIND, USAGE))?;

        if args.peek_matches("index") {
            args.advance();
            let value = args.next_value("index").map_err(illegal(KIND, "index", USAGE))?;
            action.index = get_u32(value, 10).map_err(illegal(KIND, "index", USAGE))?;
        }

        Ok(action)
    }
}

impl ActionConfig for CtinfoV1Action {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn write_options(&self, builder: &mut MessageBuilder) -> Result<()> {
        let header = TcGen::new(self.control.code()).with_index(self.index);
        builder.append_attr_struct(TCA_CTINFO_ACT, &header)?;

        if self.zone != 0 {
            builder.append_attr_u16(TCA_CTINFO_ZONE, self.zone)?;
        }

        if self.dscp.mask != 0 {
            builder.append_attr_struct(TCA_CTINFO_DSCP_PARMS, &self.dscp)?;
            builder.append_attr_empty(TCA_CTINFO_MODE_DSCP)?;
        }

        Ok(())
    }
}

/// Decoded first-generation ctinfo options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtinfoV1Params {
    pub header: TcGen,
    pub zone: u16,
    /// `None` when the DSCP flag is not set. With the flag set, a missing
    /// pair decodes as [`Field::Absent`].
    pub dscp: Option<Field<TcCtinfoDscp>>,
    pub tm: Option<TcfT>,
}

impl CtinfoV1Params {
    /// Decode the options nest of one instance.
    pub fn parse(options: Option<&[u8]>) -> Result<Self> {
        let table = options_table(options, TCA_CTINFO_MAX, KIND)?;
        let header = require(&table, TCA_CTINFO_ACT, KIND, "TCA_CTINFO_ACT")?;

        let dscp = table
            .contains(TCA_CTINFO_MODE_DSCP)
            .then(|| Field::from_attr(table.read::<TcCtinfoDscp>(TCA_CTINFO_DSCP_PARMS)));

        let zone = match table.u16(TCA_CTINFO_ZONE) {
            Some(Ok(zone)) => zone,
            _ => 0,
        };

        Ok(Self {
            header,
            zone,
            dscp,
            tm: optional_tm(&table, TCA_CTINFO_TM),
        })
    }

    /// The DSCP flag is set without a usable mask pair.
    fn dscp_invalid(&self) -> bool {
        self.dscp.is_some_and(|dscp| !matches!(dscp, Field::Value(_)))
    }

    /// Render the instance.
    pub fn print(&self, report: &mut ReportWriter, show_stats: bool) {
        print_generic(report, KIND, self.zone, &self.header);

        if self.dscp_invalid() {
            tracing::warn!("ctinfo dscp flag without a usable mask pair");
            report.field("dscpmask", " [invalid dscp parameters]", "invalid");
        } else if let Some(Field::Value(dscp)) = self.dscp {
            report.field(
                "dscpmask",
                format!(" dscp {:08x}", dscp.mask),
                format!("0x{:08x}", dscp.mask),
            );
            report.field(
                "dscpstatemask",
                format!("/{:08x} ", dscp.statemask),
                format!("0x{:08x}", dscp.statemask),
            );
        }

        if show_stats && let Some(tm) = &self.tm {
            print_tm(report, tm);
        }
        report.text("\n");
    }
}

/// Token and attribute codec for first-generation ctinfo.
#[derive(Debug, Clone, Copy, Default)]
pub struct CtinfoV1Codec;

impl ActionCodec for CtinfoV1Codec {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn usage(&self) -> &'static str {
        USAGE
    }

    fn parse(&self, args: &mut Args<'_>, builder: &mut MessageBuilder, tca_id: u16) -> Result<()> {
        let action = CtinfoV1Action::from_args(args)?;
        tracing::debug!(?action, "encoding ctinfo (v1)");
        write_nested(builder, tca_id, &action)
    }

    fn print(
        &self,
        report: &mut ReportWriter,
        options: Option<&[u8]>,
        show_stats: bool,
    ) -> Result<()> {
        let params = CtinfoV1Params::parse(options).map_err(|e| render_failure(report, KIND, e))?;
        params.print(report, show_stats);
        Ok(())
    }
}
