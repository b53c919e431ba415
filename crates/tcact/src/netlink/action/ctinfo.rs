//! ctinfo: restore DSCP and/or the conntrack mark into the packet.
//!
//! Every parameter is its own attribute and only non-zero values are sent.
//! `dscp`, `cpmark` and `zone` may come in any order:
//!
//! ```text
//! ctinfo [dscp MASK[/STATEMASK]] [cpmark [MASK]] [zone ZONE] [CONTROL] [index INDEX]
//! ```

use super::ctinfo_v1::parse_dscp_pair;
use super::{ActionCodec, ActionConfig, ActionControl, Field, bad_control, illegal};
use super::{
    optional_tm, options_table, parse_kind_keyword, print_generic, render_failure, require,
    write_nested,
};
use crate::netlink::attr::AttrTable;
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::Result;
use crate::netlink::parse::{Args, get_u16, get_u32, matches};
use crate::netlink::stats::print_tm;
use crate::netlink::types::tc::action::{TcGen, TcfT};
use crate::netlink::types::tc::ctinfo::{
    TCA_CTINFO_ACT, TCA_CTINFO_MAX, TCA_CTINFO_PARMS_CPMARK_MASK, TCA_CTINFO_PARMS_DSCP_MASK,
    TCA_CTINFO_PARMS_DSCP_STATEMASK, TCA_CTINFO_STATS_CPMARK_SET, TCA_CTINFO_STATS_DSCP_ERROR,
    TCA_CTINFO_STATS_DSCP_SET, TCA_CTINFO_TM, TCA_CTINFO_ZONE,
};
use crate::output::ReportWriter;

const KIND: &str = "ctinfo";

const USAGE: &str = "\
Usage: ... ctinfo [dscp mask[/statemask]] [cpmark [mask]] [zone ZONE] [CONTROL] [index <INDEX>]
where :
\tdscp MASK bitmask location of stored DSCP
\t     STATEMASK bitmask to determine conditional restoring
\tcpmark MASK mask applied to mark on restoration
\tZONE is the conntrack zone
\tCONTROL := reclassify | pipe | drop | continue | ok |
\t           goto chain <CHAIN_INDEX>
";

/// Values rendered for parameters the kernel did not send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtinfoDefaults {
    pub dscp_mask: u32,
    pub dscp_statemask: u32,
    pub cpmark_mask: u32,
}

/// An absent cpmark mask means the whole mark is restored.
pub const CTINFO_DEFAULTS: CtinfoDefaults = CtinfoDefaults {
    dscp_mask: 0,
    dscp_statemask: 0,
    cpmark_mask: u32::MAX,
};

/// ctinfo action configuration.
///
/// # Example
///
/// ```ignore
/// use tcact::netlink::action::CtinfoAction;
///
/// // Restore DSCP from bits 26-31 of the mark when bit 24 is set,
/// // and copy the whole mark.
/// let action = CtinfoAction::new()
///     .dscp(0xfc00_0000, 0x0100_0000)
///     .cpmark(u32::MAX)
///     .zone(5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CtinfoAction {
    dscp_mask: u32,
    dscp_statemask: u32,
    cpmark_mask: u32,
    zone: u16,
    control: ActionControl,
    index: u32,
}

impl CtinfoAction {
    /// Create an action that restores nothing, with the `pipe` verb.
    pub fn new() -> Self {
        Self::default()
    }

    /// DSCP mask and statemask. A zero mask disables DSCP restore.
    pub fn dscp(mut self, mask: u32, statemask: u32) -> Self {
        self.dscp_mask = mask;
        self.dscp_statemask = statemask;
        self
    }

    /// Mask applied to the conntrack mark. Zero disables mark restore.
    pub fn cpmark(mut self, mask: u32) -> Self {
        self.cpmark_mask = mask;
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

        while let Some(token) = args.peek() {
            if matches(token, "dscp") {
                args.advance();
                let value = args.next_value("dscp").map_err(illegal(KIND, "dscp", USAGE))?;
                (action.dscp_mask, action.dscp_statemask) = parse_dscp_pair(value, KIND, USAGE)?;
            } else if matches(token, "cpmark") {
                args.advance();
                // The mask is optional; a following keyword is put back.
                action.cpmark_mask = match args.next_token().map(|value| get_u32(value, 0)) {
                    Some(Ok(mask)) => mask,
                    Some(Err(_)) => {
                        args.rewind();
                        CTINFO_DEFAULTS.cpmark_mask
                    }
                    None => CTINFO_DEFAULTS.cpmark_mask,
                };
            } else if matches(token, "zone") {
                args.advance();
                let value = args.next_value("zone").map_err(illegal(KIND, "zone", USAGE))?;
                action.zone = get_u16(value, 10).map_err(illegal(KIND, "zone", USAGE))?;
            } else {
                break;
            }
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

impl ActionConfig for CtinfoAction {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn write_options(&self, builder: &mut MessageBuilder) -> Result<()> {
        let header = TcGen::new(self.control.code()).with_index(self.index);
        builder.append_attr_struct(TCA_CTINFO_ACT, &header)?;

        if self.zone != 0 {
            builder.append_attr_u16(TCA_CTINFO_ZONE, self.zone)?;
        }

        if self.dscp_mask != 0 {
            builder.append_attr_u32(TCA_CTINFO_PARMS_DSCP_MASK, self.dscp_mask)?;
            if self.dscp_statemask != 0 {
                builder.append_attr_u32(TCA_CTINFO_PARMS_DSCP_STATEMASK, self.dscp_statemask)?;
            }
        }

        if self.cpmark_mask != 0 {
            builder.append_attr_u32(TCA_CTINFO_PARMS_CPMARK_MASK, self.cpmark_mask)?;
        }

        Ok(())
    }
}

/// Decoded ctinfo options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtinfoParams {
    pub header: TcGen,
    pub zone: u16,
    pub dscp_mask: Field<u32>,
    pub dscp_statemask: Field<u32>,
    pub cpmark_mask: Field<u32>,
    pub tm: Option<TcfT>,
    pub dscp_set: Option<u64>,
    pub dscp_error: Option<u64>,
    pub cpmark_set: Option<u64>,
}

fn counter(table: &AttrTable<'_>, attr_type: u16) -> Option<u64> {
    match table.u64(attr_type)? {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(attr_type, error = %e, "ignoring malformed ctinfo counter");
            None
        }
    }
}

impl CtinfoParams {
    /// Decode the options nest of one instance.
    pub fn parse(options: Option<&[u8]>) -> Result<Self> {
        let table = options_table(options, TCA_CTINFO_MAX, KIND)?;
        let header = require(&table, TCA_CTINFO_ACT, KIND, "TCA_CTINFO_ACT")?;

        let zone = match table.u16(TCA_CTINFO_ZONE) {
            Some(Ok(zone)) => zone,
            _ => 0,
        };

        Ok(Self {
            header,
            zone,
            dscp_mask: Field::from_attr(table.u32(TCA_CTINFO_PARMS_DSCP_MASK)),
            dscp_statemask: Field::from_attr(table.u32(TCA_CTINFO_PARMS_DSCP_STATEMASK)),
            cpmark_mask: Field::from_attr(table.u32(TCA_CTINFO_PARMS_CPMARK_MASK)),
            tm: optional_tm(&table, TCA_CTINFO_TM),
            dscp_set: counter(&table, TCA_CTINFO_STATS_DSCP_SET),
            dscp_error: counter(&table, TCA_CTINFO_STATS_DSCP_ERROR),
            cpmark_set: counter(&table, TCA_CTINFO_STATS_CPMARK_SET),
        })
    }

    /// Render the instance, filling absent parameters from `defaults`.
    pub fn print(&self, report: &mut ReportWriter, show_stats: bool, defaults: &CtinfoDefaults) {
        print_generic(report, KIND, self.zone, &self.header);

        // An undersized field never resolves, so its key is free for the marker.
        let placeholders = [
            (self.dscp_mask, "dscpmask", " [invalid dscp mask parameter]"),
            (self.dscp_statemask, "dscpstatemask", " [invalid dscp statemask parameter]"),
            (self.cpmark_mask, "cpmark", " [invalid cpmark parameter]"),
        ];
        for (field, key, text) in placeholders {
            if field.is_invalid() {
                tracing::warn!(placeholder = text.trim(), "undersized ctinfo parameter");
                report.field(key, text, "invalid");
            }
        }

        let dscp_mask = self.dscp_mask.resolve(defaults.dscp_mask);
        if let Some(mask) = dscp_mask.filter(|&mask| mask != 0) {
            report.field("dscpmask", format!(" dscp 0x{mask:08x}"), format!("0x{mask:08x}"));
            if let Some(statemask) = self.dscp_statemask.resolve(defaults.dscp_statemask) {
                report.field(
                    "dscpstatemask",
                    format!("/0x{statemask:08x}"),
                    format!("0x{statemask:08x}"),
                );
            }
        }

        let cpmark_mask = self.cpmark_mask.resolve(defaults.cpmark_mask);
        if let Some(mask) = cpmark_mask.filter(|&mask| mask != 0) {
            report.field("cpmark", format!(" cpmark 0x{mask:08x}"), format!("0x{mask:08x}"));
        }

        if show_stats {
            if let Some(tm) = &self.tm {
                print_tm(report, tm);
            }
            let counters = [
                (self.dscp_set, "dscpset", "DSCP set"),
                (self.dscp_error, "dscperror", "DSCP error"),
                (self.cpmark_set, "cpmarkset", "CPMARK set"),
            ];
            for (value, key, label) in counters {
                if let Some(value) = value {
                    report.field(key, format!(" {label} {value}"), value);
                }
            }
        }
        report.text("\n");
    }
}

/// Token and attribute codec for ctinfo.
#[derive(Debug, Clone, Copy, Default)]
pub struct CtinfoCodec;

impl ActionCodec for CtinfoCodec {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn usage(&self) -> &'static str {
        USAGE
    }

    fn parse(&self, args: &mut Args<'_>, builder: &mut MessageBuilder, tca_id: u16) -> Result<()> {
        let action = CtinfoAction::from_args(args)?;
        tracing::debug!(?action, "encoding ctinfo");
        write_nested(builder, tca_id, &action)
    }

    fn print(
        &self,
        report: &mut ReportWriter,
        options: Option<&[u8]>,
        show_stats: bool,
    ) -> Result<()> {
        let params = CtinfoParams::parse(options).map_err(|e| render_failure(report, KIND, e))?;
        params.print(report, show_stats, &CTINFO_DEFAULTS);
        Ok(())
    }
}
