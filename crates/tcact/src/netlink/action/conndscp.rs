//! conndscp: copy DSCP bits into the conntrack mark.
//!
//! Everything travels in one fixed struct, `TCA_CONNDSCP_PARMS`, including the
//! mode flag byte. Keywords are accepted in a fixed order, each optional:
//!
//! ```text
//! conndscp [mask MASK] [statemask STATEMASK] [mode dscp] [zone ZONE] [CONTROL] [index INDEX]
//! ```

use super::{ActionCodec, ActionConfig, ActionControl, bad_control, illegal, parse_kind_keyword};
use super::{optional_tm, options_table, print_generic, render_failure, require, write_nested};
use crate::netlink::attr::AttrTable;
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::{Error, Result};
use crate::netlink::parse::{Args, get_u16, get_u32, matches};
use crate::netlink::stats::print_tm;
use crate::netlink::types::tc::action::{TcGen, TcfT};
use crate::netlink::types::tc::conndscp::{
    CONNDSCP_FLAG_SETDSCP, TCA_CONNDSCP_MAX, TCA_CONNDSCP_PARMS, TCA_CONNDSCP_TM, TcConndscp,
};
use crate::output::ReportWriter;

const KIND: &str = "conndscp";

const USAGE: &str = "\
Usage: ... conndscp mask MASK statemask STATEMASK mode dscp [zone ZONE] [CONTROL] [index <INDEX>]
where :
\tMASK is the bitmask to store/restore DSCP
\tSTATEMASK is the bitmask to determine conditional storing/restoring
\tMODE dscp
\tZONE is the conntrack zone
\tCONTROL := reclassify | pipe | drop | continue | ok |
\t           goto chain <CHAIN_INDEX>
";

/// Mode names indexed by the masked flag byte.
pub const CONNDSCP_MODES: [&str; 2] = ["?invalid", "dscp"];

/// conndscp action configuration.
///
/// # Example
///
/// ```ignore
/// use tcact::netlink::action::ConndscpAction;
///
/// let action = ConndscpAction::new()
///     .mask(0xfc00_0000)
///     .statemask(0x0100_0000)
///     .mode_dscp()
///     .zone(5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConndscpAction {
    mask: u32,
    statemask: u32,
    mode: u8,
    zone: u16,
    control: ActionControl,
    index: u32,
}

impl ConndscpAction {
    /// Create an action with every field unset and the `pipe` verb.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bits of the conntrack mark that receive the DSCP.
    pub fn mask(mut self, mask: u32) -> Self {
        self.mask = mask;
        self
    }

    /// Bits of the mark that must be set before storing.
    pub fn statemask(mut self, statemask: u32) -> Self {
        self.statemask = statemask;
        self
    }

    /// Turn on DSCP mode.
    pub fn mode_dscp(mut self) -> Self {
        self.mode |= CONNDSCP_FLAG_SETDSCP;
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

    /// Parse tokens starting at the `conndscp` keyword.
    pub fn from_args(args: &mut Args<'_>) -> Result<Self> {
        parse_kind_keyword(args, KIND, USAGE)?;
        let mut action = Self::new();

        if args.peek_matches("mask") {
            args.advance();
            let value = args.next_value("mask").map_err(illegal(KIND, "mask", USAGE))?;
            action.mask = get_u32(value, 0).map_err(illegal(KIND, "mask", USAGE))?;
        }

        if args.peek_matches("statemask") {
            args.advance();
            let value = args
                .next_value("statemask")
                .map_err(illegal(KIND, "statemask", USAGE))?;
            action.statemask = get_u32(value, 0).map_err(illegal(KIND, "statemask", USAGE))?;
        }

        if args.peek_matches("mode") {
            args.advance();
            let value = args.next_value("mode").map_err(illegal(KIND, "mode", USAGE))?;
            if !matches(value, "dscp") {
                return Err(Error::usage(
                    format!("{KIND}: Illegal \"mode\" ({value:?})"),
                    USAGE,
                ));
            }
            action.mode |= CONNDSCP_FLAG_SETDSCP;
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

    fn parms(&self) -> TcConndscp {
        TcConndscp {
            gen_: TcGen::new(self.control.code()).with_index(self.index),
            mask: self.mask,
            statemask: self.statemask,
            zone: self.zone,
            mode: self.mode,
            _pad: 0,
        }
    }
}

impl ActionConfig for ConndscpAction {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn write_options(&self, builder: &mut MessageBuilder) -> Result<()> {
        builder.append_attr_struct(TCA_CONNDSCP_PARMS, &self.parms())
    }
}

/// Decoded conndscp options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConndscpParams {
    pub parms: TcConndscp,
    pub tm: Option<TcfT>,
}

impl ConndscpParams {
    /// Decode the options nest of one instance.
    pub fn parse(options: Option<&[u8]>) -> Result<Self> {
        let table: AttrTable<'_> = options_table(options, TCA_CONNDSCP_MAX, KIND)?;
        Ok(Self {
            parms: require(&table, TCA_CONNDSCP_PARMS, KIND, "TCA_CONNDSCP_PARMS")?,
            tm: optional_tm(&table, TCA_CONNDSCP_TM),
        })
    }

    /// Name of the configured mode.
    pub fn mode_name(&self) -> &'static str {
        CONNDSCP_MODES[usize::from(self.parms.mode & CONNDSCP_FLAG_SETDSCP)]
    }

    /// Render the instance.
    pub fn print(&self, report: &mut ReportWriter, show_stats: bool) {
        let parms = &self.parms;
        print_generic(report, KIND, parms.zone, &parms.gen_);

        report.field("mask", format!(" mask 0x{:08x}", parms.mask), parms.mask);
        report.field(
            "statemask",
            format!(" statemask 0x{:08x}", parms.statemask),
            parms.statemask,
        );
        let mode = self.mode_name();
        report.field("mode", format!(" mode {mode}"), mode);

        if show_stats && let Some(tm) = &self.tm {
            print_tm(report, tm);
        }
        report.text("\n");
    }
}

/// Token and attribute codec for conndscp.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConndscpCodec;

impl ActionCodec for ConndscpCodec {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn usage(&self) -> &'static str {
        USAGE
    }

    fn parse(&self, args: &mut Args<'_>, builder: &mut MessageBuilder, tca_id: u16) -> Result<()> {
        let action = ConndscpAction::from_args(args)?;
        tracing::debug!(?action, "encoding conndscp");
        write_nested(builder, tca_id, &action)
    }

    fn print(
        &self,
        report: &mut ReportWriter,
        options: Option<&[u8]>,
        show_stats: bool,
    ) -> Result<()> {
        let params = ConndscpParams::parse(options).map_err(|e| render_failure(report, KIND, e))?;
        params.print(report, show_stats);
        Ok(())
    }
}
