//! Action parameter codecs.
//!
//! Each action kind is available two ways:
//!
//! - a typed builder implementing [`ActionConfig`] ([`ConndscpAction`],
//!   [`CtinfoAction`], [`CtinfoV1Action`]) for programmatic use;
//! - an [`ActionCodec`] that parses tc-style command tokens into attributes
//!   and renders kernel replies back into a report.
//!
//! # Example
//!
//! ```ignore
//! use tcact::netlink::action::{ActionList, CtinfoAction, add_request};
//!
//! let actions = ActionList::new()
//!     .add(CtinfoAction::new().dscp(0xfc00_0000, 0x0100_0000).zone(5));
//!
//! conn.request_ack(add_request(&actions)?).await?;
//! ```

mod conndscp;
mod control;
mod ctinfo;
mod ctinfo_v1;

pub use conndscp::{CONNDSCP_MODES, ConndscpAction, ConndscpCodec, ConndscpParams};
pub use control::*;
pub use ctinfo::{CTINFO_DEFAULTS, CtinfoAction, CtinfoCodec, CtinfoDefaults, CtinfoParams};
pub use ctinfo_v1::{CtinfoV1Action, CtinfoV1Codec, CtinfoV1Params};

use std::fmt;
use std::str::FromStr;

use super::attr::{AttrIter, AttrTable};
use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{
    NLM_F_ACK, NLM_F_CREATE, NLM_F_DUMP, NLM_F_EXCL, NLM_F_REPLACE, NLM_F_REQUEST, NLM_F_ROOT,
    NlMsgType,
};
use super::parse::{Args, ParseError, matches};
use super::stats::ActionStats;
use super::types::tc::TcaMsg;
use super::types::tc::action::{
    TCA_ACT_INDEX, TCA_ACT_KIND, TCA_ACT_MAX, TCA_ACT_OPTIONS, TCA_ACT_STATS, TcGen, TcfT,
};
use super::types::tc::root::{TCA_ACT_MAX_PRIO, TCA_ROOT_MAX, TCA_ROOT_TAB};
use crate::output::{ActionReport, PrintableList, ReportWriter};

// ============================================================================
// Traits
// ============================================================================

/// Trait for action configurations that can be applied.
pub trait ActionConfig: Send + Sync {
    /// Get the action kind (e.g., "ctinfo", "conndscp").
    fn kind(&self) -> &'static str;

    /// Write the action options to a message builder.
    fn write_options(&self, builder: &mut MessageBuilder) -> Result<()>;
}

/// Parse and print capability of one action kind.
pub trait ActionCodec: Send + Sync {
    /// Kernel kind string.
    fn kind(&self) -> &'static str;

    /// Canonical usage text.
    fn usage(&self) -> &'static str;

    /// Parse tokens starting at the kind keyword and write the options nest
    /// under `tca_id`.
    ///
    /// Tokens after the last recognized clause are left in `args`.
    fn parse(&self, args: &mut Args<'_>, builder: &mut MessageBuilder, tca_id: u16)
    -> Result<()>;

    /// Render the options nest of one action instance.
    ///
    /// An error means this instance could not be rendered; a placeholder has
    /// already been written to `report` and other instances are unaffected.
    fn print(&self, report: &mut ReportWriter, options: Option<&[u8]>, show_stats: bool)
    -> Result<()>;
}

/// Write `action` as a nest of type `tca_id`.
pub fn write_nested(
    builder: &mut MessageBuilder,
    tca_id: u16,
    action: &dyn ActionConfig,
) -> Result<()> {
    let nest = builder.nest_start(tca_id)?;
    action.write_options(builder)?;
    builder.nest_end(nest)?;
    Ok(())
}

// ============================================================================
// Wire generations and registry
// ============================================================================

/// Wire generation used for the `ctinfo` kind.
///
/// The generations share a kind string but not their attribute numbering,
/// and nothing on the wire tells them apart, so the choice is made once by
/// the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CtinfoWire {
    /// Header attribute, flag attribute and embedded mask pair.
    V1,
    /// One attribute per field, with cpmark and counters.
    #[default]
    V2,
}

impl fmt::Display for CtinfoWire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("v1"),
            Self::V2 => f.write_str("v2"),
        }
    }
}

impl FromStr for CtinfoWire {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "v1" | "1" => Ok(Self::V1),
            "v2" | "2" => Ok(Self::V2),
            other => Err(Error::Parse(format!("unknown ctinfo wire generation: {other}"))),
        }
    }
}

static CONNDSCP: ConndscpCodec = ConndscpCodec;
static CTINFO: CtinfoCodec = CtinfoCodec;
static CTINFO_V1: CtinfoV1Codec = CtinfoV1Codec;

/// Look up the codec for a kernel kind string.
pub fn codec_for(kind: &str, wire: CtinfoWire) -> Option<&'static dyn ActionCodec> {
    match (kind, wire) {
        ("conndscp", _) => Some(&CONNDSCP),
        ("ctinfo", CtinfoWire::V2) => Some(&CTINFO),
        ("ctinfo", CtinfoWire::V1) => Some(&CTINFO_V1),
        _ => None,
    }
}

/// Kinds with a codec.
pub const KINDS: &[&str] = &["conndscp", "ctinfo"];

// ============================================================================
// Shared codec helpers
// ============================================================================

/// Decoded state of one optional attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<T> {
    /// Not sent.
    Absent,
    /// Sent, but shorter than its type.
    Invalid,
    /// Sent and well formed.
    Value(T),
}

impl<T: Copy> Field<T> {
    /// Classify an attribute lookup result.
    pub fn from_attr(attr: Option<Result<T>>) -> Self {
        match attr {
            None => Self::Absent,
            Some(Ok(value)) => Self::Value(value),
            Some(Err(_)) => Self::Invalid,
        }
    }

    /// Value to render: the attribute if valid, `default` if absent,
    /// nothing if invalid.
    pub fn resolve(self, default: T) -> Option<T> {
        match self {
            Self::Absent => Some(default),
            Self::Invalid => None,
            Self::Value(value) => Some(value),
        }
    }

    /// Check whether the attribute was sent but malformed.
    pub fn is_invalid(self) -> bool {
        matches!(self, Self::Invalid)
    }
}

/// Consume the kind keyword (possibly repeated) that starts an action.
pub(crate) fn parse_kind_keyword(
    args: &mut Args<'_>,
    kind: &'static str,
    usage: &'static str,
) -> Result<()> {
    let mut seen = false;
    while let Some(token) = args.peek() {
        if matches(token, kind) {
            seen = true;
            args.advance();
        } else if matches(token, "help") {
            return Err(Error::usage(format!("{kind}: help requested"), usage));
        } else {
            break;
        }
    }

    if !seen {
        return Err(Error::usage(
            format!("{kind}: expected \"{kind}\" keyword"),
            usage,
        ));
    }
    Ok(())
}

/// Map a token error to a usage error naming the offending field.
pub(crate) fn illegal(
    kind: &'static str,
    what: &'static str,
    usage: &'static str,
) -> impl Fn(ParseError) -> Error {
    move |e| Error::usage(format!("{kind}: Illegal \"{what}\" ({e})"), usage)
}

/// Map a control clause error to a usage error.
pub(crate) fn bad_control(kind: &'static str, usage: &'static str) -> impl Fn(ParseError) -> Error {
    move |e| Error::usage(format!("{kind}: bad control action: {e}"), usage)
}

/// Parse the options nest of one instance.
pub(crate) fn options_table<'a>(
    options: Option<&'a [u8]>,
    max_type: u16,
    kind: &'static str,
) -> Result<AttrTable<'a>> {
    let data = options.ok_or(Error::MissingAttribute {
        kind,
        attr: "TCA_ACT_OPTIONS",
    })?;
    Ok(AttrTable::parse(data, max_type))
}

/// Read a mandatory header struct.
pub(crate) fn require<T: zerocopy::FromBytes>(
    table: &AttrTable<'_>,
    attr_type: u16,
    kind: &'static str,
    attr: &'static str,
) -> Result<T> {
    table
        .read::<T>(attr_type)
        .unwrap_or(Err(Error::MissingAttribute { kind, attr }))
}

/// Write the placeholder for an instance whose parameters could not be
/// decoded and hand the error back.
pub(crate) fn render_failure(report: &mut ReportWriter, kind: &'static str, err: Error) -> Error {
    let text = match &err {
        Error::MissingAttribute { .. } => format!("[NULL {kind} parameters]"),
        _ => format!("[invalid {kind} parameters]"),
    };
    tracing::warn!(kind, error = %err, "action parameters not decoded");
    report.json("error", text.clone());
    report.text(text);
    err
}

/// Decode an optional timestamp attribute.
pub(crate) fn optional_tm(table: &AttrTable<'_>, attr_type: u16) -> Option<TcfT> {
    match table.read::<TcfT>(attr_type)? {
        Ok(tm) => Some(tm),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed timestamps");
            None
        }
    }
}

/// Render kind, zone, control verb and the generic header counters.
pub(crate) fn print_generic(report: &mut ReportWriter, kind: &str, zone: u16, header: &TcGen) {
    report.field("kind", format!("{kind} "), kind);
    report.field("zone", format!("zone {zone}"), zone);

    let control = ActionControl::from_raw(header.action);
    report.field("control_action", format!(" {control}"), control.to_json());

    report.text("\n");
    report.field("index", format!("\t index {}", header.index), header.index);
    report.field("ref", format!(" ref {}", header.refcnt), header.refcnt);
    report.field("bind", format!(" bind {}", header.bindcnt), header.bindcnt);
}

// ============================================================================
// ActionList - several actions in one request
// ============================================================================

/// A list of actions sent in one request.
///
/// # Example
///
/// ```ignore
/// use tcact::netlink::action::{ActionList, ConndscpAction, CtinfoAction};
///
/// let actions = ActionList::new()
///     .add(ConndscpAction::new().mask(0xfc00_0000).mode_dscp())
///     .add(CtinfoAction::new().cpmark(u32::MAX));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionList {
    actions: Vec<Box<dyn ActionConfigDyn>>,
}

/// Trait for dynamic action dispatch.
pub trait ActionConfigDyn: Send + Sync + fmt::Debug {
    fn kind(&self) -> &'static str;
    fn write_options(&self, builder: &mut MessageBuilder) -> Result<()>;
    fn clone_box(&self) -> Box<dyn ActionConfigDyn>;
}

impl<T: ActionConfig + Clone + fmt::Debug + 'static> ActionConfigDyn for T {
    fn kind(&self) -> &'static str {
        ActionConfig::kind(self)
    }

    fn write_options(&self, builder: &mut MessageBuilder) -> Result<()> {
        ActionConfig::write_options(self, builder)
    }

    fn clone_box(&self) -> Box<dyn ActionConfigDyn> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ActionConfigDyn> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl ActionList {
    /// Create a new empty action list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action to the list.
    pub fn add<T: ActionConfig + Clone + fmt::Debug + 'static>(mut self, action: T) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Get the number of actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Write one slot nest per action (1-based order) at the current level.
    pub fn write_to(&self, builder: &mut MessageBuilder) -> Result<()> {
        if self.actions.len() > TCA_ACT_MAX_PRIO as usize {
            return Err(Error::InvalidMessage(format!(
                "too many actions: {} (at most {})",
                self.actions.len(),
                TCA_ACT_MAX_PRIO
            )));
        }

        for (i, action) in self.actions.iter().enumerate() {
            let slot = builder.nest_start((i + 1) as u16)?;
            builder.append_attr_str(TCA_ACT_KIND, action.kind())?;

            let options = builder.nest_start(TCA_ACT_OPTIONS)?;
            action.write_options(builder)?;
            builder.nest_end(options)?;

            builder.nest_end(slot)?;
        }
        Ok(())
    }
}

// ============================================================================
// Requests
// ============================================================================

/// How a new-action request treats an existing instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOp {
    /// Create, failing if the index exists.
    Add,
    /// Modify an existing instance.
    Change,
    /// Create or overwrite.
    Replace,
}

impl ActionOp {
    fn flags(self) -> u16 {
        match self {
            Self::Add => NLM_F_CREATE | NLM_F_EXCL,
            Self::Change => NLM_F_REPLACE,
            Self::Replace => NLM_F_CREATE | NLM_F_REPLACE,
        }
    }

    /// Verb used in error context.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Replace => "replace",
        }
    }
}

fn action_message(msg_type: u16, flags: u16) -> Result<MessageBuilder> {
    let mut builder = MessageBuilder::new(msg_type, NLM_F_REQUEST | flags);
    builder.append(&TcaMsg::new())?;
    Ok(builder)
}

/// Start an `RTM_NEWACTION` request; the caller fills `TCA_ROOT_TAB`.
pub fn new_action_request(op: ActionOp) -> Result<MessageBuilder> {
    action_message(NlMsgType::RTM_NEWACTION, NLM_F_ACK | op.flags())
}

fn new_with_list(op: ActionOp, actions: &ActionList) -> Result<MessageBuilder> {
    let mut builder = new_action_request(op)?;
    let tab = builder.nest_start(TCA_ROOT_TAB)?;
    actions.write_to(&mut builder)?;
    builder.nest_end(tab)?;
    Ok(builder)
}

/// Build a request creating new actions.
pub fn add_request(actions: &ActionList) -> Result<MessageBuilder> {
    new_with_list(ActionOp::Add, actions)
}

/// Build a request modifying existing actions.
pub fn change_request(actions: &ActionList) -> Result<MessageBuilder> {
    new_with_list(ActionOp::Change, actions)
}

/// Build a request creating or overwriting actions.
pub fn replace_request(actions: &ActionList) -> Result<MessageBuilder> {
    new_with_list(ActionOp::Replace, actions)
}

fn by_kind(msg_type: u16, flags: u16, kind: &str, index: Option<u32>) -> Result<MessageBuilder> {
    let mut builder = action_message(msg_type, flags)?;
    let tab = builder.nest_start(TCA_ROOT_TAB)?;
    let slot = builder.nest_start(1)?;
    builder.append_attr_str(TCA_ACT_KIND, kind)?;
    if let Some(index) = index {
        builder.append_attr_u32(TCA_ACT_INDEX, index)?;
    }
    builder.nest_end(slot)?;
    builder.nest_end(tab)?;
    Ok(builder)
}

/// Build a request fetching one action instance.
pub fn get_request(kind: &str, index: u32) -> Result<MessageBuilder> {
    by_kind(NlMsgType::RTM_GETACTION, 0, kind, Some(index))
}

/// Build a request deleting one action instance.
pub fn delete_request(kind: &str, index: u32) -> Result<MessageBuilder> {
    by_kind(NlMsgType::RTM_DELACTION, NLM_F_ACK, kind, Some(index))
}

/// Build a request dumping every instance of a kind.
pub fn dump_request(kind: &str) -> Result<MessageBuilder> {
    by_kind(NlMsgType::RTM_GETACTION, NLM_F_DUMP, kind, None)
}

/// Build a request deleting every instance of a kind.
pub fn flush_request(kind: &str) -> Result<MessageBuilder> {
    by_kind(NlMsgType::RTM_DELACTION, NLM_F_ACK | NLM_F_ROOT, kind, None)
}

/// Parse `KIND PARAMS... [action KIND PARAMS...]...` into `TCA_ROOT_TAB`.
///
/// Returns the number of actions written.
pub fn parse_action_list(
    args: &mut Args<'_>,
    wire: CtinfoWire,
    builder: &mut MessageBuilder,
) -> Result<usize> {
    let tab = builder.nest_start(TCA_ROOT_TAB)?;
    let mut order: u16 = 0;

    loop {
        let Some(kind) = args.peek() else {
            return Err(Error::Parse("missing action kind".into()));
        };
        let codec = codec_for(kind, wire).ok_or_else(|| {
            Error::Parse(format!(
                "unknown action kind \"{kind}\" (supported: {})",
                KINDS.join(", ")
            ))
        })?;

        order += 1;
        if order > TCA_ACT_MAX_PRIO {
            return Err(Error::Parse(format!(
                "too many actions, at most {TCA_ACT_MAX_PRIO} per request"
            )));
        }

        let slot = builder.nest_start(order)?;
        builder.append_attr_str(TCA_ACT_KIND, codec.kind())?;
        codec.parse(args, builder, TCA_ACT_OPTIONS)?;
        builder.nest_end(slot)?;
        tracing::debug!(order, kind = codec.kind(), "action encoded");

        match args.peek() {
            None => break,
            Some(token) if token == "action" => args.advance(),
            Some(token) => {
                return Err(Error::usage(
                    format!("{}: unexpected argument \"{token}\"", codec.kind()),
                    codec.usage(),
                ));
            }
        }
    }

    builder.nest_end(tab)?;
    Ok(order as usize)
}

// ============================================================================
// Replies
// ============================================================================

/// Reports for every action instance of one message.
#[derive(Debug, Clone, Default)]
pub struct ActionDump {
    /// One report per slot, in wire order.
    pub reports: Vec<ActionReport>,
    /// Number of instances that failed to render.
    pub failed: usize,
}

impl ActionDump {
    /// Append the reports of another message.
    pub fn merge(&mut self, other: ActionDump) {
        self.failed += other.failed;
        self.reports.extend(other.reports);
    }
}

impl PrintableList for ActionDump {
    type Item = ActionReport;

    fn items(&self) -> &[ActionReport] {
        &self.reports
    }
}

/// Render the actions of an `RTM_*ACTION` message payload (after the netlink
/// header).
///
/// Instances that fail to decode still produce a report with a placeholder
/// and are counted in [`ActionDump::failed`].
pub fn print_action_message(payload: &[u8], wire: CtinfoWire, show_stats: bool) -> Result<ActionDump> {
    let hdr_len = std::mem::size_of::<TcaMsg>();
    let attrs = payload.get(hdr_len..).ok_or(Error::Truncated {
        expected: hdr_len,
        actual: payload.len(),
    })?;

    let root = AttrTable::parse(attrs, TCA_ROOT_MAX);
    let tab = root.get(TCA_ROOT_TAB).ok_or(Error::MissingAttribute {
        kind: "action",
        attr: "TCA_ROOT_TAB",
    })?;

    let mut dump = ActionDump::default();
    for (order, slot) in AttrIter::new(tab) {
        let report = print_one_action(order, slot, wire, show_stats);
        if report.failed() {
            dump.failed += 1;
        }
        dump.reports.push(report);
    }

    Ok(dump)
}

fn print_one_action(order: u16, slot: &[u8], wire: CtinfoWire, show_stats: bool) -> ActionReport {
    let mut report = ReportWriter::new();
    report.field("order", format!("action order {order}: "), order);

    let table = AttrTable::parse(slot, TCA_ACT_MAX);
    let kind = match table.string(TCA_ACT_KIND) {
        Some(Ok(kind)) => kind,
        _ => {
            tracing::warn!(order, "action without kind");
            report.text("[NULL action kind]\n");
            return report.finish(true);
        }
    };

    let Some(codec) = codec_for(kind, wire) else {
        tracing::warn!(order, kind, "no codec for action kind");
        report.field("kind", format!("[unknown action kind \"{kind}\"]\n"), kind);
        return report.finish(true);
    };

    if let Err(e) = codec.print(&mut report, table.get(TCA_ACT_OPTIONS), show_stats) {
        tracing::debug!(order, kind, error = %e, "action not rendered");
        report.text("\n");
        return report.finish(true);
    }

    if show_stats && let Some(stats) = table.get(TCA_ACT_STATS) {
        match ActionStats::parse(stats) {
            Ok(stats) => {
                stats.print(&mut report);
                report.text("\n");
            }
            Err(e) => tracing::warn!(order, kind, error = %e, "malformed action statistics"),
        }
    }

    report.finish(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags_of(builder: &MessageBuilder) -> u16 {
        builder.header().nlmsg_flags
    }

    fn tab_slots(builder: &MessageBuilder) -> Vec<(u16, Vec<u8>)> {
        let attrs = &builder.payload()[std::mem::size_of::<TcaMsg>()..];
        let root = AttrTable::parse(attrs, TCA_ROOT_MAX);
        AttrIter::new(root.get(TCA_ROOT_TAB).unwrap())
            .map(|(order, data)| (order, data.to_vec()))
            .collect()
    }

    #[test]
    fn test_codec_registry() {
        assert_eq!(codec_for("conndscp", CtinfoWire::V2).unwrap().kind(), "conndscp");
        assert_eq!(codec_for("ctinfo", CtinfoWire::V1).unwrap().kind(), "ctinfo");
        assert!(
            codec_for("ctinfo", CtinfoWire::V2)
                .unwrap()
                .usage()
                .contains("cpmark")
        );
        assert!(
            !codec_for("ctinfo", CtinfoWire::V1)
                .unwrap()
                .usage()
                .contains("cpmark")
        );
        assert!(codec_for("gact", CtinfoWire::V2).is_none());
    }

    #[test]
    fn test_wire_from_str() {
        assert_eq!("v1".parse::<CtinfoWire>().unwrap(), CtinfoWire::V1);
        assert_eq!("2".parse::<CtinfoWire>().unwrap(), CtinfoWire::V2);
        assert!("v3".parse::<CtinfoWire>().is_err());
        assert_eq!(CtinfoWire::default().to_string(), "v2");
    }

    #[test]
    fn test_field_resolution() {
        assert_eq!(Field::<u32>::from_attr(None).resolve(u32::MAX), Some(u32::MAX));
        assert_eq!(Field::from_attr(Some(Ok(0x10u32))).resolve(u32::MAX), Some(0x10));
        let invalid = Field::<u32>::from_attr(Some(Err(Error::Truncated {
            expected: 4,
            actual: 2,
        })));
        assert!(invalid.is_invalid());
        assert_eq!(invalid.resolve(u32::MAX), None);
    }

    #[test]
    fn test_request_flags() {
        let list = ActionList::new().add(CtinfoAction::new());

        let add = add_request(&list).unwrap();
        assert_eq!(
            flags_of(&add),
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL
        );
        let replace = replace_request(&list).unwrap();
        assert_eq!(
            flags_of(&replace),
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_REPLACE
        );
        let change = change_request(&list).unwrap();
        assert_eq!(flags_of(&change), NLM_F_REQUEST | NLM_F_ACK | NLM_F_REPLACE);

        let dump = dump_request("ctinfo").unwrap();
        assert_eq!(flags_of(&dump), NLM_F_REQUEST | NLM_F_DUMP);
        let flush = flush_request("ctinfo").unwrap();
        assert_eq!(flags_of(&flush), NLM_F_REQUEST | NLM_F_ACK | NLM_F_ROOT);
    }

    #[test]
    fn test_get_request_carries_index() {
        let get = get_request("conndscp", 12).unwrap();
        let header = get.header();
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_GETACTION);

        let slots = tab_slots(&get);
        assert_eq!(slots.len(), 1);
        let table = AttrTable::parse(&slots[0].1, TCA_ACT_MAX);
        assert_eq!(table.string(TCA_ACT_KIND).unwrap().unwrap(), "conndscp");
        assert_eq!(table.u32(TCA_ACT_INDEX).unwrap().unwrap(), 12);
        assert!(!table.contains(TCA_ACT_OPTIONS));
    }

    #[test]
    fn test_action_list_slots() {
        let list = ActionList::new()
            .add(ConndscpAction::new().mode_dscp())
            .add(CtinfoAction::new().zone(3));
        assert_eq!(list.len(), 2);

        let builder = add_request(&list).unwrap();
        let slots = tab_slots(&builder);
        assert_eq!(slots.iter().map(|(o, _)| *o).collect::<Vec<_>>(), vec![1, 2]);

        let second = AttrTable::parse(&slots[1].1, TCA_ACT_MAX);
        assert_eq!(second.string(TCA_ACT_KIND).unwrap().unwrap(), "ctinfo");
        assert!(second.contains(TCA_ACT_OPTIONS));
    }

    #[test]
    fn test_parse_action_list_chain() {
        let tokens = [
            "ctinfo", "zone", "2", "action", "conndscp", "mask", "0xfc000000", "mode", "dscp",
        ];
        let mut args = Args::new(&tokens);
        let mut builder = new_action_request(ActionOp::Add).unwrap();

        let count = parse_action_list(&mut args, CtinfoWire::V2, &mut builder).unwrap();
        assert_eq!(count, 2);
        assert!(args.is_empty());
        assert_eq!(tab_slots(&builder).len(), 2);
    }

    #[test]
    fn test_parse_action_list_errors() {
        let mut builder = new_action_request(ActionOp::Add).unwrap();

        let mut args = Args::new(&["gact", "drop"]);
        assert!(matches!(
            parse_action_list(&mut args, CtinfoWire::V2, &mut builder),
            Err(Error::Parse(_))
        ));

        let mut args = Args::new(&["ctinfo", "zone", "2", "bogus"]);
        let err = parse_action_list(&mut args, CtinfoWire::V2, &mut builder).unwrap_err();
        assert!(err.is_usage());
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_print_message_unknown_and_missing_kind() {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_NEWACTION, 0);
        builder.append(&TcaMsg::new()).unwrap();
        let tab = builder.nest_start(TCA_ROOT_TAB).unwrap();
        let slot = builder.nest_start(1).unwrap();
        builder.append_attr_str(TCA_ACT_KIND, "gact").unwrap();
        builder.nest_end(slot).unwrap();
        let slot = builder.nest_start(2).unwrap();
        builder.append_attr_u32(TCA_ACT_INDEX, 1).unwrap();
        builder.nest_end(slot).unwrap();
        builder.nest_end(tab).unwrap();

        let dump = print_action_message(builder.payload(), CtinfoWire::V2, false).unwrap();
        assert_eq!(dump.failed, 2);
        assert_eq!(
            dump.reports[0].text(),
            "action order 1: [unknown action kind \"gact\"]\n"
        );
        assert_eq!(dump.reports[1].text(), "action order 2: [NULL action kind]\n");
    }

    #[test]
    fn test_print_message_requires_tab() {
        let payload = TcaMsg::new();
        let err = print_action_message(
            zerocopy::IntoBytes::as_bytes(&payload),
            CtinfoWire::V2,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingAttribute { attr: "TCA_ROOT_TAB", .. }));

        assert!(matches!(
            print_action_message(&[0, 0], CtinfoWire::V2, false),
            Err(Error::Truncated { .. })
        ));
    }
}
