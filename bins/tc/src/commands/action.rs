//! tc action command implementation.
//!
//! Supported kinds:
//! - conndscp: store DSCP into the conntrack mark
//! - ctinfo: restore DSCP and the conntrack mark into the packet

use std::io::{self, Write};

use anyhow::{Context, bail};
use clap::{Args, Subcommand};
use tcact::Connection;
use tcact::netlink::action::{
    ActionDump, ActionOp, CtinfoWire, KINDS, codec_for, delete_request, dump_request,
    flush_request, get_request, new_action_request, parse_action_list, print_action_message,
};
use tcact::netlink::parse::{self, get_u32};
use tcact::netlink::{MessageIter, NLMSG_HDRLEN, NlMsgType};
use tcact::output::{OutputFormat, OutputOptions, PrintableList};

/// Global settings shared by every subcommand.
pub struct Session {
    pub wire: CtinfoWire,
    pub format: OutputFormat,
    pub opts: OutputOptions,
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ActionCmd {
    #[command(subcommand)]
    action: ActionAction,
}

#[derive(Subcommand)]
enum ActionAction {
    /// Add new actions.
    Add {
        /// KIND [PARAMS...] [action KIND [PARAMS...]]...
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        params: Vec<String>,
    },

    /// Change existing actions.
    Change {
        /// KIND [PARAMS...] [action KIND [PARAMS...]]...
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        params: Vec<String>,
    },

    /// Add or overwrite actions.
    Replace {
        /// KIND [PARAMS...] [action KIND [PARAMS...]]...
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        params: Vec<String>,
    },

    /// Get a specific action.
    Get {
        /// KIND index INDEX
        #[arg(trailing_var_arg = true, required = true)]
        params: Vec<String>,
    },

    /// Delete a specific action.
    #[command(visible_alias = "del")]
    Delete {
        /// KIND index INDEX
        #[arg(trailing_var_arg = true, required = true)]
        params: Vec<String>,
    },

    /// Show all actions of a kind.
    #[command(visible_alias = "list", visible_alias = "ls")]
    Show {
        /// Action kind (conndscp, ctinfo).
        kind: String,
    },

    /// Delete all actions of a kind.
    Flush {
        /// Action kind (conndscp, ctinfo).
        kind: String,
    },
}

impl ActionCmd {
    /// Run the command; returns the number of actions that failed to render.
    pub async fn run(&self, session: &Session) -> anyhow::Result<usize> {
        match &self.action {
            ActionAction::Add { params } => self.new_action(session, ActionOp::Add, params).await,
            ActionAction::Change { params } => {
                self.new_action(session, ActionOp::Change, params).await
            }
            ActionAction::Replace { params } => {
                self.new_action(session, ActionOp::Replace, params).await
            }
            ActionAction::Get { params } => {
                let (kind, index) = parse_selector(params)?;
                let conn = connect(session)?;
                let response = conn
                    .request(get_request(&kind, index)?)
                    .await
                    .map_err(|e| e.with_context(format!("get {kind} action {index}")))?;

                let mut dump = ActionDump::default();
                for result in MessageIter::new(&response) {
                    let (header, payload) = result?;
                    if header.nlmsg_type == NlMsgType::RTM_NEWACTION {
                        dump.merge(print_action_message(payload, session.wire, session.opts.stats)?);
                    }
                }
                print_dump(&dump, session)
            }
            ActionAction::Delete { params } => {
                let (kind, index) = parse_selector(params)?;
                let conn = connect(session)?;
                conn.request_ack(delete_request(&kind, index)?)
                    .await
                    .map_err(|e| e.with_context(format!("delete {kind} action {index}")))?;
                Ok(0)
            }
            ActionAction::Show { kind } => {
                check_kind(kind, session.wire)?;
                let conn = connect(session)?;
                let responses = conn
                    .dump(dump_request(kind)?)
                    .await
                    .map_err(|e| e.with_context(format!("dump {kind} actions")))?;

                let mut dump = ActionDump::default();
                for response in responses {
                    let Some(payload) = response.get(NLMSG_HDRLEN..) else {
                        continue;
                    };
                    dump.merge(print_action_message(payload, session.wire, session.opts.stats)?);
                }
                print_dump(&dump, session)
            }
            ActionAction::Flush { kind } => {
                check_kind(kind, session.wire)?;
                let conn = connect(session)?;
                conn.request_ack(flush_request(kind)?)
                    .await
                    .map_err(|e| e.with_context(format!("flush {kind} actions")))?;
                Ok(0)
            }
        }
    }

    async fn new_action(
        &self,
        session: &Session,
        op: ActionOp,
        params: &[String],
    ) -> anyhow::Result<usize> {
        let mut args = parse::Args::new(params);
        let mut request = new_action_request(op)?;
        let count = parse_action_list(&mut args, session.wire, &mut request)?;
        tracing::debug!(count, len = request.len(), "request encoded");

        if session.dry_run {
            let dump = print_action_message(request.payload(), session.wire, session.opts.stats)?;
            return print_dump(&dump, session);
        }

        let conn = Connection::new().context("cannot open netlink socket")?;
        conn.request_ack(request)
            .await
            .map_err(|e| e.with_context(format!("{} action", op.verb())))?;
        Ok(0)
    }
}

fn connect(session: &Session) -> anyhow::Result<Connection> {
    if session.dry_run {
        bail!("--dry-run only applies to add, change and replace");
    }
    Connection::new().context("cannot open netlink socket")
}

fn check_kind(kind: &str, wire: CtinfoWire) -> anyhow::Result<()> {
    if codec_for(kind, wire).is_none() {
        bail!(
            "unknown action kind \"{kind}\" (supported: {})",
            KINDS.join(", ")
        );
    }
    Ok(())
}

/// Parse `KIND index INDEX`.
fn parse_selector(params: &[String]) -> anyhow::Result<(String, u32)> {
    let mut args = parse::Args::new(params);
    let kind = args.next_value("action")?;
    check_kind(kind, CtinfoWire::default())?;

    if !args.peek_matches("index") {
        bail!("{kind}: expected \"index INDEX\"");
    }
    args.advance();
    let index = get_u32(args.next_value("index")?, 10)?;

    if let Some(extra) = args.peek() {
        bail!("{kind}: unexpected argument \"{extra}\"");
    }
    Ok((kind.to_string(), index))
}

fn print_dump(dump: &ActionDump, session: &Session) -> anyhow::Result<usize> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match session.format {
        OutputFormat::Text => {
            for report in &dump.reports {
                write!(handle, "{}", report.text())?;
                writeln!(handle)?;
            }
        }
        OutputFormat::Json => dump.print(&mut handle, session.format, &session.opts)?,
    }
    handle.flush()?;

    Ok(dump.failed)
}
