//! tc - Traffic control tool
//!
//! Manages the conndscp and ctinfo actions.

use clap::{Parser, Subcommand};
use tcact::netlink::action::CtinfoWire;
use tcact::output::{OutputFormat, OutputOptions};

mod commands;

use commands::action::{ActionCmd, Session};

#[derive(Parser)]
#[command(name = "tc")]
#[command(about = "Traffic control tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Output JSON
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Pretty print JSON
    #[arg(short = 'p', long, global = true)]
    pretty: bool,

    /// Show statistics
    #[arg(short = 's', long, global = true)]
    stats: bool,

    /// Wire generation of the ctinfo action (v1 or v2)
    #[arg(long, global = true, default_value_t = CtinfoWire::V2)]
    ctinfo_wire: CtinfoWire,

    /// Encode the request and print it instead of sending it
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage actions
    #[command(visible_alias = "a")]
    Action(ActionCmd),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let session = Session {
        wire: cli.ctinfo_wire,
        format,
        opts: OutputOptions {
            stats: cli.stats,
            pretty: cli.pretty,
        },
        dry_run: cli.dry_run,
    };

    let result = match cli.command {
        Command::Action(cmd) => cmd.run(&session).await,
    };

    match result {
        Ok(0) => {}
        Ok(failed) => {
            tracing::debug!(failed, "some actions could not be rendered");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(usage) = e
                .downcast_ref::<tcact::Error>()
                .and_then(tcact::Error::usage_text)
            {
                eprint!("{usage}");
            }
            std::process::exit(1);
        }
    }
}
