use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use shell_logging::LogDestination;

pub const USAGE: &str = "\
Usage: content_shell [OPTIONS]

Options:
  --config <PATH>    RON configuration file [default: content_shell.ron]
  --output <DIR>     Directory the served document is written to (overrides config)
  --log <DEST>       terminal | file | both [default: terminal]
  --retries <N>      Automatic retries from the error page [default: 0]
  -h, --help         Print this help";

const DEFAULT_CONFIG: &str = "content_shell.ron";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub config: PathBuf,
    pub output: Option<PathBuf>,
    pub log: LogDestination,
    pub retries: u32,
}

/// Returns `None` when help was requested and printed.
pub fn parse_args() -> anyhow::Result<Option<Args>> {
    parse_from(std::env::args_os().skip(1).collect())
}

fn parse_from(raw: Vec<OsString>) -> anyhow::Result<Option<Args>> {
    let mut pargs = pico_args::Arguments::from_vec(raw);

    if pargs.contains(["-h", "--help"]) {
        println!("{USAGE}");
        return Ok(None);
    }

    let config = pargs
        .opt_value_from_str("--config")
        .context("invalid --config")?
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let output = pargs
        .opt_value_from_str("--output")
        .context("invalid --output")?;
    let log = pargs
        .opt_value_from_fn("--log", |value| {
            LogDestination::parse(value).ok_or_else(|| anyhow!("unknown log destination {value}"))
        })
        .context("invalid --log")?
        .unwrap_or(LogDestination::Terminal);
    let retries = pargs
        .opt_value_from_str("--retries")
        .context("invalid --retries")?
        .unwrap_or(0);

    let rest = pargs.finish();
    if !rest.is_empty() {
        bail!("unexpected arguments: {rest:?}");
    }

    Ok(Some(Args {
        config,
        output,
        log,
        retries,
    }))
}
