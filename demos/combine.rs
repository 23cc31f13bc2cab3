use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use log::debug;
use settle::{
    combinators::{combine, supply_after, when_complete},
    futures::promise::Promise,
    task::Executor,
};

/// A settle combine example.
///
/// Two pieces of work run concurrently and their results are joined. Pass
/// `--fail-left` or `--fail-right` to watch the first failure win.
#[derive(Parser, Debug)]
struct Args {
    /// Duration of the left-hand work, in milliseconds.
    #[arg(long, default_value_t = 20)]
    left_ms: u64,

    /// Duration of the right-hand work, in milliseconds.
    #[arg(long, default_value_t = 40)]
    right_ms: u64,

    #[arg(long)]
    fail_left: bool,

    #[arg(long)]
    fail_right: bool,
}

fn work(name: &'static str, ms: u64, fail: bool) -> Promise<String, String> {
    let p = supply_after(Duration::from_millis(ms), move || {
        if fail {
            Err(format!("{name} failed"))
        } else {
            Ok(format!("{name}:{ms}ms"))
        }
    });

    when_complete(p, move |outcome| {
        debug!("{name} settled: {outcome:?}");
        Ok(())
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let joined = combine(
        work("left", args.left_ms, args.fail_left),
        work("right", args.right_ms, args.fail_right),
        |l, r| Ok(format!("{l} + {r}")),
    );

    let value = Executor::block_on(joined).map_err(|reason| anyhow!(reason))?;
    println!("{value}");

    Ok(())
}
