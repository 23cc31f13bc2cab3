use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::Parser;
use log::{debug, info};
use settle::{
    combinators::{reject_on_timeout_with, resolve_on_timeout, supply_after},
    futures::promise::Promise,
    task::Executor,
};

/// A settle timeout example.
///
/// This example runs a piece of "work" that takes `work_ms` to complete and
/// races it against a `timeout_ms` deadline. With `--fallback` the deadline
/// resolves to the fallback value, otherwise it fails.
#[derive(Parser, Debug)]
struct Args {
    /// How long the work takes, in milliseconds.
    #[arg(long, default_value_t = 50)]
    work_ms: u64,

    /// How long to wait for the work, in milliseconds.
    #[arg(long, default_value_t = 100)]
    timeout_ms: u64,

    /// Resolve with this value instead of failing on timeout.
    #[arg(long)]
    fallback: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let started = Instant::now();

    let work: Promise<String, String> =
        supply_after(Duration::from_millis(args.work_ms), move || {
            debug!("work finished after {:?}", started.elapsed());
            Ok(format!("work done in {}ms", args.work_ms))
        });

    let timeout = Duration::from_millis(args.timeout_ms);
    let raced = match args.fallback {
        Some(fallback) => resolve_on_timeout(work, fallback, timeout),
        None => reject_on_timeout_with(work, timeout, move || {
            format!("gave up after {}ms", args.timeout_ms)
        }),
    };

    let outcome = Executor::block_on(raced);
    info!("settled after {:?}", started.elapsed());

    let value = outcome.map_err(|reason| anyhow!(reason))?;
    println!("{value}");

    Ok(())
}
