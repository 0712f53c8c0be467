//! Command-line contract shared by every runner binary.

use crate::config::BenchEnv;
use crate::registry::Registry;
use crate::strategy::Strategy;
use anyhow::{Context, Result};
use std::io::Write;
use tracing::info;

pub const USAGE: &str = "Specify benchmark name as only argument";
pub const UNKNOWN: &str = "Unknown benchmark.";

/// Handle `args` (program name excluded) and return the exit code.
///
/// No arguments or any `--help` lists the benchmarks and exits 0. An unknown
/// name prints [`UNKNOWN`] and exits 1. Only a known name calls `prepare` for
/// the environment and strategy, so a broken config never changes those two
/// answers. Failures inside a benchmark are returned as errors.
pub fn dispatch<W, S, F>(args: &[String], registry: &Registry, prepare: F, out: &mut W) -> Result<i32>
where
    W: Write,
    S: Strategy,
    F: FnOnce() -> Result<(BenchEnv, S)>,
{
    let Some(name) = args.first().filter(|_| !args.iter().any(|a| a == "--help")) else {
        print_usage(registry, out)?;
        return Ok(0);
    };

    let Some(entry) = registry.lookup(name) else {
        writeln!(out, "{}", UNKNOWN)?;
        return Ok(1);
    };

    let (env, strategy) = prepare()?;
    info!(benchmark = entry.name, strategy = strategy.name(), "running benchmark");
    let report = strategy.run(entry, &env)?;
    strategy.print(&report, out).context("write benchmark report")?;
    Ok(0)
}

pub fn print_usage<W: Write>(registry: &Registry, out: &mut W) -> Result<()> {
    writeln!(out, "{}", USAGE)?;
    writeln!(out, "Available benchmarks:")?;
    for name in registry.names() {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}

/// Entry point body for the runner binaries. `strategy` is only built once
/// a known benchmark name was given.
pub fn main_with<S, F>(strategy: F) -> Result<i32>
where
    S: Strategy,
    F: FnOnce() -> Result<S>,
{
    crate::logging::maybe_init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let registry = crate::benchmarks::builtin_registry();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = dispatch(&args, &registry, || Ok((BenchEnv::load()?, strategy()?)), &mut out)?;
    out.flush()?;
    Ok(code)
}
