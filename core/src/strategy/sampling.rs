use super::{RunReport, Strategy};
use crate::config::BenchEnv;
use crate::fixture::Output;
use crate::profile::CallTree;
use crate::registry::{BenchmarkEntry, ProfilerOptions};
use anyhow::Result;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::warn;

/// One call under a statistical stack sampler, reported as a call tree.
///
/// Falls back to an unprofiled call, with a warning, when the sampler cannot
/// start (another profiler is running or the platform has none).
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplingProfiler;

impl Strategy for SamplingProfiler {
    fn name(&self) -> &'static str {
        "profile"
    }

    fn run(&self, entry: &BenchmarkEntry, env: &BenchEnv) -> Result<RunReport> {
        let (output, total, profile) = entry.scoped(env, |fixture| {
            profiled(entry.name, entry.profiler, || entry.call(env, fixture))
        })?;
        Ok(RunReport {
            name: entry.name,
            strategy: self.name(),
            calls: 1,
            total,
            output,
            profile,
        })
    }

    fn print(&self, report: &RunReport, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Profiled {} in {} s", report.name, report.total.as_secs_f64())?;
        match &report.profile {
            Some(tree) => write!(out, "{}", tree),
            None => writeln!(out, "No profile recorded."),
        }
    }
}

type Profiled = (Output, Duration, Option<CallTree>);

#[cfg(unix)]
fn profiled<F>(name: &str, options: ProfilerOptions, call: F) -> Result<Profiled>
where
    F: FnOnce() -> Result<Output>,
{
    let guard = match pprof::ProfilerGuardBuilder::default()
        .frequency(options.frequency())
        .blocklist(&["libc", "libgcc", "pthread", "vdso"])
        .build()
    {
        Ok(guard) => Some(guard),
        Err(e) => {
            warn!("failed to start profiler for {}: {}", name, e);
            None
        }
    };

    let start = Instant::now();
    let output = call()?;
    let total = start.elapsed();

    let profile = guard.and_then(|guard| {
        let report = guard.report().build();
        match report {
            Ok(report) => {
                let mut tree = CallTree::from_report(&report, options.interval);
                tree.calibrate(total);
                Some(tree)
            }
            Err(e) => {
                warn!("failed to build profile report for {}: {}", name, e);
                None
            }
        }
    });
    Ok((output, total, profile))
}

#[cfg(not(unix))]
fn profiled<F>(name: &str, _options: ProfilerOptions, call: F) -> Result<Profiled>
where
    F: FnOnce() -> Result<Output>,
{
    warn!("sampling profiler is unavailable on this platform; running {} unprofiled", name);
    let start = Instant::now();
    let output = call()?;
    Ok((output, start.elapsed(), None))
}
