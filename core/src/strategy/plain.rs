use super::{RunReport, Strategy};
use crate::config::BenchEnv;
use crate::registry::BenchmarkEntry;
use anyhow::Result;
use std::io::{self, Write};
use std::time::Instant;
use tracing::debug;

/// Setup, one call, teardown. No instrumentation beyond a wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleShot;

impl Strategy for SingleShot {
    fn name(&self) -> &'static str {
        "single-shot"
    }

    fn run(&self, entry: &BenchmarkEntry, env: &BenchEnv) -> Result<RunReport> {
        let (output, total) = entry.scoped(env, |fixture| {
            let start = Instant::now();
            let output = entry.call(env, fixture)?;
            Ok((output, start.elapsed()))
        })?;
        debug!(benchmark = entry.name, %output, "single shot finished");
        Ok(RunReport {
            name: entry.name,
            strategy: self.name(),
            calls: 1,
            total,
            output,
            profile: None,
        })
    }

    fn print(&self, report: &RunReport, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "Ran {} once in {} s: {}",
            report.name,
            report.total.as_secs_f64(),
            report.output
        )
    }
}
