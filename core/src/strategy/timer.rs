use super::{RunReport, Strategy};
use crate::config::BenchEnv;
use crate::registry::BenchmarkEntry;
use anyhow::{Context, Result, bail};
use std::hint::black_box;
use std::io::{self, Write};
use std::time::{Duration, Instant};

pub const NUMBER_ENV: &str = "FITSBENCH_TIMEIT_NUMBER";

/// Calls the benchmark `number` times against one fixture.
///
/// One untimed call runs first so lazy state inside the fixture is warm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatedTimer {
    pub number: usize,
}

impl Default for RepeatedTimer {
    fn default() -> Self {
        Self { number: 5 }
    }
}

impl RepeatedTimer {
    pub fn new(number: usize) -> Self {
        Self { number }
    }

    /// Default count, overridden by `FITSBENCH_TIMEIT_NUMBER`.
    pub fn from_env() -> Result<Self> {
        match std::env::var(NUMBER_ENV) {
            Ok(raw) if !raw.trim().is_empty() => {
                let number = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("parse {}='{}' as a call count", NUMBER_ENV, raw))?;
                Ok(Self::new(number))
            }
            _ => Ok(Self::default()),
        }
    }
}

impl Strategy for RepeatedTimer {
    fn name(&self) -> &'static str {
        "timeit"
    }

    fn run(&self, entry: &BenchmarkEntry, env: &BenchEnv) -> Result<RunReport> {
        if self.number == 0 {
            bail!("repeated timer needs at least one call");
        }
        let (output, total) = entry.scoped(env, |fixture| {
            let mut output = entry.call(env, fixture)?;
            let mut total = Duration::ZERO;
            for _ in 0..self.number {
                let start = Instant::now();
                output = black_box(entry.call(env, fixture)?);
                total += start.elapsed();
            }
            Ok((output, total))
        })?;
        Ok(RunReport {
            name: entry.name,
            strategy: self.name(),
            calls: self.number,
            total,
            output,
            profile: None,
        })
    }

    fn print(&self, report: &RunReport, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "Ran {} {} times, average time {} s",
            report.name,
            report.calls,
            report.average().as_secs_f64()
        )
    }
}
