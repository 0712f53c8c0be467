//! Interchangeable ways of measuring one benchmark call.

mod plain;
mod sampling;
mod timer;

pub use plain::SingleShot;
pub use sampling::SamplingProfiler;
pub use timer::{NUMBER_ENV, RepeatedTimer};

use crate::config::BenchEnv;
use crate::fixture::Output;
use crate::profile::CallTree;
use crate::registry::BenchmarkEntry;
use anyhow::Result;
use std::io::{self, Write};
use std::time::Duration;

#[derive(Debug)]
pub struct RunReport {
    pub name: &'static str,
    pub strategy: &'static str,
    /// Timed calls; warm-up calls are not counted.
    pub calls: usize,
    pub total: Duration,
    pub output: Output,
    pub profile: Option<CallTree>,
}

impl RunReport {
    pub fn average(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) => Duration::ZERO,
            Ok(calls) => self.total / calls,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.calls as f64),
        }
    }
}

pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Set up, measure and tear down `entry` once.
    fn run(&self, entry: &BenchmarkEntry, env: &BenchEnv) -> Result<RunReport>;

    fn print(&self, report: &RunReport, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "Ran {} {} times, total time {} s",
            report.name,
            report.calls,
            report.total.as_secs_f64()
        )
    }
}
