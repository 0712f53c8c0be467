//! Run one benchmark under the sampling profiler and print its call tree.

use fitsbench_core::{SamplingProfiler, runner};

fn main() -> anyhow::Result<()> {
    let code = runner::main_with(|| Ok(SamplingProfiler))?;
    std::process::exit(code);
}
