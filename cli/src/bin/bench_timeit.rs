//! Run one benchmark repeatedly against a single fixture and report the
//! average. `FITSBENCH_TIMEIT_NUMBER` sets the call count.

use fitsbench_core::{RepeatedTimer, runner};

fn main() -> anyhow::Result<()> {
    let code = runner::main_with(RepeatedTimer::from_env)?;
    std::process::exit(code);
}
