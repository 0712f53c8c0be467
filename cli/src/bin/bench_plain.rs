//! Run one benchmark once: setup, call, teardown.

use fitsbench_core::{SingleShot, runner};

fn main() -> anyhow::Result<()> {
    let code = runner::main_with(|| Ok(SingleShot))?;
    std::process::exit(code);
}
