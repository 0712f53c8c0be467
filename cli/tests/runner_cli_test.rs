use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::error::Error;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const RUNNERS: [&str; 3] = ["bench-plain", "bench-timeit", "bench-profile"];

fn runner(bin: &str, dir: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin(bin)?;
    cmd.current_dir(dir)
        .env_remove("FITSBENCH_CONFIG")
        .env_remove("FITSBENCH_TRACE")
        .env("FITSBENCH_SCRATCH_DIR", dir.join("scratch"))
        .env("FITSBENCH_DATA_DIR", dir.join("data"));
    Ok(cmd)
}

#[test]
fn unknown_benchmark_exits_with_one() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    for bin in RUNNERS {
        runner(bin, dir.path())?
            .arg("no_such_benchmark")
            .assert()
            .code(1)
            .stdout("Unknown benchmark.\n");
    }
    Ok(())
}

#[test]
fn help_and_no_arguments_list_benchmarks() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    for bin in RUNNERS {
        for args in [vec![], vec!["--help"], vec!["open_file_aia", "--help"]] {
            runner(bin, dir.path())?
                .args(&args)
                .assert()
                .success()
                .stdout(predicate::str::starts_with("Specify benchmark name as only argument\n"))
                .stdout(predicate::str::contains("\ngenerated_access_single_tile\n"))
                .stdout(predicate::str::contains("\nopen_close_file_aia\n"));
        }
    }
    Ok(())
}

#[test]
fn broken_settings_do_not_change_usage_or_unknown_name() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("fitsbench.toml"), "no_such_key = 1\n")?;
    for bin in RUNNERS {
        runner(bin, dir.path())?
            .env("FITSBENCH_TIMEIT_NUMBER", "abc")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("Specify benchmark name as only argument\n"));

        runner(bin, dir.path())?
            .env("FITSBENCH_TIMEIT_NUMBER", "abc")
            .arg("nope")
            .assert()
            .code(1)
            .stdout("Unknown benchmark.\n");
    }

    runner("bench-plain", dir.path())?
        .arg("generated_access_data")
        .assert()
        .failure()
        .stderr(predicate::str::contains("fitsbench.toml"));
    Ok(())
}

#[test]
fn plain_runner_reads_a_generated_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    runner("bench-plain", dir.path())?
        .arg("generated_access_single_tile")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Ran generated_access_single_tile once in "))
        .stdout(predicate::str::contains("[128, 128]"));

    // The generated file is removed by teardown.
    let leftovers = std::fs::read_dir(dir.path().join("scratch"))?.count();
    assert_eq!(leftovers, 0);
    Ok(())
}

#[test]
fn timeit_runner_honours_the_call_count() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    runner("bench-timeit", dir.path())?
        .env("FITSBENCH_TIMEIT_NUMBER", "2")
        .arg("generated_access_data")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Ran generated_access_data 2 times, average time "));

    runner("bench-timeit", dir.path())?
        .env("FITSBENCH_TIMEIT_NUMBER", "many")
        .arg("generated_access_data")
        .assert()
        .failure()
        .stderr(predicate::str::contains("FITSBENCH_TIMEIT_NUMBER"));
    Ok(())
}

#[test]
fn missing_reference_data_is_an_error() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    runner("bench-plain", dir.path())?
        .arg("access_data_aia")
        .assert()
        .failure()
        .stderr(predicate::str::contains("set up benchmark 'access_data_aia'"));
    Ok(())
}

#[test]
fn profile_runner_prints_a_summary() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    runner("bench-profile", dir.path())?
        .arg("generated_access_single_tile")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Profiled generated_access_single_tile in "));
    Ok(())
}
