use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn sweep(dir: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("tile-sweep")?;
    cmd.current_dir(dir)
        .env_remove("FITSBENCH_CONFIG")
        .env_remove("FITSBENCH_TRACE")
        .args(["--shape", "1024x1024", "--dtype", "int16", "--tiles", "64,128,256", "--repeat", "1"])
        .arg("--scratch-dir")
        .arg(dir);
    Ok(cmd)
}

fn count_with_extension(dir: &Path, ext: &str) -> Result<usize, Box<dyn Error>> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        if entry?.path().extension().and_then(|e| e.to_str()) == Some(ext) {
            count += 1;
        }
    }
    Ok(count)
}

#[test]
fn sweep_writes_table_cache_and_report() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    sweep(dir.path())?
        .assert()
        .success()
        .stdout(predicate::str::starts_with("index"))
        .stdout(predicate::str::contains("64x64"))
        .stdout(predicate::str::contains("256x256"))
        .stdout(predicate::str::contains("Results written -> "))
        .stdout(predicate::str::contains("Report -> "));

    assert_eq!(count_with_extension(dir.path(), "fits")?, 3);
    assert_eq!(count_with_extension(dir.path(), "parquet")?, 1);
    assert_eq!(count_with_extension(dir.path(), "html")?, 1);

    sweep(dir.path())?
        .arg("--no-report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Results loaded -> "))
        .stdout(predicate::str::contains("Report -> ").not());
    Ok(())
}

#[test]
fn rejects_bad_arguments() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    sweep(dir.path())?
        .args(["--range", "64:257:64"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));

    Command::cargo_bin("tile-sweep")?
        .current_dir(dir.path())
        .args(["--shape", "1024", "--tiles", "64"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected ROWSxCOLS"));

    Command::cargo_bin("tile-sweep")?
        .current_dir(dir.path())
        .args(["--preset", "no-such-preset"])
        .assert()
        .failure();

    Command::cargo_bin("tile-sweep")?
        .current_dir(dir.path())
        .arg("--scratch-dir")
        .arg(dir.path())
        .args(["--dtype", "float32", "--compression", "RICE_1", "--tiles", "64"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RICE_1 needs integer data"));

    assert_eq!(count_with_extension(dir.path(), "fits")?, 0);
    Ok(())
}
