#[cfg(test)]
mod tests {
    use crate::benchmarks::builtin_registry;
    use crate::config::BenchEnv;
    use crate::fixture::{Fixture, Output};
    use crate::registry::BenchmarkEntry;
    use crate::strategy::*;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn scratch_env(dir: &tempfile::TempDir) -> BenchEnv {
        BenchEnv {
            scratch_dir: dir.path().join("scratch"),
            ..BenchEnv::default()
        }
    }

    fn sleepy(_env: &BenchEnv, _fixture: &mut Fixture) -> Result<Output> {
        std::thread::sleep(Duration::from_millis(20));
        Ok(Output::Unit)
    }

    #[test]
    fn repeated_timer_counts_warm_up_separately() -> Result<()> {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn counted(_env: &BenchEnv, _fixture: &mut Fixture) -> Result<Output> {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(Output::Unit)
        }

        let entry = BenchmarkEntry::new("counted", "counted", counted);
        let report = RepeatedTimer::new(3).run(&entry, &BenchEnv::default())?;
        assert_eq!(report.calls, 3);
        assert_eq!(CALLS.load(Ordering::SeqCst), 4);
        Ok(())
    }

    #[test]
    fn repeated_timer_average_tracks_call_time() -> Result<()> {
        let entry = BenchmarkEntry::new("sleepy", "sleeps", sleepy);
        let report = RepeatedTimer::default().run(&entry, &BenchEnv::default())?;
        assert_eq!(report.calls, 5);
        let avg = report.average();
        assert!(avg >= Duration::from_millis(20), "average {:?}", avg);
        assert!(avg < Duration::from_millis(200), "average {:?}", avg);

        let mut out = Vec::new();
        RepeatedTimer::default().print(&report, &mut out)?;
        let line = String::from_utf8(out)?;
        assert!(line.starts_with("Ran sleepy 5 times, average time "));
        assert!(line.trim_end().ends_with(" s"));
        Ok(())
    }

    #[test]
    fn repeated_timer_rejects_zero_calls() {
        let entry = BenchmarkEntry::new("sleepy", "sleeps", sleepy);
        assert!(RepeatedTimer::new(0).run(&entry, &BenchEnv::default()).is_err());
    }

    #[test]
    fn single_shot_runs_generated_benchmarks() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let env = scratch_env(&dir);
        let registry = builtin_registry();

        let data = registry.lookup("generated_access_data").expect("registered");
        let report = SingleShot.run(data, &env)?;
        assert_eq!(report.calls, 1);
        match &report.output {
            Output::Array(array) => assert_eq!(array.shape(), &[1024, 1024]),
            other => panic!("unexpected output {}", other),
        }

        let tile = registry.lookup("generated_access_single_tile").expect("registered");
        let report = SingleShot.run(tile, &env)?;
        match &report.output {
            Output::Array(array) => assert_eq!(array.shape(), &[128, 128]),
            other => panic!("unexpected output {}", other),
        }

        // Teardown removed every generated directory.
        assert_eq!(std::fs::read_dir(&env.scratch_dir)?.count(), 0);
        Ok(())
    }

    #[test]
    fn sampling_profiler_reports_one_call() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let env = scratch_env(&dir);
        let registry = builtin_registry();
        let entry = registry.lookup("generated_access_data").expect("registered");
        let report = SamplingProfiler.run(entry, &env)?;
        assert_eq!(report.calls, 1);
        assert_eq!(report.strategy, "profile");
        if let Some(tree) = report.profile.as_ref().filter(|t| t.total_samples() > 0) {
            let drift = tree.total_time().as_secs_f64() - report.total.as_secs_f64();
            assert!(drift.abs() <= report.total.as_secs_f64() * 0.01, "{} vs {:?}", tree, report.total);
        }

        let mut out = Vec::new();
        SamplingProfiler.print(&report, &mut out)?;
        let text = String::from_utf8(out)?;
        assert!(text.starts_with("Profiled generated_access_data in "));
        Ok(())
    }
}
