#[cfg(test)]
mod tests {
    use crate::profile::CallTree;
    use std::time::Duration;

    fn sample_tree() -> CallTree {
        let mut tree = CallTree::new(Duration::from_micros(100));
        tree.add_stack(&["main", "run_benchmark", "fitsbench_fits::file::ImageHdu::data"], 60);
        tree.add_stack(&["main", "run_benchmark", "fitsbench_fits::compress::rice::decode"], 30);
        tree.add_stack(&["main", "setup"], 10);
        tree
    }

    #[test]
    fn folds_shared_prefixes() {
        let tree = sample_tree();
        assert_eq!(tree.total_samples(), 100);
        assert_eq!(tree.total_time(), Duration::from_millis(10));
        assert_eq!(tree.roots().len(), 1);
        let main = &tree.roots()[0];
        assert_eq!(main.samples, 100);
        assert_eq!(main.children.len(), 2);
        assert_eq!(main.children[0].name, "run_benchmark");
        assert_eq!(main.children[0].samples, 90);
    }

    #[test]
    fn function_time_matches_name_suffix() {
        let tree = sample_tree();
        assert_eq!(tree.function_time("ImageHdu::data"), Some(Duration::from_millis(6)));
        assert_eq!(tree.function_time("run_benchmark"), Some(Duration::from_millis(9)));
        assert_eq!(tree.function_time("not_sampled"), None);
    }

    #[test]
    fn renders_indented_tree_and_elides_rare_frames() {
        let mut tree = sample_tree();
        for _ in 0..10 {
            tree.add_stack(&["main", "run_benchmark"], 100);
        }
        tree.add_stack(&["main", "rarely_seen"], 1);
        let text = tree.to_string();
        assert!(text.starts_with("Samples: 1101"));
        assert!(text.contains("\n0.110100 main\n"));
        assert!(text.contains("\n  0.109000 run_benchmark\n"));
        assert!(text.contains("\n    0.006000 fitsbench_fits::file::ImageHdu::data\n"));
        assert!(!text.contains("rarely_seen"));
    }

    #[test]
    fn calibration_spreads_wall_time_over_samples() {
        let mut tree = sample_tree();
        tree.calibrate(Duration::from_millis(250));
        assert_eq!(tree.per_sample(), Duration::from_micros(2500));
        assert_eq!(tree.interval(), Duration::from_micros(100));
        assert_eq!(tree.total_time(), Duration::from_millis(250));
        assert_eq!(tree.function_time("run_benchmark"), Some(Duration::from_millis(225)));
        assert!(tree.to_string().starts_with("Samples: 100  Duration: 0.250000 s  Interval: 2.5ms (requested 100µs)"));

        let mut empty = CallTree::new(Duration::from_millis(1));
        empty.calibrate(Duration::from_secs(1));
        assert_eq!(empty.per_sample(), Duration::from_millis(1));
    }

    #[test]
    fn zero_count_stacks_are_ignored() {
        let mut tree = CallTree::new(Duration::from_millis(1));
        tree.add_stack(&["main"], 0);
        assert_eq!(tree.total_samples(), 0);
        assert!(tree.roots().is_empty());
        assert_eq!(tree.to_string().lines().count(), 1);
    }
}
